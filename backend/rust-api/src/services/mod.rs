use crate::config::Config;
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Database, IndexModel,
};
use redis::aio::ConnectionManager;

use crate::models::{attempt::Attempt, question::Question, user::User};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
    pub redis: ConnectionManager,
}

impl AppState {
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        // Verify the connection before holding it for the process lifetime.
        let mut conn = redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established");

        ensure_indexes(&mongo).await?;

        Ok(Self {
            config,
            mongo,
            redis,
        })
    }
}

/// Declares the standard indexes at startup: unique handle/email on users,
/// the bank retrieval index on questions, and the per-user history index on
/// attempts. Idempotent; Mongo ignores re-declarations of identical indexes.
pub async fn ensure_indexes(db: &Database) -> anyhow::Result<()> {
    let unique = IndexOptions::builder().unique(true).build();

    db.collection::<User>("users")
        .create_indexes(vec![
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(unique.clone())
                .build(),
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique)
                .build(),
        ])
        .await?;

    db.collection::<Question>("questions")
        .create_indexes(vec![
            IndexModel::builder()
                .keys(doc! { "yearLevel": 1, "topic": 1, "difficulty": 1 })
                .build(),
            IndexModel::builder().keys(doc! { "isActive": 1 }).build(),
        ])
        .await?;

    db.collection::<Attempt>("attempts")
        .create_indexes(vec![IndexModel::builder()
            .keys(doc! { "userId": 1, "startTime": -1 })
            .build()])
        .await?;

    tracing::info!("MongoDB indexes ensured");
    Ok(())
}

pub mod ai_service;
pub mod auth_service;
pub mod quiz_service;
pub mod stats_service;
