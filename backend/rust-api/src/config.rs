use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub redis_uri: String,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    /// Credential for the generative language API. Absent key selects the
    /// local deterministic feedback provider.
    pub ai_api_key: Option<String>,
    pub ai_api_url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let port = settings
            .get_string("server.port")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5000);

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017/numeracy-hub".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "numeracy-hub".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        let jwt_expire_days = settings
            .get_string("auth.jwt_expire_days")
            .or_else(|_| env::var("JWT_EXPIRE_DAYS"))
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7);

        let ai_api_key = settings
            .get_string("ai.api_key")
            .or_else(|_| env::var("AI_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty());

        let ai_api_url = settings
            .get_string("ai.api_url")
            .or_else(|_| env::var("AI_API_URL"))
            .unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
                    .to_string()
            });

        Ok(Config {
            port,
            mongo_uri,
            mongo_database,
            redis_uri,
            jwt_secret,
            jwt_expire_days,
            ai_api_key,
            ai_api_url,
        })
    }
}
