#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tower::ServiceExt;

use numeracy_hub_api::{
    config::Config,
    create_router,
    models::question::{Difficulty, Question, QuestionType, Topic},
    services::AppState,
};

// Fixed seed-question ids so tests can reference them in submissions.
pub const Q_NUMBER_HALF: &str = "aaaaaaaaaaaaaaaaaaaaaaa1";
pub const Q_NUMBER_MORE: &str = "aaaaaaaaaaaaaaaaaaaaaaa2";
pub const Q_MEASUREMENT_PENCIL: &str = "aaaaaaaaaaaaaaaaaaaaaaa3";
pub const Q_GEOMETRY_HEXAGON: &str = "aaaaaaaaaaaaaaaaaaaaaaa4";

pub async fn create_test_app() -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    dotenvy::from_filename(".env.test").ok();

    // Tests always exercise the local deterministic feedback provider.
    std::env::remove_var("AI_API_KEY");

    let config = Config::load().expect("Failed to load test configuration");

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create test Redis client");

    let app_state = Arc::new(
        AppState::new(config.clone(), mongo_client.clone(), redis_client)
            .await
            .expect("Failed to initialize test app state"),
    );

    seed_questions(&mongo_client, &config.mongo_database).await;

    create_router(app_state)
}

async fn seed_questions(mongo_client: &mongodb::Client, db_name: &str) {
    let questions = mongo_client
        .database(db_name)
        .collection::<Question>("questions");

    let seed = vec![
        question(
            Q_NUMBER_HALF,
            3,
            Topic::Number,
            QuestionType::Text,
            "What is half of 50?",
            None,
            &["25"],
            "25",
            "50 divided by 2 is 25.",
            Difficulty::Easy,
        ),
        question(
            Q_NUMBER_MORE,
            3,
            Topic::Number,
            QuestionType::Multiple,
            "Which number is 10 more than 592?",
            Some(&["593", "602", "502", "692"]),
            &["602"],
            "602",
            "592 + 10 = 602.",
            Difficulty::Medium,
        ),
        question(
            Q_MEASUREMENT_PENCIL,
            3,
            Topic::Measurement,
            QuestionType::Text,
            "A pencil is 8 centimetres long. Write its length.",
            None,
            &["8", "8cm"],
            "8",
            "The length is 8 centimetres.",
            Difficulty::Easy,
        ),
        question(
            Q_GEOMETRY_HEXAGON,
            7,
            Topic::Geometry,
            QuestionType::Text,
            "How many sides does a hexagon have?",
            None,
            &["6", "six"],
            "6",
            "A hexagon has 6 sides.",
            Difficulty::Medium,
        ),
    ];

    for doc in seed {
        let id = doc.id.expect("seed question carries an id");
        questions
            .replace_one(mongodb::bson::doc! { "_id": id }, &doc)
            .upsert(true)
            .await
            .expect("Failed to seed test question");
    }
}

#[allow(clippy::too_many_arguments)]
fn question(
    id_hex: &str,
    year_level: i32,
    topic: Topic,
    question_type: QuestionType,
    text: &str,
    choices: Option<&[&str]>,
    acceptable: &[&str],
    correct: &str,
    explanation: &str,
    difficulty: Difficulty,
) -> Question {
    Question {
        id: Some(ObjectId::parse_str(id_hex).unwrap()),
        year_level,
        topic,
        question_type,
        question: text.to_string(),
        choices: choices.map(|c| c.iter().map(|s| s.to_string()).collect()),
        acceptable_answers: acceptable.iter().map(|s| s.to_string()).collect(),
        correct_answer: correct.to_string(),
        explanation: explanation.to_string(),
        difficulty,
        tags: vec!["seed".to_string()],
        hints: None,
        image_url: None,
        time_limit: 30,
        points: 10,
        is_active: true,
    }
}

/// Unique (and validation-compliant) credentials per test run.
pub fn unique_credentials() -> (String, String) {
    let suffix = &ObjectId::new().to_hex()[12..];
    let username = format!("u{}", suffix);
    let email = format!("{}@example.com", username);
    (username, email)
}

pub async fn register_user(app: &Router) -> (String, String) {
    let (username, email) = unique_credentials();
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        None,
        serde_json::json!({
            "username": username,
            "email": email,
            "password": "pass123",
            "yearLevel": 3
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    let token = body["token"].as_str().expect("token in response").to_string();
    let user_id = body["user"]["id"]
        .as_str()
        .expect("user id in response")
        .to_string();
    (token, user_id)
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    send(app, request).await
}

pub async fn put_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    send(app, request).await
}

pub async fn get_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri(uri);

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = builder.body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
