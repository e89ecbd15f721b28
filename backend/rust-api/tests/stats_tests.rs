mod common;

use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

async fn run_attempt(app: &axum::Router, user_id: &str, answers: serde_json::Value) {
    let (status, body) = common::post_json(
        app,
        "/api/quiz/start",
        None,
        json!({
            "userId": user_id,
            "quizType": "year3",
            "mode": "full",
            "totalQuestions": answers.as_array().map(|a| a.len()).unwrap_or(0)
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let attempt_id = body["attemptId"].as_str().unwrap().to_string();

    let (status, _) = common::post_json(
        app,
        &format!("/api/quiz/submit/{}", attempt_id),
        None,
        json!({ "answers": answers }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[serial]
async fn overview_requires_authentication() {
    let app = common::create_test_app().await;

    let (status, _) = common::get_json(
        &app,
        "/api/stats/user-overview/bbbbbbbbbbbbbbbbbbbbbbbb",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn overview_for_an_account_with_no_attempts_is_zeroed() {
    let app = common::create_test_app().await;
    let (token, user_id) = common::register_user(&app).await;

    let (status, body) = common::get_json(
        &app,
        &format!("/api/stats/user-overview/{}", user_id),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["overview"]["avgAccuracy"], 0.0);
    assert_eq!(body["overview"]["highestScore"], 0);
    assert_eq!(body["overview"]["totalTime"], 0);
    assert_eq!(body["totalAttempts"], 0);
    assert_eq!(body["history"].as_array().unwrap().len(), 0);

    // All four strands are present, each with zero mastery.
    let mastery = body["topicMastery"].as_array().unwrap();
    assert_eq!(mastery.len(), 4);
    for entry in mastery {
        assert_eq!(entry["mastery"], 0);
    }
}

#[tokio::test]
#[serial]
async fn overview_aggregates_completed_attempts() {
    let app = common::create_test_app().await;
    let (token, user_id) = common::register_user(&app).await;

    // Attempt 1: one of two correct -> accuracy 50, score 10.
    run_attempt(
        &app,
        &user_id,
        json!([
            { "questionId": common::Q_NUMBER_HALF, "userAnswer": "25", "timeSpent": 5 },
            { "questionId": common::Q_NUMBER_MORE, "userAnswer": "593", "timeSpent": 5 },
        ]),
    )
    .await;

    // Attempt 2: both correct -> accuracy 100, score 20.
    run_attempt(
        &app,
        &user_id,
        json!([
            { "questionId": common::Q_NUMBER_HALF, "userAnswer": "25", "timeSpent": 5 },
            { "questionId": common::Q_NUMBER_MORE, "userAnswer": "602", "timeSpent": 5 },
        ]),
    )
    .await;

    let (status, body) = common::get_json(
        &app,
        &format!("/api/stats/user-overview/{}", user_id),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalAttempts"], 2);
    assert_eq!(body["overview"]["avgAccuracy"], 75.0);
    assert_eq!(body["overview"]["highestScore"], 20);

    // History renders chronologically: oldest first.
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["accuracy"], 50);
    assert_eq!(history[1]["accuracy"], 100);

    // number strand: 3 correct, 1 wrong across both attempts -> 75%.
    let mastery = body["topicMastery"].as_array().unwrap();
    let number = mastery
        .iter()
        .find(|entry| entry["topic"] == "number")
        .unwrap();
    assert_eq!(number["correct"], 3);
    assert_eq!(number["wrong"], 1);
    assert_eq!(number["mastery"], 75);

    // Strands this account never attempted stay at zero mastery.
    let geometry = mastery
        .iter()
        .find(|entry| entry["topic"] == "geometry")
        .unwrap();
    assert_eq!(geometry["mastery"], 0);
}

#[tokio::test]
#[serial]
async fn history_window_keeps_the_ten_most_recent_attempts() {
    let app = common::create_test_app().await;
    let (token, user_id) = common::register_user(&app).await;

    for _ in 0..12 {
        run_attempt(
            &app,
            &user_id,
            json!([
                { "questionId": common::Q_NUMBER_HALF, "userAnswer": "25", "timeSpent": 1 },
            ]),
        )
        .await;
    }

    let (status, body) = common::get_json(
        &app,
        &format!("/api/stats/user-overview/{}", user_id),
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalAttempts"], 12);
    assert_eq!(body["history"].as_array().unwrap().len(), 10);
}
