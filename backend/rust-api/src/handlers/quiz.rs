use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::attempt::{StartQuizRequest, StartQuizResponse, SubmitQuizRequest, SubmitQuizResponse},
    models::question::ListQuestionsQuery,
    services::{quiz_service::QuizService, AppState},
};

/// GET /api/quiz/questions/{yearLevel}
pub async fn get_questions(
    State(state): State<Arc<AppState>>,
    Path(year_level): Path<i32>,
    Query(query): Query<ListQuestionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuizService::new(state.mongo.clone());
    let questions = service.list_questions(year_level, &query).await?;

    Ok(Json(json!({
        "success": true,
        "count": questions.len(),
        "questions": questions,
    })))
}

/// POST /api/quiz/start
pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StartQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuizService::new(state.mongo.clone());
    let attempt_id = service.start_attempt(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartQuizResponse {
            success: true,
            attempt_id,
            message: "Quiz started".to_string(),
        }),
    ))
}

/// POST /api/quiz/submit/{attemptId}
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
    AppJson(req): AppJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuizService::new(state.mongo.clone());
    let summary = service.submit_attempt(&attempt_id, &req.answers).await?;

    Ok(Json(SubmitQuizResponse {
        success: true,
        attempt: summary,
    }))
}
