use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::question::GenerateQuestionRequest,
    services::{ai_service, quiz_service::QuizService, AppState},
};

/// GET /api/ai/health
pub async fn ai_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provider = ai_service::provider_from_config(&state.config, state.mongo.clone());
    Json(json!({
        "success": true,
        "keyDetected": provider.key_detected(),
        "provider": provider.name(),
    }))
}

/// POST /api/ai/analyze-attempt/{attemptId}
pub async fn analyze_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let attempt = QuizService::new(state.mongo.clone())
        .get_attempt(&attempt_id)
        .await?;

    let provider = ai_service::provider_from_config(&state.config, state.mongo.clone());
    let summary = provider.summarize(&attempt).await;

    Ok(Json(json!({ "success": true, "summary": summary })))
}

/// POST /api/ai/generate-question
pub async fn generate_question(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<GenerateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = ai_service::provider_from_config(&state.config, state.mongo.clone());
    let question = provider
        .generate_question(req.year_level, req.topic)
        .await?;

    Ok(Json(json!({ "success": true, "question": question })))
}
