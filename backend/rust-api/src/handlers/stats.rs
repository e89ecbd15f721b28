use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    services::{stats_service::StatsService, AppState},
};

/// GET /api/stats/user-overview/{userId} (protected)
pub async fn user_overview(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StatsService::new(state.mongo.clone());
    let response = service.user_overview(&user_id).await?;
    Ok(Json(response))
}
