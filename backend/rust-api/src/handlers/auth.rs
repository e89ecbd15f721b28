use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::{JwtClaims, JwtService},
    models::user::{
        ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateRoleRequest, UserProfile,
    },
    services::{auth_service::AuthService, AppState},
};

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.mongo.clone(),
        JwtService::new(&state.config.jwt_secret),
        state.config.jwt_expire_days,
    )
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    tracing::info!(username = %req.username, "registering new user");

    let response = auth_service(&state).register(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    tracing::info!(username = %req.username, "login attempt");

    let response = auth_service(&state).login(req).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// GET /api/auth/me (protected)
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth_service(&state).get_user_by_id(&claims.sub).await?;
    Ok(Json(json!({
        "success": true,
        "user": UserProfile::from(user),
    })))
}

/// POST /api/auth/change-password (protected)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::Validation(format!("Validation error: {}", e)))?;

    auth_service(&state)
        .change_password(&claims.sub, &req.old_password, &req.new_password)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}

/// PUT /api/auth/users/{id}/role (admin only)
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(req): AppJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = auth_service(&state).update_role(&user_id, req.role).await?;
    Ok(Json(json!({
        "success": true,
        "user": profile,
    })))
}
