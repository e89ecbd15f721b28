use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::services::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    /// User id (ObjectId hex).
    pub sub: String,
    /// Role tag: student, admin or super-admin.
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, claims: JwtClaims) -> Result<String, ApiError> {
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| ApiError::Internal(anyhow::Error::new(err).context("token encoding")))
    }

    /// Any verification failure (expired, malformed, wrong signature) maps to
    /// the same InvalidToken rejection.
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, ApiError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!("token verification failed: {}", err);
                ApiError::InvalidToken
            })
    }
}

/// Turns the bearer credential into verified claims, or rejects. Read-only:
/// no database access happens here.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let claims = jwt_service.validate_token(token)?;

    tracing::debug!(user_id = %claims.sub, role = %claims.role, "authenticated request");

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Composes on top of `auth_middleware`: requires an admin or super-admin
/// role tag in the already-verified claims.
pub async fn admin_guard_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<JwtClaims>() {
        Some(claims) if claims.role == "admin" || claims.role == "super-admin" => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!("access denied: admin role required");
            Err(ApiError::Forbidden)
        }
    }
}
