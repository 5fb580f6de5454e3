use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::openai::types::ErrorResponse;

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_val: &str) -> Option<&str> {
    header_val
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject requests without a configured API key when keys are configured.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let security = &state.config.security;
    if !security.auth_required() {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token);

    match token {
        Some(token) if security.api_keys.iter().any(|k| k == token) => next.run(request).await,
        Some(_) => unauthorized("Invalid API key"),
        None => unauthorized("Authorization header required"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::authentication(message)),
    )
        .into_response()
}
