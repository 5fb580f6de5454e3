use super::types::*;
use crate::AppState;
use crate::cli::CliError;
use crate::stream::stream_completion;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
};
use chrono::Utc;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

const OWNED_BY: &str = "anthropic";

/// An error rendered as an OpenAI error envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorResponse) -> Self {
        Self { status, body }
    }
}

impl From<CliError> for ApiError {
    fn from(err: CliError) -> Self {
        let status = match err {
            CliError::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            CliError::InvocationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, ErrorResponse::server_error(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn model_card(id: &str) -> ModelCard {
    ModelCard {
        id: id.to_string(),
        object: "model".to_string(),
        created: Utc::now().timestamp(),
        owned_by: OWNED_BY.to_string(),
    }
}

/// GET /v1/models
pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    Json(ModelList {
        object: "list".to_string(),
        data: state.gateway.models().known_models().map(model_card).collect(),
    })
}

/// GET /v1/models/{model_id}
pub async fn get_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelCard>, ApiError> {
    if !state.gateway.models().is_known(&model_id) {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            ErrorResponse::not_found(format!("Model {model_id} not found")),
        ));
    }
    Ok(Json(model_card(&model_id)))
}

/// POST /v1/chat/completions
///
/// Returns a JSON completion, or an SSE stream when `stream` is set.
pub async fn chat_completions(
    State(state): State<AppState>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        ApiError::new(
            rejection.status(),
            ErrorResponse::invalid_request(rejection.body_text()),
        )
    })?;

    req.validate()
        .map_err(|msg| ApiError::new(StatusCode::BAD_REQUEST, ErrorResponse::invalid_request(msg)))?;

    info!(
        name: "completion.request",
        model = %req.model,
        messages = req.messages.len(),
        stream = req.stream,
        "Chat completion request"
    );

    if req.stream {
        let frames = stream_completion(Arc::clone(&state.gateway), req)
            .map(|frame| Ok::<_, Infallible>(frame.to_event()));

        return Ok((
            [("x-accel-buffering", "no")],
            Sse::new(frames).keep_alive(KeepAlive::default()),
        )
            .into_response());
    }

    let response = state.gateway.complete(&req).await?;
    Ok(Json(response).into_response())
}
