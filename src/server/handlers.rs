use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::any::Any;
use tracing::{error, warn};

use super::{AppState, OUTCOME_HEADER};
use crate::chat::relay::{Outcome, OutcomeKind, APOLOGY_REPLY};
use crate::types::{ChatRequest, ChatResponse};

pub async fn root_handler(State(state): State<AppState>) -> Json<Value> {
    let config = state.relay.config();
    Json(json!({
        "status": "ok",
        "service": config.service_name,
        "model": config.model,
    }))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model": state.relay.config().model,
    }))
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let detail = rejection.body_text();
            warn!("Malformed chat request: {}", detail);
            return chat_reply(
                rejection.status(),
                OutcomeKind::Rejected,
                ChatResponse::degraded(APOLOGY_REPLY, detail),
            );
        }
    };

    let outcome = state.relay.respond(&request).await;
    let status = match outcome {
        Outcome::Rejected => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    let kind = outcome.kind();

    chat_reply(status, kind, outcome.into_chat_response())
}

/// Last-resort handler: a panic still yields the degraded reply shape.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unexpected internal failure".to_string()
    };

    error!("Handler panicked: {}", detail);
    chat_reply(
        StatusCode::OK,
        OutcomeKind::Degraded,
        ChatResponse::degraded(APOLOGY_REPLY, detail),
    )
}

fn chat_reply(status: StatusCode, kind: OutcomeKind, body: ChatResponse) -> Response {
    (status, [(OUTCOME_HEADER, kind.as_str())], Json(body)).into_response()
}
