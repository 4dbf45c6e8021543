use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;
use crate::transcribe::{TranscriptionRequest, TranscriptionResult};
use crate::utils::format_file_size;
use crate::TranscriptorError;

/// `/api/transcribe`: accepts any method so non-POST gets a JSON 405
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Result<Json<TranscriptionResult>, TranscriptorError> {
    if method != Method::POST {
        return Err(TranscriptorError::MethodNotAllowed);
    }

    let request = TranscriptionRequest::from_json_body(&body);
    let result = state.pipeline.transcribe_from_url(&request).await?;

    Ok(Json(result))
}

/// Liveness plus the model and upload ceiling this instance runs with
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.openai.model,
        "max_upload": format_file_size(state.config.limits.max_upload_bytes),
    }))
}
