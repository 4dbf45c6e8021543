//! HTTP mapping for [`TranscriptorError`].
//!
//! Every failure becomes `{"error": "<message>"}` with the status from
//! [`TranscriptorError::status_code`]. Server-side failures are logged once here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::TranscriptorError;

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for TranscriptorError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match &self {
            TranscriptorError::Transcription(upstream) => {
                error!(
                    upstream_status = ?upstream.status,
                    payload = upstream.payload.as_deref().unwrap_or_default(),
                    message = upstream.client_message(),
                    "Transcription error"
                );
            }
            TranscriptorError::DownloadFailed(_) | TranscriptorError::TooLarge(_) => {
                error!(error = %self, "Transcription error");
            }
            _ => {
                info!(status = status.as_u16(), error = %self, "request rejected");
            }
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
