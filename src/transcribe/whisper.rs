//! OpenAI Whisper API client.
//!
//! Builds the multipart upload from fetched media and maps the API's answer
//! to either transcript text or an [`UpstreamError`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{SpeechToText, UpstreamError};
use crate::config::OpenAiConfig;
use crate::media::{FetchedMedia, DEFAULT_CONTENT_TYPE};

/// Successful response body: `{"text": "..."}`
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Client for the `/v1/audio/transcriptions` endpoint
pub struct WhisperClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl WhisperClient {
    pub fn new(config: &OpenAiConfig, timeout: Option<Duration>) -> crate::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Multipart body: `file`, `model` and, unless auto-detecting, `language`
    pub fn build_form(&self, media: FetchedMedia, language: Option<&str>) -> Result<Form, UpstreamError> {
        let file_name = media.upload_file_name();
        let length = media.bytes.len() as u64;

        let file_part = |mime: &str| {
            Part::stream_with_length(media.bytes.clone(), length)
                .file_name(file_name.clone())
                .mime_str(mime)
        };

        let part = match file_part(&media.content_type) {
            Ok(part) => part,
            Err(_) => {
                tracing::debug!(
                    content_type = %media.content_type,
                    "unparseable content type, uploading as {}",
                    DEFAULT_CONTENT_TYPE
                );
                file_part(DEFAULT_CONTENT_TYPE)
                    .map_err(|e| UpstreamError::local(format!("Failed to create file part for upload: {e}")))?
            }
        };

        let mut form = Form::new().part("file", part).text("model", self.model.clone());
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }
        Ok(form)
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, media: FetchedMedia, language: Option<String>) -> Result<String, UpstreamError> {
        let form = self.build_form(media, language.as_deref())?;

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            language = language.as_deref().unwrap_or("auto"),
            "calling transcription API"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UpstreamError::local(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(status.as_u16(), &body));
        }

        let transcription: WhisperResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::local(format!("Failed to parse transcription response: {e}")))?;

        Ok(transcription.text)
    }
}
