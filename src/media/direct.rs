use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use url::Url;

use super::{is_audio_or_video, MediaFetcher, MediaResponse};
use crate::utils::format_file_size;
use crate::TranscriptorError;

/// Fetches media with a plain HTTP GET against the caller's URL
pub struct HttpMediaFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpMediaFetcher {
    pub fn new(max_bytes: u64, timeout: Option<Duration>) -> crate::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            max_bytes,
        })
    }

    fn too_large(&self) -> TranscriptorError {
        TranscriptorError::TooLarge(format_file_size(self.max_bytes))
    }

    /// Reject anything that is not an absolute http(s) URL before connecting
    fn parse_url(url: &str) -> Result<Url, TranscriptorError> {
        let parsed = Url::parse(url)
            .map_err(|e| TranscriptorError::DownloadFailed(format!("Invalid URL {url}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TranscriptorError::DownloadFailed(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaResponse, TranscriptorError> {
        let parsed = Self::parse_url(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| TranscriptorError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_string());

        // Status and type are judged before the body is read or the ceiling applied
        let is_media = content_type.as_deref().is_some_and(is_audio_or_video);
        if status != StatusCode::OK || !is_media {
            tracing::debug!(
                status = status.as_u16(),
                content_type = content_type.as_deref().unwrap_or("unknown"),
                "skipping body of non-media response"
            );
            return Ok(MediaResponse {
                status: status.as_u16(),
                content_type,
                bytes: Default::default(),
                source_url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                tracing::warn!(size = %format_file_size(length), "declared Content-Length exceeds upload ceiling");
                return Err(self.too_large());
            }
        }

        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TranscriptorError::DownloadFailed(e.to_string()))?;
            if (buffer.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large());
            }
            buffer.extend_from_slice(&chunk);
        }

        tracing::debug!(size = %format_file_size(buffer.len() as u64), "media downloaded");

        Ok(MediaResponse {
            status: status.as_u16(),
            content_type,
            bytes: buffer.freeze(),
            source_url: url.to_string(),
        })
    }
}
