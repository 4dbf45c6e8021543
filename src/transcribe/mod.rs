use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::media::{
    is_audio_or_video, FetchedMedia, HttpMediaFetcher, MediaFetcher, MediaResponse, WebpageDenylist,
};
use crate::utils::{extract_domain, format_file_size};
use crate::{TranscriptorError, TRANSCRIPTION_FALLBACK_MESSAGE};

pub mod whisper;

pub use whisper::WhisperClient;

/// Language value meaning "let the API detect it"
pub const AUTO_LANGUAGE: &str = "auto";

/// Body of a transcription request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionRequest {
    #[serde(default)]
    pub audio_url: Option<String>,

    #[serde(default)]
    pub language: Option<String>,
}

impl TranscriptionRequest {
    /// Read the request from a raw JSON body.
    ///
    /// Anything that is not a JSON object, or fields of the wrong type, are
    /// treated as absent so validation reports them instead of a parse error.
    pub fn from_json_body(body: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            audio_url: field("audioUrl"),
            language: field("language"),
        }
    }

    /// Requested language, `auto` when absent or blank
    pub fn language(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .unwrap_or(AUTO_LANGUAGE)
    }
}

/// Successful transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub transcript: String,
}

/// Failure reported by (or while talking to) the transcription API
#[derive(Debug, Clone, Default)]
pub struct UpstreamError {
    /// HTTP status from the API, when it answered
    pub status: Option<u16>,

    /// `error.message` from the API's error body
    pub upstream_message: Option<String>,

    /// Locally produced description of the failure
    pub local_message: Option<String>,

    /// Raw error body, kept for logging
    pub payload: Option<String>,
}

impl UpstreamError {
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            local_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Build from a non-2xx answer, pulling `error.message` out of the body
    pub fn from_response(status: u16, body: &str) -> Self {
        let upstream_message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| json["error"]["message"].as_str().map(str::to_string));

        Self {
            status: Some(status),
            upstream_message,
            local_message: Some(format!("Request failed with status code {status}")),
            payload: Some(body.to_string()),
        }
    }

    /// Message shown to the caller: upstream first, then local, then a fallback
    pub fn client_message(&self) -> &str {
        [&self.upstream_message, &self.local_message]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|msg| !msg.trim().is_empty())
            .unwrap_or(TRANSCRIPTION_FALLBACK_MESSAGE)
    }
}

/// A speech-to-text backend that accepts a whole media file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe the media. `language` is `None` for auto-detection.
    async fn transcribe(&self, media: FetchedMedia, language: Option<String>) -> Result<String, UpstreamError>;
}

/// The request pipeline: validate, fetch, check, upload, respond
#[derive(Clone)]
pub struct TranscriptionPipeline {
    denylist: WebpageDenylist,
    fetcher: Arc<dyn MediaFetcher>,
    transcriber: Arc<dyn SpeechToText>,
    max_upload_bytes: u64,
}

impl TranscriptionPipeline {
    pub fn new(
        denylist: WebpageDenylist,
        fetcher: Arc<dyn MediaFetcher>,
        transcriber: Arc<dyn SpeechToText>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            denylist,
            fetcher,
            transcriber,
            max_upload_bytes,
        }
    }

    /// Wire the pipeline to the real HTTP fetcher and Whisper client
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let limits = &config.limits;
        let fetcher = HttpMediaFetcher::new(
            limits.max_upload_bytes,
            limits.fetch_timeout_secs.map(Duration::from_secs),
        )?;
        let transcriber = WhisperClient::new(&config.openai, limits.upload_timeout_secs.map(Duration::from_secs))?;

        Ok(Self::new(
            WebpageDenylist::new(&config.denylist.extra_hosts),
            Arc::new(fetcher),
            Arc::new(transcriber),
            limits.max_upload_bytes,
        ))
    }

    /// Transcribe the media behind `request.audio_url`
    pub async fn transcribe_from_url(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptorError> {
        let audio_url = validate_request(request)?;
        self.denylist.check(audio_url)?;

        let language = request.language();
        tracing::info!(
            domain = extract_domain(audio_url).as_deref().unwrap_or("unknown"),
            language,
            "fetching media"
        );

        let response = self.fetcher.fetch(audio_url).await?;
        let media = validate_media(response)?;
        self.check_size(&media)?;

        tracing::info!(
            content_type = %media.content_type,
            size = %format_file_size(media.bytes.len() as u64),
            "uploading media for transcription"
        );

        let language = (language != AUTO_LANGUAGE).then(|| language.to_string());
        let transcript = self.transcriber.transcribe(media, language).await?;

        tracing::info!(chars = transcript.len(), "transcription complete");
        Ok(TranscriptionResult { transcript })
    }

    fn check_size(&self, media: &FetchedMedia) -> Result<(), TranscriptorError> {
        if media.bytes.len() as u64 > self.max_upload_bytes {
            return Err(TranscriptorError::TooLarge(format_file_size(self.max_upload_bytes)));
        }
        Ok(())
    }
}

/// Returns the non-empty `audioUrl` or `MissingAudioUrl`
pub fn validate_request(request: &TranscriptionRequest) -> Result<&str, TranscriptorError> {
    request
        .audio_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(TranscriptorError::MissingAudioUrl)
}

/// Check status and media type of a fetch result.
///
/// A missing Content-Type is reported as `unknown` and rejected.
pub fn validate_media(response: MediaResponse) -> Result<FetchedMedia, TranscriptorError> {
    if response.status != 200 {
        return Err(TranscriptorError::FetchStatus(response.status));
    }

    match response.content_type {
        Some(content_type) if is_audio_or_video(&content_type) => Ok(FetchedMedia {
            bytes: response.bytes,
            content_type,
            source_url: response.source_url,
        }),
        other => Err(TranscriptorError::NotMedia(
            other.unwrap_or_else(|| "unknown".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::media::MockMediaFetcher;

    fn media_response(status: u16, content_type: Option<&str>) -> MediaResponse {
        MediaResponse {
            status,
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(b"ID3fake-mp3"),
            source_url: "https://cdn.example.com/talk.mp3".to_string(),
        }
    }

    fn request(url: &str, language: Option<&str>) -> TranscriptionRequest {
        TranscriptionRequest {
            audio_url: Some(url.to_string()),
            language: language.map(str::to_string),
        }
    }

    fn pipeline(fetcher: MockMediaFetcher, transcriber: MockSpeechToText) -> TranscriptionPipeline {
        TranscriptionPipeline::new(
            WebpageDenylist::default(),
            Arc::new(fetcher),
            Arc::new(transcriber),
            1024,
        )
    }

    #[test]
    fn test_request_from_json_body() {
        let req = TranscriptionRequest::from_json_body(br#"{"audioUrl":"https://a/b.mp3","language":"de"}"#);
        assert_eq!(req.audio_url.as_deref(), Some("https://a/b.mp3"));
        assert_eq!(req.language(), "de");

        let req = TranscriptionRequest::from_json_body(br#"{"audioUrl":42}"#);
        assert!(req.audio_url.is_none());

        let req = TranscriptionRequest::from_json_body(b"not json");
        assert!(req.audio_url.is_none());
        assert_eq!(req.language(), AUTO_LANGUAGE);
    }

    #[test]
    fn test_blank_language_means_auto() {
        assert_eq!(request("https://a/b.mp3", Some("  ")).language(), AUTO_LANGUAGE);
        assert_eq!(request("https://a/b.mp3", None).language(), AUTO_LANGUAGE);
    }

    #[test]
    fn test_validate_request_requires_audio_url() {
        assert!(matches!(
            validate_request(&TranscriptionRequest::default()),
            Err(TranscriptorError::MissingAudioUrl)
        ));
        assert!(matches!(
            validate_request(&request("", None)),
            Err(TranscriptorError::MissingAudioUrl)
        ));
        assert!(matches!(
            validate_request(&request("   ", None)),
            Err(TranscriptorError::MissingAudioUrl)
        ));
        tokio_test::assert_ok!(validate_request(&request("https://a/b.mp3", None)));
    }

    #[test]
    fn test_validate_media() {
        let err = validate_media(media_response(404, Some("text/html"))).unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch file. Status code: 404");

        let err = validate_media(media_response(200, Some("text/html"))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "URL does not point to an audio/video file. Content-Type: text/html"
        );

        let err = validate_media(media_response(200, None)).unwrap_err();
        assert!(matches!(err, TranscriptorError::NotMedia(ct) if ct == "unknown"));

        let media = validate_media(media_response(200, Some("audio/mpeg"))).unwrap();
        assert_eq!(media.content_type, "audio/mpeg");
    }

    #[test]
    fn test_upstream_error_message_precedence() {
        let body = r#"{"error":{"message":"Invalid file format.","type":"invalid_request_error"}}"#;
        assert_eq!(UpstreamError::from_response(400, body).client_message(), "Invalid file format.");

        let err = UpstreamError::from_response(502, "<html>Bad Gateway</html>");
        assert_eq!(err.client_message(), "Request failed with status code 502");

        assert_eq!(UpstreamError::local("").client_message(), TRANSCRIPTION_FALLBACK_MESSAGE);
        assert_eq!(UpstreamError::default().client_message(), TRANSCRIPTION_FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_successful_transcription() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url| url.starts_with("https://cdn.example.com/talk.mp3"))
            .times(1)
            .returning(|_| Ok(media_response(200, Some("audio/mpeg"))));

        let mut transcriber = MockSpeechToText::new();
        transcriber
            .expect_transcribe()
            .withf(|media, language| media.content_type == "audio/mpeg" && language.is_none())
            .times(1)
            .returning(|_, _| Ok(" hello world".to_string()));

        let result = pipeline(fetcher, transcriber)
            .transcribe_from_url(&request("https://cdn.example.com/talk.mp3", None))
            .await
            .unwrap();

        assert_eq!(result.transcript, " hello world");
    }

    #[tokio::test]
    async fn test_explicit_language_is_forwarded() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(media_response(200, Some("video/mp4"))));

        let mut transcriber = MockSpeechToText::new();
        transcriber
            .expect_transcribe()
            .withf(|_, language| language.as_deref() == Some("fr"))
            .times(1)
            .returning(|_, _| Ok("bonjour".to_string()));

        let result = pipeline(fetcher, transcriber)
            .transcribe_from_url(&request("https://cdn.example.com/talk.mp4", Some("fr")))
            .await;

        assert_eq!(result.unwrap().transcript, "bonjour");
    }

    #[tokio::test]
    async fn test_denylisted_url_makes_no_outbound_calls() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher.expect_fetch().never();
        let mut transcriber = MockSpeechToText::new();
        transcriber.expect_transcribe().never();

        let err = pipeline(fetcher, transcriber)
            .transcribe_from_url(&request("https://www.YouTube.com/watch?v=dQw4w9WgXcQ", None))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscriptorError::WebpageUrl(host) if host == "youtube.com"));
    }

    #[tokio::test]
    async fn test_wrong_content_type_skips_transcription() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(media_response(200, Some("text/html; charset=utf-8"))));
        let mut transcriber = MockSpeechToText::new();
        transcriber.expect_transcribe().never();

        let err = pipeline(fetcher, transcriber)
            .transcribe_from_url(&request("https://example.com/page", None))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("text/html"));
    }

    #[tokio::test]
    async fn test_oversized_media_is_rejected_before_upload() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher.expect_fetch().returning(|_| {
            Ok(MediaResponse {
                bytes: Bytes::from(vec![0u8; 2048]),
                ..media_response(200, Some("audio/wav"))
            })
        });
        let mut transcriber = MockSpeechToText::new();
        transcriber.expect_transcribe().never();

        let err = pipeline(fetcher, transcriber)
            .transcribe_from_url(&request("https://cdn.example.com/long.wav", None))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscriptorError::TooLarge(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_upstream_message_is_surfaced() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(media_response(200, Some("audio/mpeg"))));
        let mut transcriber = MockSpeechToText::new();
        transcriber.expect_transcribe().returning(|_, _| {
            Err(UpstreamError::from_response(
                401,
                r#"{"error":{"message":"Incorrect API key provided: sk-xx.","code":"invalid_api_key"}}"#,
            ))
        });

        let err = pipeline(fetcher, transcriber)
            .transcribe_from_url(&request("https://cdn.example.com/talk.mp3", None))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "Incorrect API key provided: sk-xx.");
    }

    #[tokio::test]
    async fn test_repeated_requests_are_not_cached() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher
            .expect_fetch()
            .times(2)
            .returning(|_| Ok(media_response(200, Some("audio/mpeg"))));
        let mut transcriber = MockSpeechToText::new();
        transcriber
            .expect_transcribe()
            .times(2)
            .returning(|_, _| Ok("same".to_string()));

        let pipeline = pipeline(fetcher, transcriber);
        let req = request("https://cdn.example.com/talk.mp3", None);
        pipeline.transcribe_from_url(&req).await.unwrap();
        pipeline.transcribe_from_url(&req).await.unwrap();
    }
}
