use async_trait::async_trait;
use bytes::Bytes;

pub mod denylist;
pub mod direct;

pub use denylist::WebpageDenylist;
pub use direct::HttpMediaFetcher;

use crate::TranscriptorError;

/// MIME type used for the upload when the fetched one is unusable
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

/// Raw outcome of a GET against the caller's URL
#[derive(Debug, Clone)]
pub struct MediaResponse {
    /// HTTP status returned by the media host
    pub status: u16,

    /// Content-Type header, if present and valid UTF-8
    pub content_type: Option<String>,

    /// Response body. Only read when the status is 200.
    pub bytes: Bytes,

    /// URL the bytes were requested from
    pub source_url: String,
}

/// Media that passed status and type validation
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Bytes,
    pub content_type: String,
    pub source_url: String,
}

impl FetchedMedia {
    /// Container format implied by the content type
    pub fn format(&self) -> MediaFormat {
        MediaFormat::from_content_type(&self.content_type)
    }

    /// File name sent with the multipart upload
    pub fn upload_file_name(&self) -> String {
        format!("audiofile.{}", self.format().extension())
    }
}

/// Container formats accepted by the transcription API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Mp3,
    M4a,
    Mp4,
    Mpeg,
    Wav,
    Flac,
    Ogg,
    Webm,
}

impl MediaFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "mp3",
            MediaFormat::M4a => "m4a",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mpeg => "mpeg",
            MediaFormat::Wav => "wav",
            MediaFormat::Flac => "flac",
            MediaFormat::Ogg => "ogg",
            MediaFormat::Webm => "webm",
        }
    }

    /// Determine the format from a Content-Type value, defaulting to MP3
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "video/mp4" => MediaFormat::Mp4,
            "video/mpeg" => MediaFormat::Mpeg,
            ct if ct.contains("mp4") || ct.contains("m4a") || ct.contains("aac") => MediaFormat::M4a,
            ct if ct.contains("wav") || ct.contains("wave") => MediaFormat::Wav,
            ct if ct.contains("flac") => MediaFormat::Flac,
            ct if ct.contains("ogg") => MediaFormat::Ogg,
            ct if ct.contains("webm") => MediaFormat::Webm,
            _ => MediaFormat::Mp3,
        }
    }
}

/// True when the Content-Type names an audio or video payload
pub fn is_audio_or_video(content_type: &str) -> bool {
    let lower = content_type.trim_start().to_ascii_lowercase();
    lower.starts_with("audio") || lower.starts_with("video")
}

/// Downloads the media behind a caller-supplied URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// GET the URL. Transport failures map to `DownloadFailed`, bodies over
    /// the size ceiling to `TooLarge`. Non-200 or non-media responses are
    /// returned with an empty body, not raised.
    async fn fetch(&self, url: &str) -> Result<MediaResponse, TranscriptorError>;
}
