//! URL Transcriber - an HTTP service that turns a media URL into a transcript
//!
//! The service downloads an audio or video file from a caller-supplied URL,
//! forwards it to the OpenAI Whisper transcription API and returns the text.

pub mod cli;
pub mod config;
pub mod media;
pub mod server;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use media::{FetchedMedia, MediaFetcher};
pub use transcribe::{TranscriptionPipeline, TranscriptionRequest, TranscriptionResult};

/// Result type used by startup and CLI code
pub type Result<T> = anyhow::Result<T>;

/// Fallback message when neither the upstream nor the client produced one
pub const TRANSCRIPTION_FALLBACK_MESSAGE: &str = "Transcription failed";

/// Every way a transcription request can fail
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("audioUrl is required")]
    MissingAudioUrl,

    #[error(
        "URLs from {0} are webpages, not media files. Please provide a direct link to an audio or video file (for example a URL ending in .mp3 or .mp4)"
    )]
    WebpageUrl(String),

    #[error("Failed to download file: {0}")]
    DownloadFailed(String),

    #[error("Failed to fetch file. Status code: {0}")]
    FetchStatus(u16),

    #[error("URL does not point to an audio/video file. Content-Type: {0}")]
    NotMedia(String),

    #[error("File exceeds the maximum upload size of {0}")]
    TooLarge(String),

    #[error("{}", .0.client_message())]
    Transcription(transcribe::UpstreamError),
}

impl TranscriptorError {
    /// HTTP status code the error is reported with
    pub fn status_code(&self) -> u16 {
        match self {
            TranscriptorError::MethodNotAllowed => 405,
            TranscriptorError::MissingAudioUrl
            | TranscriptorError::WebpageUrl(_)
            | TranscriptorError::FetchStatus(_)
            | TranscriptorError::NotMedia(_) => 400,
            TranscriptorError::DownloadFailed(_)
            | TranscriptorError::TooLarge(_)
            | TranscriptorError::Transcription(_) => 500,
        }
    }
}

impl From<transcribe::UpstreamError> for TranscriptorError {
    fn from(err: transcribe::UpstreamError) -> Self {
        TranscriptorError::Transcription(err)
    }
}
