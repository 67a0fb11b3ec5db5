//! Error taxonomy for resolution, download and transcript extraction.
//!
//! Nothing in this crate retries on these errors; the download engine's own
//! retry behavior is left as-is.

use std::path::PathBuf;

use thiserror::Error;

use super::video::Quality;

/// Failures reported by the metadata and caption providers
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("API request failed with status {status}: {message}")]
    Status {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Caption lookup failed: {0}")]
    Tool(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::QuotaExceeded(_) => "quota_exceeded",
            _ => "provider_error",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Channel resolution and listing failures
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Not a channel URL: '{0}' (expected /channel/<id>, /c/<name>, /user/<name> or /@<handle>)")]
    InvalidReference(String),

    #[error("No channel found for '{0}'")]
    ChannelNotFound(String),

    #[error("YouTube API quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("YouTube API error: {0}")]
    Provider(ProviderError),
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::InvalidReference(_) => "invalid_reference",
            ResolveError::ChannelNotFound(_) => "channel_not_found",
            ResolveError::QuotaExceeded(_) => "quota_exceeded",
            ResolveError::Provider(_) => "provider_error",
        }
    }
}

impl From<ProviderError> for ResolveError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::QuotaExceeded(message) => ResolveError::QuotaExceeded(message),
            other => ResolveError::Provider(other),
        }
    }
}

/// Download failures, classified from the engine's report
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Disk error: {0}")]
    Disk(String),

    #[error("Download engine not found: {0}")]
    EngineMissing(String),

    #[error("Download engine failed: {0}")]
    Engine(String),

    #[error("No stream at or below {ceiling}")]
    NoStreamWithinCeiling { ceiling: Quality },
}

impl DownloadError {
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::VideoUnavailable(_) => "video_unavailable",
            DownloadError::Network(_) => "network_error",
            DownloadError::Disk(_) => "disk_error",
            DownloadError::EngineMissing(_) => "engine_missing",
            DownloadError::Engine(_) => "engine_error",
            DownloadError::NoStreamWithinCeiling { .. } => "no_stream_within_ceiling",
        }
    }

    /// Classify an engine error message.
    ///
    /// The engine does not expose structured error codes, so the message is
    /// the only signal.
    pub fn from_engine_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        let trimmed = message.trim().to_string();

        const UNAVAILABLE: &[&str] = &[
            "private video",
            "video unavailable",
            "has been removed",
            "is not available",
            "available in your country",
            "members-only",
            "join this channel",
            "sign in to confirm your age",
            "this live event will begin",
            "copyright",
        ];
        const DISK: &[&str] = &[
            "no space left on device",
            "permission denied",
            "read-only file system",
            "disk quota exceeded",
            "unable to open for writing",
        ];
        const NETWORK: &[&str] = &[
            "unable to download",
            "http error",
            "timed out",
            "connection",
            "temporary failure in name resolution",
            "network is unreachable",
            "ssl",
            "getaddrinfo failed",
        ];

        if DISK.iter().any(|p| lower.contains(p)) {
            DownloadError::Disk(trimmed)
        } else if UNAVAILABLE.iter().any(|p| lower.contains(p)) {
            DownloadError::VideoUnavailable(trimmed)
        } else if NETWORK.iter().any(|p| lower.contains(p)) {
            DownloadError::Network(trimmed)
        } else {
            DownloadError::Engine(trimmed)
        }
    }
}

/// Transcript extraction failures (absence and disablement are outcomes, not errors)
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Caption provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to write transcript {path}: {source}")]
    Disk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TranscriptError {
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::Provider(_) => "provider_error",
            TranscriptError::Disk { .. } => "disk_error",
        }
    }
}
