//! Video metadata, stream formats and download results.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build the canonical watch URL for a video ID
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// One entry of a channel's video listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    /// Video ID
    pub id: String,

    /// Video title
    pub title: String,

    /// When the video was published (if the provider reports it)
    pub published_at: Option<DateTime<Utc>>,

    /// Length of the video (absent for live/upcoming streams)
    pub duration: Option<Duration>,
}

impl VideoSummary {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            published_at: None,
            duration: None,
        }
    }

    pub fn url(&self) -> String {
        watch_url(&self.id)
    }
}

/// Full video details from the metadata provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
}

/// Maximum vertical resolution the orchestrator will accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quality(u32);

impl Quality {
    pub const fn from_height(height: u32) -> Self {
        Self(height)
    }

    pub fn height(&self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(720)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}p", self.0)
    }
}

impl std::str::FromStr for Quality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let digits = s.trim().trim_end_matches(['p', 'P']);
        let height: u32 = digits
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid quality '{}': expected e.g. 720 or 720p", s))?;
        if height == 0 {
            anyhow::bail!("Invalid quality '{}': height must be positive", s);
        }
        Ok(Self(height))
    }
}

/// One stream the download engine offers for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Engine-specific format identifier
    pub format_id: String,

    /// Vertical resolution, if known
    pub height: Option<u32>,

    /// Container extension (mp4, webm, ...)
    pub ext: String,

    pub has_video: bool,
    pub has_audio: bool,

    /// Total bitrate in kbit/s, if known
    pub tbr: Option<f64>,
}

/// What the engine reports about a video before downloading it
#[derive(Debug, Clone)]
pub struct VideoProbe {
    pub id: String,
    pub title: String,
    pub duration: Option<Duration>,
    pub formats: Vec<StreamFormat>,
}

/// Outcome of a successful download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub video_id: String,

    /// Title as reported by the engine
    pub title: String,

    /// Where the media file was written
    pub path: PathBuf,

    /// Height of the selected stream
    pub quality: Quality,

    /// Size of the written file
    pub size_bytes: u64,
}

impl DownloadResult {
    /// Base file name shared with the transcript
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.video_id.clone())
    }
}

/// Progress snapshot parsed from engine output
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub percent: f64,
    pub total: Option<String>,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// Render a duration as `H:MM:SS` or `M:SS` for listings
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
