//! Adapter interfaces for external systems.
//!
//! Three collaborators sit behind traits so the core can be exercised
//! without the network:
//! - `MetadataProvider`: channel lookups and video listings (YouTube Data API)
//! - `DownloadEngine`: probing and fetching media (yt-dlp)
//! - `CaptionProvider`: caption cues in a preferred language

pub mod captions;
pub mod youtube_api;
pub mod ytdlp;

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{
    ChannelId, ChannelInfo, Cue, DownloadError, DownloadProgress, ProviderError, VideoDetails,
    VideoProbe, VideoSummary,
};

// Re-export the concrete adapters
pub use captions::YouTubeCaptions;
pub use youtube_api::YouTubeApiClient;
pub use ytdlp::{YtDlp, YtDlpError};

/// One page of a channel's video listing
#[derive(Debug, Clone, Default)]
pub struct VideoPage {
    /// Videos on this page, in provider order
    pub videos: Vec<VideoSummary>,

    /// Token for the next page, `None` on the last page
    pub next_page_token: Option<String>,

    /// Total number of results the provider reports for the listing
    pub total_results: Option<u64>,
}

/// Channel and video metadata lookups
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up a channel by its `@handle` (without the `@`)
    async fn channel_by_handle(&self, handle: &str) -> Result<Option<ChannelId>, ProviderError>;

    /// Look up a channel by legacy username or custom name
    async fn channel_by_username(&self, name: &str) -> Result<Option<ChannelId>, ProviderError>;

    /// Free-text channel search, first hit wins
    async fn search_channel(&self, query: &str) -> Result<Option<ChannelId>, ProviderError>;

    /// Fetch one page of the channel's uploads
    async fn uploads_page(
        &self,
        channel_id: &ChannelId,
        page_token: Option<&str>,
    ) -> Result<VideoPage, ProviderError>;

    /// Channel title and statistics
    async fn channel_info(&self, channel_id: &ChannelId)
        -> Result<Option<ChannelInfo>, ProviderError>;

    /// Details of a single video
    async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>, ProviderError>;

    /// Free-text video search
    async fn search_videos(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<VideoSummary>, ProviderError>;
}

/// Receives progress updates while the engine downloads
pub trait ProgressSink: Send + Sync {
    fn start(&self, label: &str);
    fn update(&self, progress: &DownloadProgress);
    fn finish(&self, message: &str);
}

/// Progress sink that discards everything
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _label: &str) {}
    fn update(&self, _progress: &DownloadProgress) {}
    fn finish(&self, _message: &str) {}
}

/// What the orchestrator asks the engine to fetch
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub video_id: &'a str,
    pub format_id: &'a str,
    pub output: &'a Path,
}

/// External media download engine
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Human-readable engine name
    fn name(&self) -> &str;

    /// Check the engine is installed and runnable
    async fn check_available(&self) -> Result<(), DownloadError>;

    /// Fetch title, duration and available streams without downloading
    async fn probe(&self, video_id: &str) -> Result<VideoProbe, DownloadError>;

    /// Download one stream to the exact output path
    async fn fetch(
        &self,
        request: &FetchRequest<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError>;
}

/// Result of asking for captions
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionLookup {
    /// Cues in the first preferred language that had a track
    Found { language: String, cues: Vec<Cue> },

    /// The video has caption tracks, none in a preferred language
    NotInLanguages,

    /// The video has no caption tracks at all
    Disabled,
}

/// External caption source
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn fetch_cues(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<CaptionLookup, ProviderError>;
}
