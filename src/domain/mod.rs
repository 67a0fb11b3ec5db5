//! Domain types for tubeharvest.
//!
//! This module contains the core data structures:
//! - Channel: parsed channel references and canonical IDs
//! - Video: listings, stream formats and download results
//! - Transcript: caption cues and `[MM:SS]` rendering
//! - Errors: the resolution/download/transcript failure taxonomy

pub mod channel;
pub mod errors;
pub mod transcript;
pub mod video;

// Re-export commonly used types
pub use channel::{ChannelId, ChannelInfo, ChannelRef};
pub use errors::{DownloadError, ProviderError, ResolveError, TranscriptError};
pub use transcript::{
    format_timestamp, lines_from_cues, render_document, render_lines, Cue, TranscriptLine,
    TranscriptOutcome,
};
pub use video::{
    format_duration, watch_url, DownloadProgress, DownloadResult, Quality, StreamFormat,
    VideoDetails, VideoProbe, VideoSummary,
};
