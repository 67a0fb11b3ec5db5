//! tubeharvest - Browse a YouTube channel, download videos, save transcripts
//!
//! Point it at a channel URL, pick videos from the listing, and each pick
//! is downloaded (never above a configured resolution) with a timestamped
//! transcript saved next to it.
//!
//! # Architecture
//!
//! Three thin components sit on top of adapter traits:
//! - `ChannelResolver` turns a channel URL into an ID and lists uploads
//! - `DownloadOrchestrator` selects a stream under the quality ceiling
//! - `TranscriptExtractor` writes `[MM:SS] text` transcripts
//!
//! `BatchDriver` runs them video by video; one failure never stops the
//! rest of a batch.
//!
//! # Modules
//!
//! - `adapters`: External systems (YouTube Data API, yt-dlp, caption tracks)
//! - `core`: Resolution, downloading, transcripts and batches
//! - `domain`: Data structures and error taxonomy
//! - `config`: Layered configuration
//! - `cli`: Command-line interface and interactive session
//!
//! # Usage
//!
//! ```bash
//! # Interactive session
//! tubeharvest
//!
//! # List a channel's uploads
//! tubeharvest videos https://www.youtube.com/@somechannel
//!
//! # Download two videos at up to 1080p
//! tubeharvest download dQw4w9WgXcQ 9bZkp7q19f0 --max-height 1080
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use core::{
    BatchDriver, BatchReport, ChannelResolver, DownloadOrchestrator, TranscriptExtractor,
};
pub use domain::{ChannelId, ChannelRef, DownloadError, ResolveError, TranscriptOutcome};
