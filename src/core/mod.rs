//! Core components.
//!
//! This module contains:
//! - ChannelResolver: reference resolution and paginated listing
//! - DownloadOrchestrator: stream selection under a quality ceiling
//! - TranscriptExtractor: captions to `[MM:SS]` transcript files
//! - BatchDriver: sequential per-video processing and reporting

pub mod batch;
pub mod downloader;
pub mod resolver;
pub mod transcript;

// Re-export commonly used types
pub use batch::{
    BatchDriver, BatchReport, BatchSettings, Selection, SelectionError, Session, VideoReport,
};
pub use downloader::{base_file_name, media_file_name, select_stream, DownloadOrchestrator};
pub use resolver::ChannelResolver;
pub use transcript::{default_languages, TranscriptExtractor};
