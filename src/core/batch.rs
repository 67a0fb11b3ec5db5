//! Batch processing of selected videos with per-video failure isolation.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument, warn};

use super::downloader::DownloadOrchestrator;
use super::transcript::TranscriptExtractor;
use crate::adapters::ProgressSink;
use crate::domain::{
    ChannelId, DownloadError, DownloadResult, Quality, TranscriptError, TranscriptOutcome,
    VideoSummary,
};

/// The resolved channel and its listing, owned by the interactive loop
#[derive(Debug, Clone)]
pub struct Session {
    pub channel_id: ChannelId,
    pub channel_title: Option<String>,
    pub videos: Vec<VideoSummary>,
}

impl Session {
    pub fn new(channel_id: ChannelId, videos: Vec<VideoSummary>) -> Self {
        Self {
            channel_id,
            channel_title: None,
            videos,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.channel_title = Some(title.into());
        self
    }

    /// Channel title if known, otherwise the ID
    pub fn display_name(&self) -> String {
        self.channel_title
            .clone()
            .unwrap_or_else(|| self.channel_id.to_string())
    }

    /// Videos picked by a selection (empty for `Back`/`Quit`)
    pub fn selected(&self, selection: &Selection) -> &[VideoSummary] {
        match selection {
            Selection::Index(i) => self.videos.get(*i..=*i).unwrap_or(&[]),
            Selection::All => &self.videos,
            Selection::Back | Selection::Quit => &[],
        }
    }
}

/// A parsed selection command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based position in the listing
    Index(usize),
    All,
    Back,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Please enter a video number, 'all', 'b' or 'q'")]
    Empty,

    #[error("Invalid video number {index}: choose between 1 and {count}")]
    OutOfRange { index: usize, count: usize },

    #[error("Unrecognized input '{0}': enter a video number, 'all', 'b' or 'q'")]
    Unrecognized(String),
}

impl Selection {
    /// Parse `<n>` (1-based), `all`, `b` or `q`, case-insensitively
    pub fn parse(input: &str, video_count: usize) -> Result<Self, SelectionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SelectionError::Empty);
        }

        match input.to_lowercase().as_str() {
            "all" => Ok(Selection::All),
            "b" => Ok(Selection::Back),
            "q" => Ok(Selection::Quit),
            other => match other.parse::<usize>() {
                Ok(index) if (1..=video_count).contains(&index) => Ok(Selection::Index(index - 1)),
                Ok(index) => Err(SelectionError::OutOfRange {
                    index,
                    count: video_count,
                }),
                Err(_) => Err(SelectionError::Unrecognized(input.to_string())),
            },
        }
    }
}

/// Where batch output goes and the quality ceiling
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub download_dir: PathBuf,
    pub transcript_dir: PathBuf,
    pub max_quality: Quality,
}

/// Outcome of one video in a batch
#[derive(Debug)]
pub struct VideoReport {
    pub video_id: String,
    pub title: String,
    pub download: Result<DownloadResult, DownloadError>,

    /// `None` when the download failed and extraction was skipped
    pub transcript: Option<Result<TranscriptOutcome, TranscriptError>>,
}

impl VideoReport {
    pub fn succeeded(&self) -> bool {
        self.download.is_ok() && !matches!(self.transcript, Some(Err(_)))
    }

    /// Kind label of the first failure, if any
    pub fn failure_kind(&self) -> Option<&'static str> {
        match (&self.download, &self.transcript) {
            (Err(e), _) => Some(e.kind()),
            (Ok(_), Some(Err(e))) => Some(e.kind()),
            _ => None,
        }
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let download = match &self.download {
            Ok(result) => format!(
                "downloaded {} ({}, {} bytes)",
                result.path.display(),
                result.quality,
                result.size_bytes
            ),
            Err(e) => format!("download failed [{}]: {}", e.kind(), e),
        };

        match &self.transcript {
            None => download,
            Some(Ok(outcome)) => format!("{}; {}", download, outcome),
            Some(Err(e)) => format!("{}; transcript failed [{}]: {}", download, e.kind(), e),
        }
    }
}

/// Ordered per-video outcomes of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub videos: Vec<VideoReport>,
}

impl BatchReport {
    pub fn succeeded_count(&self) -> usize {
        self.videos.iter().filter(|v| v.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.videos.len() - self.succeeded_count()
    }

    pub fn transcripts_written(&self) -> usize {
        self.videos
            .iter()
            .filter(|v| matches!(v.transcript, Some(Ok(TranscriptOutcome::Written { .. }))))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &VideoReport> {
        self.videos.iter().filter(|v| !v.succeeded())
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Processed {} video(s): {} succeeded, {} failed, {} transcript(s) written",
            self.videos.len(),
            self.succeeded_count(),
            self.failed_count(),
            self.transcripts_written()
        )?;
        for video in self.failures() {
            writeln!(
                f,
                "  FAILED {} ({}) [{}]",
                video.video_id,
                video.title,
                video.failure_kind().unwrap_or("unknown")
            )?;
        }
        Ok(())
    }
}

/// Runs download then transcript for each selected video, one at a time
pub struct BatchDriver {
    downloader: DownloadOrchestrator,
    transcripts: TranscriptExtractor,
    settings: BatchSettings,
}

impl BatchDriver {
    pub fn new(
        downloader: DownloadOrchestrator,
        transcripts: TranscriptExtractor,
        settings: BatchSettings,
    ) -> Self {
        Self {
            downloader,
            transcripts,
            settings,
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    pub fn downloader(&self) -> &DownloadOrchestrator {
        &self.downloader
    }

    pub fn transcripts(&self) -> &TranscriptExtractor {
        &self.transcripts
    }

    /// Process videos in order; a failure never stops the rest
    #[instrument(skip_all, fields(count = videos.len()))]
    pub async fn process(
        &self,
        videos: &[VideoSummary],
        progress: &dyn ProgressSink,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for (i, video) in videos.iter().enumerate() {
            info!(
                video_id = %video.id,
                position = i + 1,
                total = videos.len(),
                "Processing video"
            );
            let outcome = self.process_one(video, progress).await;
            if let Some(kind) = outcome.failure_kind() {
                warn!(video_id = %outcome.video_id, kind, "Video failed");
            }
            report.videos.push(outcome);
        }

        info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            "Batch complete"
        );
        report
    }

    async fn process_one(&self, video: &VideoSummary, progress: &dyn ProgressSink) -> VideoReport {
        let download = self
            .downloader
            .download(
                &video.id,
                &self.settings.download_dir,
                self.settings.max_quality,
                progress,
            )
            .await;

        let (title, transcript) = match &download {
            Ok(result) => {
                let transcript = self
                    .transcripts
                    .extract(
                        &video.id,
                        &result.title,
                        &result.base_name(),
                        &self.settings.transcript_dir,
                    )
                    .await;
                (result.title.clone(), Some(transcript))
            }
            Err(_) => (video.title.clone(), None),
        };

        VideoReport {
            video_id: video.id.clone(),
            title,
            download,
            transcript,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_parsing() {
        assert_eq!(Selection::parse("3", 5), Ok(Selection::Index(2)));
        assert_eq!(Selection::parse(" 1 ", 5), Ok(Selection::Index(0)));
        assert_eq!(Selection::parse("all", 5), Ok(Selection::All));
        assert_eq!(Selection::parse("ALL", 5), Ok(Selection::All));
        assert_eq!(Selection::parse("B", 5), Ok(Selection::Back));
        assert_eq!(Selection::parse("q", 5), Ok(Selection::Quit));
    }

    #[test]
    fn test_selection_rejects_bad_input() {
        assert_eq!(
            Selection::parse("0", 5),
            Err(SelectionError::OutOfRange { index: 0, count: 5 })
        );
        assert_eq!(
            Selection::parse("99", 5),
            Err(SelectionError::OutOfRange { index: 99, count: 5 })
        );
        assert_eq!(
            Selection::parse("x", 5),
            Err(SelectionError::Unrecognized("x".to_string()))
        );
        assert_eq!(Selection::parse("  ", 5), Err(SelectionError::Empty));
        assert!(Selection::parse("-1", 5).is_err());
    }

    #[test]
    fn test_session_selection() {
        let session = Session::new(
            ChannelId::new("UC1"),
            vec![VideoSummary::new("a", "A"), VideoSummary::new("b", "B")],
        );

        assert_eq!(session.selected(&Selection::Index(1))[0].id, "b");
        assert_eq!(session.selected(&Selection::All).len(), 2);
        assert!(session.selected(&Selection::Quit).is_empty());
        assert!(session.selected(&Selection::Index(7)).is_empty());
        assert_eq!(session.display_name(), "UC1");
    }

    #[test]
    fn test_report_counts() {
        let failed = VideoReport {
            video_id: "v2".to_string(),
            title: "Two".to_string(),
            download: Err(DownloadError::Network("reset".to_string())),
            transcript: None,
        };
        assert!(!failed.succeeded());
        assert_eq!(failed.failure_kind(), Some("network_error"));

        let report = BatchReport {
            videos: vec![failed],
        };
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_success());

        let text = report.to_string();
        assert!(text.contains("FAILED v2 (Two) [network_error]"));
    }
}
