//! In-memory fakes of the adapter traits shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use tubeharvest::adapters::{
    CaptionLookup, CaptionProvider, DownloadEngine, FetchRequest, MetadataProvider, ProgressSink,
    VideoPage,
};
use tubeharvest::core::{
    BatchDriver, BatchSettings, DownloadOrchestrator, TranscriptExtractor,
};
use tubeharvest::domain::{
    ChannelId, ChannelInfo, Cue, DownloadError, DownloadProgress, ProviderError, Quality,
    StreamFormat, VideoDetails, VideoProbe, VideoSummary,
};

// ============================================================================
// Metadata
// ============================================================================

/// Metadata provider backed by maps; records every call
#[derive(Default)]
pub struct FakeMetadata {
    pub handles: HashMap<String, ChannelId>,
    pub usernames: HashMap<String, ChannelId>,
    pub searches: HashMap<String, ChannelId>,
    pub uploads: HashMap<String, Vec<VideoSummary>>,
    pub infos: HashMap<String, ChannelInfo>,
    pub page_size: usize,
    /// Returned from every call when set
    pub fail_with: Option<ProviderError>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMetadata {
    pub fn new() -> Self {
        Self {
            page_size: 50,
            ..Default::default()
        }
    }

    pub fn with_uploads(mut self, channel: &str, videos: Vec<VideoSummary>) -> Self {
        self.uploads.insert(channel.to_string(), videos);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    async fn channel_by_handle(&self, handle: &str) -> Result<Option<ChannelId>, ProviderError> {
        self.record(format!("handle:{}", handle))?;
        Ok(self.handles.get(handle).cloned())
    }

    async fn channel_by_username(&self, name: &str) -> Result<Option<ChannelId>, ProviderError> {
        self.record(format!("username:{}", name))?;
        Ok(self.usernames.get(name).cloned())
    }

    async fn search_channel(&self, query: &str) -> Result<Option<ChannelId>, ProviderError> {
        self.record(format!("search:{}", query))?;
        Ok(self.searches.get(query).cloned())
    }

    async fn uploads_page(
        &self,
        channel_id: &ChannelId,
        page_token: Option<&str>,
    ) -> Result<VideoPage, ProviderError> {
        self.record(format!("uploads:{}:{}", channel_id, page_token.unwrap_or("")))?;

        let all = self.uploads.get(channel_id.as_str()).cloned().unwrap_or_default();
        let start: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(all.len());

        Ok(VideoPage {
            videos: all[start..end].to_vec(),
            next_page_token: (end < all.len()).then(|| end.to_string()),
            total_results: Some(all.len() as u64),
        })
    }

    async fn channel_info(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelInfo>, ProviderError> {
        self.record(format!("info:{}", channel_id))?;
        Ok(self.infos.get(channel_id.as_str()).cloned())
    }

    async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>, ProviderError> {
        self.record(format!("details:{}", video_id))?;
        Ok(None)
    }

    async fn search_videos(
        &self,
        query: &str,
        _limit: u32,
    ) -> Result<Vec<VideoSummary>, ProviderError> {
        self.record(format!("search_videos:{}", query))?;
        Ok(Vec::new())
    }
}

/// `count` videos with IDs `v1..=vN`, in order
pub fn numbered_videos(count: usize) -> Vec<VideoSummary> {
    (1..=count)
        .map(|i| VideoSummary::new(format!("v{}", i), format!("Video {}", i)))
        .collect()
}

// ============================================================================
// Download engine
// ============================================================================

/// A stream carrying both audio and video
pub fn muxed(format_id: &str, height: u32) -> StreamFormat {
    StreamFormat {
        format_id: format_id.to_string(),
        height: Some(height),
        ext: "mp4".to_string(),
        has_video: true,
        has_audio: true,
        tbr: Some(height as f64 * 2.0),
    }
}

/// Typical formats of a video whose best stream is 1080p
pub fn formats_up_to_1080() -> Vec<StreamFormat> {
    vec![muxed("18", 360), muxed("22", 720), muxed("37", 1080)]
}

/// Engine that "downloads" by writing a few bytes to the output path
#[derive(Default)]
pub struct FakeEngine {
    pub videos: HashMap<String, VideoProbe>,
    pub failures: HashMap<String, DownloadError>,
    pub fetched: Mutex<Vec<(String, String)>>,
}

impl FakeEngine {
    pub fn with_video(mut self, id: &str, title: &str, formats: Vec<StreamFormat>) -> Self {
        self.videos.insert(
            id.to_string(),
            VideoProbe {
                id: id.to_string(),
                title: title.to_string(),
                duration: None,
                formats,
            },
        );
        self
    }

    pub fn failing(mut self, id: &str, err: DownloadError) -> Self {
        self.failures.insert(id.to_string(), err);
        self
    }

    pub fn fetched(&self) -> Vec<(String, String)> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_available(&self) -> Result<(), DownloadError> {
        Ok(())
    }

    async fn probe(&self, video_id: &str) -> Result<VideoProbe, DownloadError> {
        if let Some(err) = self.failures.get(video_id) {
            return Err(err.clone());
        }
        self.videos
            .get(video_id)
            .cloned()
            .ok_or_else(|| DownloadError::VideoUnavailable(format!("{} not found", video_id)))
    }

    async fn fetch(
        &self,
        request: &FetchRequest<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError> {
        self.fetched
            .lock()
            .unwrap()
            .push((request.video_id.to_string(), request.format_id.to_string()));

        progress.update(&DownloadProgress {
            percent: 100.0,
            total: Some("12B".to_string()),
            speed: None,
            eta: None,
        });

        std::fs::write(request.output, b"fake media!!")
            .map_err(|e| DownloadError::Disk(e.to_string()))
    }
}

// ============================================================================
// Captions
// ============================================================================

/// Caption provider with a fixed answer per video (default: nothing in language)
#[derive(Default)]
pub struct FakeCaptions {
    pub lookups: HashMap<String, CaptionLookup>,
    pub errors: HashMap<String, ProviderError>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeCaptions {
    pub fn with_cues(mut self, id: &str, cues: Vec<Cue>) -> Self {
        self.lookups.insert(
            id.to_string(),
            CaptionLookup::Found {
                language: "en".to_string(),
                cues,
            },
        );
        self
    }

    pub fn with_lookup(mut self, id: &str, lookup: CaptionLookup) -> Self {
        self.lookups.insert(id.to_string(), lookup);
        self
    }

    pub fn failing(mut self, id: &str, err: ProviderError) -> Self {
        self.errors.insert(id.to_string(), err);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionProvider for FakeCaptions {
    async fn fetch_cues(
        &self,
        video_id: &str,
        _languages: &[String],
    ) -> Result<CaptionLookup, ProviderError> {
        self.requested.lock().unwrap().push(video_id.to_string());
        if let Some(err) = self.errors.get(video_id) {
            return Err(err.clone());
        }
        Ok(self
            .lookups
            .get(video_id)
            .cloned()
            .unwrap_or(CaptionLookup::NotInLanguages))
    }
}

/// Two short cues, deliberately out of order
pub fn sample_cues() -> Vec<Cue> {
    vec![
        Cue::new(std::time::Duration::from_secs(65), "and then"),
        Cue::new(std::time::Duration::from_secs(0), "hello\nthere"),
    ]
}

// ============================================================================
// Wiring
// ============================================================================

/// Temp media and transcript directories
pub struct Dirs {
    pub temp: TempDir,
}

impl Dirs {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn media(&self) -> std::path::PathBuf {
        self.temp.path().join("media")
    }

    pub fn transcripts(&self) -> std::path::PathBuf {
        self.temp.path().join("transcripts")
    }
}

pub fn batch_driver(
    engine: Arc<FakeEngine>,
    captions: Arc<FakeCaptions>,
    dirs: &Dirs,
    max_quality: Quality,
) -> BatchDriver {
    BatchDriver::new(
        DownloadOrchestrator::new(engine),
        TranscriptExtractor::new(captions, vec!["en".to_string()]),
        BatchSettings {
            download_dir: dirs.media(),
            transcript_dir: dirs.transcripts(),
            max_quality,
        },
    )
}

/// File names in a directory, sorted (empty if it does not exist)
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
