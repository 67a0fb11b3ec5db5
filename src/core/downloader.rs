//! Download orchestration: probe, pick a stream under the ceiling, fetch.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::adapters::{DownloadEngine, FetchRequest, ProgressSink};
use crate::domain::{DownloadError, DownloadResult, Quality, StreamFormat};

/// Filesystem limit for one path component, in bytes
const MAX_FILE_NAME_BYTES: usize = 255;

/// Room kept for `.` plus the extension so media and transcript names fit
const EXTENSION_RESERVE_BYTES: usize = 16;

/// Longest base name kept before the extension is added, in bytes
const MAX_BASE_NAME_BYTES: usize = MAX_FILE_NAME_BYTES - EXTENSION_RESERVE_BYTES;

/// Pick the best single-file stream at or below the ceiling.
///
/// Only streams with both audio and video and a known height qualify.
/// Highest height wins; ties go to the higher total bitrate.
pub fn select_stream(formats: &[StreamFormat], ceiling: Quality) -> Option<&StreamFormat> {
    formats
        .iter()
        .filter(|f| f.has_audio && f.has_video)
        .filter(|f| f.height.is_some_and(|h| h <= ceiling.height()))
        .max_by(|a, b| {
            a.height.cmp(&b.height).then_with(|| {
                a.tbr
                    .unwrap_or(0.0)
                    .total_cmp(&b.tbr.unwrap_or(0.0))
            })
        })
}

/// Derive the shared base file name from the video title.
///
/// The name is capped in bytes, cut on a char boundary, so multi-byte
/// titles still fit once an extension is added. Falls back to the video
/// ID when nothing usable is left of the title.
pub fn base_file_name(title: &str, video_id: &str) -> String {
    let sanitized = sanitize_filename::sanitize(title);
    let trimmed = truncate_bytes(sanitized.trim(), MAX_BASE_NAME_BYTES)
        .trim()
        .trim_end_matches('.');
    match trimmed.trim() {
        "" => video_id.to_string(),
        name => name.to_string(),
    }
}

fn truncate_bytes(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Media file name: base name plus the stream's container extension
pub fn media_file_name(title: &str, video_id: &str, ext: &str) -> String {
    let ext = if ext.is_empty() { "mp4" } else { ext };
    format!("{}.{}", base_file_name(title, video_id), ext)
}

/// Downloads single videos through the engine
pub struct DownloadOrchestrator {
    engine: Arc<dyn DownloadEngine>,
}

impl DownloadOrchestrator {
    pub fn new(engine: Arc<dyn DownloadEngine>) -> Self {
        Self { engine }
    }

    /// Make sure the engine can run before a batch starts
    pub async fn check_engine(&self) -> Result<(), DownloadError> {
        self.engine.check_available().await
    }

    /// Download one video into `output_dir`, never above `max_quality`
    #[instrument(skip(self, output_dir, progress), fields(ceiling = %max_quality))]
    pub async fn download(
        &self,
        video_id: &str,
        output_dir: &Path,
        max_quality: Quality,
        progress: &dyn ProgressSink,
    ) -> Result<DownloadResult, DownloadError> {
        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            DownloadError::Disk(format!("Failed to create {}: {}", output_dir.display(), e))
        })?;

        let probe = self.engine.probe(video_id).await?;
        let stream = select_stream(&probe.formats, max_quality).ok_or(
            DownloadError::NoStreamWithinCeiling {
                ceiling: max_quality,
            },
        )?;
        // Filtered on a known height above
        let height = stream.height.unwrap_or_default();
        debug!(
            format_id = %stream.format_id,
            height,
            ext = %stream.ext,
            "Selected stream"
        );

        let path = output_dir.join(media_file_name(&probe.title, video_id, &stream.ext));
        let request = FetchRequest {
            video_id,
            format_id: &stream.format_id,
            output: &path,
        };

        progress.start(&probe.title);
        let fetched = self.engine.fetch(&request, progress).await;
        progress.finish(match &fetched {
            Ok(()) => "done",
            Err(e) => e.kind(),
        });
        fetched?;

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            DownloadError::Engine(format!(
                "{} reported success but {} is missing: {}",
                self.engine.name(),
                path.display(),
                e
            ))
        })?;

        info!(path = %path.display(), size = metadata.len(), "Download complete");

        Ok(DownloadResult {
            video_id: video_id.to_string(),
            title: probe.title,
            path,
            quality: Quality::from_height(height),
            size_bytes: metadata.len(),
        })
    }
}
