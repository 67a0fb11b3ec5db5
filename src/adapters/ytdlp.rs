//! yt-dlp adapter.
//!
//! Drives the `yt-dlp` CLI as a subprocess. Probing uses
//! `--dump-single-json`; downloads run with `--newline` so progress arrives
//! one line at a time on stdout.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{DownloadEngine, FetchRequest, ProgressSink};
use crate::domain::{
    watch_url, DownloadError, DownloadProgress, ProviderError, StreamFormat, VideoProbe,
};

/// Default probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Failures running the yt-dlp binary
#[derive(Debug, Error)]
pub enum YtDlpError {
    #[error("yt-dlp binary '{0}' not found (install yt-dlp or set YT_DLP_PATH)")]
    NotFound(String),

    #[error("yt-dlp timed out after {0:?}")]
    Timeout(Duration),

    #[error("yt-dlp exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("Failed to run yt-dlp: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse yt-dlp output: {0}")]
    Decode(String),
}

impl From<YtDlpError> for DownloadError {
    fn from(err: YtDlpError) -> Self {
        match err {
            YtDlpError::NotFound(binary) => DownloadError::EngineMissing(binary),
            YtDlpError::Timeout(after) => {
                DownloadError::Network(format!("yt-dlp timed out after {:?}", after))
            }
            YtDlpError::Failed { stderr, .. } => DownloadError::from_engine_message(&stderr),
            other => DownloadError::Engine(other.to_string()),
        }
    }
}

impl From<YtDlpError> for ProviderError {
    fn from(err: YtDlpError) -> Self {
        ProviderError::Tool(err.to_string())
    }
}

/// Subset of yt-dlp's info JSON this crate reads
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Seconds
    pub duration: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<FormatInfo>,

    /// Manually uploaded caption tracks by language code
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitles: BTreeMap<String, Vec<CaptionTrack>>,

    /// Auto-generated caption tracks by language code
    #[serde(default, deserialize_with = "null_as_default")]
    pub automatic_captions: BTreeMap<String, Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatInfo {
    pub format_id: String,
    pub height: Option<u32>,
    #[serde(default)]
    pub ext: String,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub tbr: Option<f64>,
}

/// One downloadable caption file
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(default)]
    pub ext: String,
    pub url: String,
    pub name: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn has_codec(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| c != "none")
}

impl FormatInfo {
    fn to_stream(&self) -> StreamFormat {
        StreamFormat {
            format_id: self.format_id.clone(),
            height: self.height,
            ext: self.ext.clone(),
            has_video: has_codec(&self.vcodec),
            has_audio: has_codec(&self.acodec),
            tbr: self.tbr,
        }
    }
}

impl VideoInfo {
    pub fn to_probe(&self) -> VideoProbe {
        VideoProbe {
            id: self.id.clone(),
            title: self.title.clone(),
            duration: self
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(Duration::from_secs_f64),
            formats: self.formats.iter().map(FormatInfo::to_stream).collect(),
        }
    }
}

/// yt-dlp subprocess engine
#[derive(Debug, Clone)]
pub struct YtDlp {
    /// Binary name or path (default: "yt-dlp")
    binary: String,

    /// Upper bound for metadata probes
    probe_timeout: Duration,

    /// Info JSON of the last probed video, shared between clones so caption
    /// discovery can reuse the download probe
    last_info: Arc<Mutex<Option<(String, VideoInfo)>>>,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlp {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            last_info: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, err: std::io::Error) -> YtDlpError {
        if err.kind() == std::io::ErrorKind::NotFound {
            YtDlpError::NotFound(self.binary.clone())
        } else {
            YtDlpError::Io(err)
        }
    }

    /// Fetch the full info JSON for a video without downloading it
    pub async fn dump_info(&self, video_id: &str) -> Result<VideoInfo, YtDlpError> {
        debug!(video_id, "Probing video with yt-dlp");

        let child = self
            .command()
            .args(["--dump-single-json", "--no-playlist", "--no-warnings", "--skip-download"])
            .arg(watch_url(video_id))
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let output = timeout(self.probe_timeout, child.wait_with_output())
            .await
            .map_err(|_| YtDlpError::Timeout(self.probe_timeout))??;

        if !output.status.success() {
            return Err(YtDlpError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: error_summary(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| YtDlpError::Decode(e.to_string()))
    }

    /// Info JSON for a video, reusing the last probe of the same video once
    pub async fn cached_info(&self, video_id: &str) -> Result<VideoInfo, YtDlpError> {
        if let Some(info) = self.take_remembered(video_id) {
            debug!(video_id, "Reusing probed info JSON");
            return Ok(info);
        }
        self.dump_info(video_id).await
    }

    fn remember(&self, video_id: &str, info: &VideoInfo) {
        if let Ok(mut guard) = self.last_info.lock() {
            *guard = Some((video_id.to_string(), info.clone()));
        }
    }

    fn take_remembered(&self, video_id: &str) -> Option<VideoInfo> {
        let mut guard = self.last_info.lock().ok()?;
        match guard.take() {
            Some((id, info)) if id == video_id => Some(info),
            _ => None,
        }
    }

    async fn run_fetch(
        &self,
        request: &FetchRequest<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<(), YtDlpError> {
        // Output templates treat % as a field marker
        let template = request.output.to_string_lossy().replace('%', "%%");

        let mut child = self
            .command()
            .args(["-f", request.format_id, "-o", &template])
            .args(["--newline", "--force-overwrites", "--no-playlist"])
            .arg(watch_url(request.video_id))
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| YtDlpError::Decode("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| YtDlpError::Decode("stderr not captured".to_string()))?;

        let read_progress = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_progress_line(&line) {
                    Some(update) => progress.update(&update),
                    None => debug!(line = %line, "yt-dlp"),
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let read_stderr = async {
            let mut text = String::new();
            BufReader::new(stderr).read_to_string(&mut text).await?;
            Ok::<_, std::io::Error>(text)
        };

        let (progress_result, stderr_result) = tokio::join!(read_progress, read_stderr);
        progress_result?;
        let stderr_text = stderr_result?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(YtDlpError::Failed {
                code: status.code().unwrap_or(-1),
                stderr: error_summary(&stderr_text),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl DownloadEngine for YtDlp {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn check_available(&self) -> Result<(), DownloadError> {
        let path = which::which(&self.binary)
            .map_err(|_| DownloadError::EngineMissing(self.binary.clone()))?;

        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|e| DownloadError::from(self.spawn_error(e)))?;

        if !output.status.success() {
            return Err(DownloadError::Engine(format!(
                "'{} --version' failed: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(path = %path.display(), %version, "Found yt-dlp");
        Ok(())
    }

    async fn probe(&self, video_id: &str) -> Result<VideoProbe, DownloadError> {
        let info = self.dump_info(video_id).await?;
        self.remember(video_id, &info);
        Ok(info.to_probe())
    }

    async fn fetch(
        &self,
        request: &FetchRequest<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError> {
        info!(
            video_id = request.video_id,
            format = request.format_id,
            output = %request.output.display(),
            "Starting download"
        );
        self.run_fetch(request, progress).await?;
        Ok(())
    }
}

/// Parse a `--newline` progress line such as
/// `[download]  42.3% of ~ 10.00MiB at  1.00MiB/s ETA 00:05`
pub fn parse_progress_line(line: &str) -> Option<DownloadProgress> {
    let rest = line.trim().strip_prefix("[download]")?.trim_start();
    let (percent, rest) = rest.split_once('%')?;
    let percent: f64 = percent.trim().parse().ok()?;

    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let value_after = |i: usize| -> Option<String> {
        let mut j = i + 1;
        if tokens.get(j) == Some(&"~") {
            j += 1;
        }
        tokens
            .get(j)
            .map(|t| t.trim_start_matches('~').to_string())
            .filter(|t| !t.is_empty() && !t.starts_with("Unknown"))
    };

    let mut progress = DownloadProgress {
        percent,
        total: None,
        speed: None,
        eta: None,
    };
    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "of" => progress.total = value_after(i),
            "at" => progress.speed = value_after(i),
            "ETA" => progress.eta = value_after(i),
            _ => {}
        }
    }

    Some(progress)
}

/// Reduce stderr to the lines worth reporting
fn error_summary(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .collect();

    if errors.is_empty() {
        stderr.trim().to_string()
    } else {
        errors.join("\n")
    }
}
