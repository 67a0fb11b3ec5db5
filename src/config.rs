//! Configuration for tubeharvest.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags
//! 2. Environment variables (YOUTUBE_API_KEY, TUBEHARVEST_*, YT_DLP_PATH),
//!    with a `.env` file loaded first when present
//! 3. Config file (.tubeharvest/config.yaml)
//! 4. Defaults (~/.tubeharvest)
//!
//! Config file discovery:
//! - Searches current directory and parents for .tubeharvest/config.yaml
//! - Relative paths in the config file resolve against the project root
//!   (the directory holding .tubeharvest/)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::domain::Quality;

pub const ENV_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_BASE_DIR: &str = "TUBEHARVEST_BASE_DIR";
pub const ENV_DOWNLOAD_DIR: &str = "TUBEHARVEST_DOWNLOAD_DIR";
pub const ENV_TRANSCRIPT_DIR: &str = "TUBEHARVEST_TRANSCRIPT_DIR";
pub const ENV_MAX_HEIGHT: &str = "TUBEHARVEST_MAX_HEIGHT";
pub const ENV_LANGUAGES: &str = "TUBEHARVEST_LANGUAGES";
pub const ENV_YT_DLP: &str = "YT_DLP_PATH";

const CONFIG_DIR: &str = ".tubeharvest";
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 120;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub ytdlp: YtDlpConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Base directory (relative to the project root)
    pub base_dir: Option<String>,
    /// Media directory
    pub downloads: Option<String>,
    /// Transcript directory
    pub transcripts: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub max_height: Option<u32>,
    pub languages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpConfig {
    pub binary: Option<String>,
    pub probe_timeout_seconds: Option<u64>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub transcript_dir: Option<PathBuf>,
    pub max_height: Option<Quality>,
    pub languages: Option<Vec<String>>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Data API key (only needed for metadata commands)
    pub api_key: Option<String>,
    pub base_dir: PathBuf,
    pub download_dir: PathBuf,
    pub transcript_dir: PathBuf,
    pub max_quality: Quality,
    /// Caption language preference, first wins
    pub languages: Vec<String>,
    pub ytdlp_binary: String,
    pub probe_timeout: Duration,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Load configuration from all sources
    pub fn load(overrides: &Overrides) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }

        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let config_file = find_config_file(&cwd);

        Self::resolve(overrides, config_file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Merge all sources; `env` looks up environment variables
    fn resolve(
        overrides: &Overrides,
        config_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let file = match config_path {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };
        // Project root is the parent of .tubeharvest/
        let project_root = config_path
            .and_then(|p| p.parent())
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        let from_file =
            |value: &Option<String>| value.as_deref().map(|v| resolve_path(project_root, v));

        let base_dir = match env(ENV_BASE_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => match from_file(&file.paths.base_dir) {
                Some(dir) => dir,
                None => dirs::home_dir()
                    .context("Failed to determine home directory")?
                    .join(CONFIG_DIR),
            },
        };

        let download_dir = overrides
            .download_dir
            .clone()
            .or_else(|| env(ENV_DOWNLOAD_DIR).map(PathBuf::from))
            .or_else(|| from_file(&file.paths.downloads))
            .unwrap_or_else(|| base_dir.join("downloads"));

        let transcript_dir = overrides
            .transcript_dir
            .clone()
            .or_else(|| env(ENV_TRANSCRIPT_DIR).map(PathBuf::from))
            .or_else(|| from_file(&file.paths.transcripts))
            .unwrap_or_else(|| base_dir.join("transcripts"));

        let max_quality = match overrides.max_height {
            Some(quality) => quality,
            None => match env(ENV_MAX_HEIGHT) {
                Some(value) => value
                    .parse()
                    .with_context(|| format!("Invalid {}", ENV_MAX_HEIGHT))?,
                None => file
                    .youtube
                    .max_height
                    .map(Quality::from_height)
                    .unwrap_or_default(),
            },
        };

        let languages = overrides
            .languages
            .clone()
            .or_else(|| env(ENV_LANGUAGES).map(|v| parse_languages(&v)))
            .or(file.youtube.languages)
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(crate::core::default_languages);

        let api_key = overrides
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env(ENV_API_KEY))
            .or(file.youtube.api_key);

        let ytdlp_binary = env(ENV_YT_DLP)
            .or(file.ytdlp.binary)
            .unwrap_or_else(|| "yt-dlp".to_string());

        let probe_timeout = Duration::from_secs(
            file.ytdlp
                .probe_timeout_seconds
                .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
        );

        Ok(Self {
            api_key,
            base_dir,
            download_dir,
            transcript_dir,
            max_quality,
            languages,
            ytdlp_binary,
            probe_timeout,
            config_file: config_path.map(Path::to_path_buf),
        })
    }

    /// The API key, or an error naming the variable to set
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().with_context(|| {
            format!(
                "YouTube Data API key not configured: set {} or pass --api-key",
                ENV_API_KEY
            )
        })
    }

    /// API key safe for display
    pub fn masked_api_key(&self) -> String {
        match self.api_key.as_deref() {
            None => "(not set)".to_string(),
            Some(key) if key.chars().count() <= 8 => "****".to_string(),
            Some(key) => {
                let tail: String = key.chars().skip(key.chars().count() - 4).collect();
                format!("****{}", tail)
            }
        }
    }

    /// Create the media and transcript directories
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.download_dir, &self.transcript_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Split a comma-separated language list
pub fn parse_languages(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
