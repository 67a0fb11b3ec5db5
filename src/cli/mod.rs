//! Command-line interface for tubeharvest.
//!
//! Without a subcommand the interactive session starts. Subcommands run
//! single operations non-interactively.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{DownloadEngine, MetadataProvider, YouTubeApiClient, YouTubeCaptions, YtDlp};
use crate::config::{Overrides, ResolvedConfig};
use crate::core::{
    base_file_name, BatchDriver, BatchSettings, ChannelResolver, DownloadOrchestrator,
    TranscriptExtractor,
};
use crate::domain::{format_duration, Quality, TranscriptOutcome, VideoSummary};

pub mod interactive;
pub mod progress;

use interactive::{write_listing, InteractiveLoop};
use progress::BarProgress;

/// tubeharvest - Download a YouTube channel's videos with their transcripts
#[derive(Parser, Debug)]
#[command(name = "tubeharvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Channel to open when starting the interactive session
    #[arg(long)]
    pub channel: Option<String>,

    /// YouTube Data API key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Highest video resolution to download (e.g. 720 or 1080p)
    #[arg(long, global = true)]
    pub max_height: Option<Quality>,

    /// Caption languages in order of preference (comma-separated)
    #[arg(long, value_delimiter = ',', global = true)]
    pub languages: Option<Vec<String>>,

    /// Directory for downloaded media
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Directory for transcripts
    #[arg(long, global = true)]
    pub transcript_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a channel's videos
    Videos {
        /// Channel URL (/channel/, /c/, /user/ or /@handle) or @handle
        reference: String,
    },

    /// Download videos and their transcripts
    Download {
        /// Video IDs
        #[arg(required = true)]
        video_ids: Vec<String>,
    },

    /// Save the transcript of one video
    Transcript {
        /// Video ID
        video_id: String,
    },

    /// Show details of a video
    Info {
        /// Video ID
        video_id: String,
    },

    /// Search for videos
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            download_dir: self.download_dir.clone(),
            transcript_dir: self.transcript_dir.clone(),
            max_height: self.max_height,
            languages: self.languages.clone(),
        }
    }

    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = ResolvedConfig::load(&self.overrides())?;

        match self.command {
            None => run_interactive(&config, self.channel).await,
            Some(Commands::Videos { reference }) => list_videos(&config, &reference).await,
            Some(Commands::Download { video_ids }) => download_videos(&config, video_ids).await,
            Some(Commands::Transcript { video_id }) => save_transcript(&config, &video_id).await,
            Some(Commands::Info { video_id }) => show_info(&config, &video_id).await,
            Some(Commands::Search { query, limit }) => search(&config, &query, limit).await,
            Some(Commands::Config) => show_config(&config),
        }
    }
}

// ============================================================================
// Wiring
// ============================================================================

fn metadata_provider(config: &ResolvedConfig) -> Result<Arc<dyn MetadataProvider>> {
    let client = YouTubeApiClient::new(config.require_api_key()?)
        .context("Failed to create YouTube API client")?;
    Ok(Arc::new(client))
}

fn ytdlp(config: &ResolvedConfig) -> YtDlp {
    YtDlp::new(config.ytdlp_binary.clone()).with_probe_timeout(config.probe_timeout)
}

/// Captions share the `YtDlp` handle so they can reuse its last probe
fn transcript_extractor(config: &ResolvedConfig, ytdlp: &YtDlp) -> Result<TranscriptExtractor> {
    let captions = YouTubeCaptions::new(ytdlp.clone()).context("Failed to create caption client")?;
    Ok(TranscriptExtractor::new(Arc::new(captions), config.languages.clone()))
}

/// Build the batch driver and make sure yt-dlp and the output directories exist
async fn batch_driver(config: &ResolvedConfig) -> Result<BatchDriver> {
    let ytdlp = ytdlp(config);
    let downloader = DownloadOrchestrator::new(Arc::new(ytdlp.clone()));
    downloader
        .check_engine()
        .await
        .context("yt-dlp is required for downloads")?;
    config.ensure_dirs().await?;

    Ok(BatchDriver::new(
        downloader,
        transcript_extractor(config, &ytdlp)?,
        BatchSettings {
            download_dir: config.download_dir.clone(),
            transcript_dir: config.transcript_dir.clone(),
            max_quality: config.max_quality,
        },
    ))
}

// ============================================================================
// Commands
// ============================================================================

async fn run_interactive(config: &ResolvedConfig, channel: Option<String>) -> Result<()> {
    let resolver = ChannelResolver::new(metadata_provider(config)?);
    let batch = batch_driver(config).await?;
    let progress = BarProgress::new();

    println!(
        "tubeharvest: videos up to {}, transcripts in {}",
        config.max_quality,
        config.languages.join(", ")
    );
    println!("Media:       {}", config.download_dir.display());
    println!("Transcripts: {}", config.transcript_dir.display());

    let stdin = io::stdin();
    InteractiveLoop::new(&resolver, &batch, &progress, stdin.lock(), io::stdout())
        .with_channel(channel)
        .run()
        .await?;

    Ok(())
}

async fn list_videos(config: &ResolvedConfig, reference: &str) -> Result<()> {
    let resolver = ChannelResolver::new(metadata_provider(config)?);

    let channel_id = resolver.resolve(reference).await?;
    let videos = resolver.list_videos(&channel_id).await?;

    let title = resolver
        .channel_info(&channel_id)
        .await
        .ok()
        .flatten()
        .map(|info| info.title)
        .unwrap_or_else(|| channel_id.to_string());

    println!("Channel: {} ({})", title, channel_id);
    println!();
    write_listing(&mut io::stdout(), &videos)?;
    println!("\nTotal: {} videos", videos.len());

    Ok(())
}

async fn download_videos(config: &ResolvedConfig, video_ids: Vec<String>) -> Result<()> {
    let batch = batch_driver(config).await?;
    let progress = BarProgress::new();

    // Titles come from the engine probe
    let videos: Vec<VideoSummary> = video_ids
        .into_iter()
        .map(|id| VideoSummary::new(id.clone(), id))
        .collect();

    let report = batch.process(&videos, &progress).await;

    println!();
    for video in &report.videos {
        println!("{}: {}", video.title, video.summary());
    }
    print!("{}", report);

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} video(s) failed",
            report.failed_count(),
            report.videos.len()
        );
    }

    Ok(())
}

async fn save_transcript(config: &ResolvedConfig, video_id: &str) -> Result<()> {
    let ytdlp = ytdlp(config);
    let probe = ytdlp
        .probe(video_id)
        .await
        .with_context(|| format!("Failed to look up video {}", video_id))?;
    let extractor = transcript_extractor(config, &ytdlp)?;

    let outcome = extractor
        .extract(
            video_id,
            &probe.title,
            &base_file_name(&probe.title, video_id),
            &config.transcript_dir,
        )
        .await?;

    println!("{}: {}", probe.title, outcome);
    if let TranscriptOutcome::Written { path, .. } = &outcome {
        println!("Saved: {}", path.display());
    }

    Ok(())
}

async fn show_info(config: &ResolvedConfig, video_id: &str) -> Result<()> {
    let provider = metadata_provider(config)?;
    let details = provider
        .video_details(video_id)
        .await?
        .with_context(|| format!("Video not found: {}", video_id))?;

    let count = |n: Option<u64>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());

    println!("Title:     {}", details.title);
    println!("ID:        {}", details.id);
    if let Some(channel) = &details.channel_title {
        println!("Channel:   {}", channel);
    }
    if let Some(published) = details.published_at {
        println!("Published: {}", published.format("%Y-%m-%d %H:%M"));
    }
    if let Some(duration) = details.duration {
        println!("Duration:  {}", format_duration(duration));
    }
    println!("Views:     {}", count(details.view_count));
    println!("Likes:     {}", count(details.like_count));
    println!("Comments:  {}", count(details.comment_count));
    if !details.description.is_empty() {
        println!("\n{}", details.description);
    }

    Ok(())
}

async fn search(config: &ResolvedConfig, query: &str, limit: u32) -> Result<()> {
    let provider = metadata_provider(config)?;
    let videos = provider.search_videos(query, limit).await?;

    if videos.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("{:<14} {:<12} TITLE", "ID", "PUBLISHED");
    println!("{}", "-".repeat(80));
    for video in &videos {
        let published = video
            .published_at
            .map(|p| p.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("{:<14} {:<12} {}", video.id, published, video.title);
    }

    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("tubeharvest configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Base:        {}", config.base_dir.display());
    println!("  Media:       {}", config.download_dir.display());
    println!("  Transcripts: {}", config.transcript_dir.display());
    println!();
    println!("Downloads:");
    println!("  Max quality:   {}", config.max_quality);
    println!("  yt-dlp:        {}", config.ytdlp_binary);
    println!("  Probe timeout: {}s", config.probe_timeout.as_secs());
    println!();
    println!("Transcripts:");
    println!("  Languages: {}", config.languages.join(", "));
    println!();
    println!("YouTube API key: {}", config.masked_api_key());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_is_interactive() {
        let cli = Cli::try_parse_from(["tubeharvest", "--channel", "@someone"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.channel.as_deref(), Some("@someone"));
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "tubeharvest",
            "download",
            "abc",
            "def",
            "--max-height",
            "1080p",
            "--languages",
            "de,en",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.max_height, Some(Quality::from_height(1080)));
        assert_eq!(
            overrides.languages,
            Some(vec!["de".to_string(), "en".to_string()])
        );
        match cli.command {
            Some(Commands::Download { video_ids }) => assert_eq!(video_ids, vec!["abc", "def"]),
            other => panic!("Expected download, got {:?}", other),
        }
    }

    #[test]
    fn test_download_requires_ids() {
        assert!(Cli::try_parse_from(["tubeharvest", "download"]).is_err());
        assert!(Cli::try_parse_from(["tubeharvest", "--max-height", "tall", "config"]).is_err());
    }
}
