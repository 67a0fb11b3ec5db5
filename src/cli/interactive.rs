//! Interactive channel browsing session.
//!
//! A small state machine:
//! `AwaitingChannel -> ChannelResolved -> AwaitingSelection -> Processing`,
//! looping back to `AwaitingSelection` after each batch. Input and output
//! are generic so the loop can be driven from tests.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::warn;

use crate::adapters::ProgressSink;
use crate::core::{BatchDriver, BatchReport, ChannelResolver, Selection, Session};
use crate::domain::{format_duration, ChannelInfo, VideoSummary};

/// Where the session currently is
#[derive(Debug)]
pub enum LoopState {
    AwaitingChannel,
    ChannelResolved(Session, Option<ChannelInfo>),
    AwaitingSelection(Session),
    Processing(Session, Vec<VideoSummary>),
    Exit,
}

/// Drives the prompt/response loop
pub struct InteractiveLoop<'a, R, W> {
    resolver: &'a ChannelResolver,
    batch: &'a BatchDriver,
    progress: &'a dyn ProgressSink,
    input: R,
    output: W,
    /// Channel given up front, used instead of the first prompt
    pending_channel: Option<String>,
    reports: Vec<BatchReport>,
}

impl<'a, R: BufRead, W: Write> InteractiveLoop<'a, R, W> {
    pub fn new(
        resolver: &'a ChannelResolver,
        batch: &'a BatchDriver,
        progress: &'a dyn ProgressSink,
        input: R,
        output: W,
    ) -> Self {
        Self {
            resolver,
            batch,
            progress,
            input,
            output,
            pending_channel: None,
            reports: Vec::new(),
        }
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.pending_channel = channel;
        self
    }

    /// Run until the user quits or input ends; returns every batch report
    pub async fn run(mut self) -> Result<Vec<BatchReport>> {
        let mut state = LoopState::AwaitingChannel;
        loop {
            state = match state {
                LoopState::Exit => break,
                LoopState::AwaitingChannel => self.await_channel().await?,
                LoopState::ChannelResolved(session, info) => self.show_channel(session, info)?,
                LoopState::AwaitingSelection(session) => self.await_selection(session)?,
                LoopState::Processing(session, videos) => self.process(session, videos).await?,
            };
        }

        writeln!(self.output, "Goodbye!")?;
        Ok(self.reports)
    }

    /// Prompt and read one trimmed line; `None` at end of input
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read input")?;
        if read == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn await_channel(&mut self) -> Result<LoopState> {
        let reference = match self.pending_channel.take() {
            Some(reference) => reference,
            None => match self.prompt("\nEnter a YouTube channel URL (or 'q' to quit): ")? {
                None => return Ok(LoopState::Exit),
                Some(line) if line.eq_ignore_ascii_case("q") => return Ok(LoopState::Exit),
                Some(line) if line.is_empty() => return Ok(LoopState::AwaitingChannel),
                Some(line) => line,
            },
        };

        let channel_id = match self.resolver.resolve(&reference).await {
            Ok(id) => id,
            Err(e) => {
                writeln!(self.output, "Error: {}", e)?;
                return Ok(LoopState::AwaitingChannel);
            }
        };

        let videos = match self.resolver.list_videos(&channel_id).await {
            Ok(videos) => videos,
            Err(e) => {
                writeln!(self.output, "Error listing videos: {}", e)?;
                return Ok(LoopState::AwaitingChannel);
            }
        };

        if videos.is_empty() {
            writeln!(self.output, "No videos found for this channel.")?;
            return Ok(LoopState::AwaitingChannel);
        }

        let info = match self.resolver.channel_info(&channel_id).await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Could not fetch channel info");
                None
            }
        };

        let mut session = Session::new(channel_id, videos);
        if let Some(ref info) = info {
            session = session.with_title(info.title.clone());
        }

        Ok(LoopState::ChannelResolved(session, info))
    }

    fn show_channel(&mut self, session: Session, info: Option<ChannelInfo>) -> Result<LoopState> {
        writeln!(self.output)?;
        writeln!(self.output, "Channel: {}", session.display_name())?;
        if let Some(info) = info {
            let count =
                |n: Option<u64>| n.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
            writeln!(
                self.output,
                "Subscribers: {}  Videos: {}  Views: {}",
                count(info.subscriber_count),
                count(info.video_count),
                count(info.view_count)
            )?;
        }
        writeln!(self.output)?;
        write_listing(&mut self.output, &session.videos)?;

        Ok(LoopState::AwaitingSelection(session))
    }

    fn await_selection(&mut self, session: Session) -> Result<LoopState> {
        let line = self.prompt(
            "\nSelect a video number, 'all' for all videos, 'b' to choose another channel, or 'q' to quit: ",
        )?;
        let Some(line) = line else {
            return Ok(LoopState::Exit);
        };

        match Selection::parse(&line, session.videos.len()) {
            Ok(Selection::Quit) => Ok(LoopState::Exit),
            Ok(Selection::Back) => Ok(LoopState::AwaitingChannel),
            Ok(selection) => {
                let videos = session.selected(&selection).to_vec();
                Ok(LoopState::Processing(session, videos))
            }
            Err(e) => {
                writeln!(self.output, "{}", e)?;
                Ok(LoopState::AwaitingSelection(session))
            }
        }
    }

    async fn process(&mut self, session: Session, videos: Vec<VideoSummary>) -> Result<LoopState> {
        let report = self.batch.process(&videos, self.progress).await;

        writeln!(self.output)?;
        for video in &report.videos {
            writeln!(self.output, "{}: {}", video.title, video.summary())?;
        }
        write!(self.output, "{}", report)?;

        self.reports.push(report);
        Ok(LoopState::AwaitingSelection(session))
    }
}

/// Print a numbered (1-based) listing
pub fn write_listing(output: &mut impl Write, videos: &[VideoSummary]) -> Result<()> {
    for (i, video) in videos.iter().enumerate() {
        let mut line = format!("{:>4}. {}", i + 1, video.title);
        if let Some(duration) = video.duration {
            line.push_str(&format!(" [{}]", format_duration(duration)));
        }
        if let Some(published) = video.published_at {
            line.push_str(&format!(" ({})", published.format("%Y-%m-%d")));
        }
        writeln!(output, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_write_listing() {
        let mut first = VideoSummary::new("a", "First");
        first.duration = Some(Duration::from_secs(605));
        let videos = vec![first, VideoSummary::new("b", "Second")];

        let mut out = Vec::new();
        write_listing(&mut out, &videos).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "   1. First [10:05]\n   2. Second\n"
        );
    }
}
