//! Caption cues and transcript rendering.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A caption cue as returned by the caption provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: Duration,
    pub duration: Option<Duration>,
    pub text: String,
}

impl Cue {
    pub fn new(start: Duration, text: impl Into<String>) -> Self {
        Self {
            start,
            duration: None,
            text: text.into(),
        }
    }
}

/// One rendered transcript line
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptLine {
    pub start: Duration,
    pub text: String,
}

impl std::fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", format_timestamp(self.start), self.text)
    }
}

/// Format an offset as `MM:SS`, flooring to the second.
///
/// Minutes are not wrapped into hours: 3661s renders as `61:01`.
pub fn format_timestamp(offset: Duration) -> String {
    let secs = offset.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Turn provider cues into ordered transcript lines.
///
/// Whitespace inside a cue collapses to single spaces, empty cues are
/// dropped, and lines are stably sorted by start offset.
pub fn lines_from_cues(cues: &[Cue]) -> Vec<TranscriptLine> {
    let mut lines: Vec<TranscriptLine> = cues
        .iter()
        .filter_map(|cue| {
            let text = cue.text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                None
            } else {
                Some(TranscriptLine {
                    start: cue.start,
                    text,
                })
            }
        })
        .collect();

    lines.sort_by_key(|line| line.start);
    lines
}

/// Render the transcript body (one `[MM:SS] text` line per cue)
pub fn render_lines(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the full transcript file with its header
pub fn render_document(title: &str, url: &str, lines: &[TranscriptLine]) -> String {
    format!("Title: {}\nURL: {}\n\n\n{}\n", title, url, render_lines(lines))
}

/// Non-error outcomes of transcript extraction
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptOutcome {
    /// Transcript written to disk
    Written {
        path: PathBuf,
        language: String,
        lines: usize,
    },

    /// No captions in any preferred language
    Absent,

    /// The video has captions turned off entirely
    Disabled,
}

impl TranscriptOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptOutcome::Written { .. } => "written",
            TranscriptOutcome::Absent => "transcript_absent",
            TranscriptOutcome::Disabled => "transcript_disabled",
        }
    }
}

impl std::fmt::Display for TranscriptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptOutcome::Written {
                path,
                language,
                lines,
            } => write!(
                f,
                "transcript saved to {} ({} lines, language {})",
                path.display(),
                lines,
                language
            ),
            TranscriptOutcome::Absent => write!(f, "no transcript in the preferred languages"),
            TranscriptOutcome::Disabled => write!(f, "transcripts are disabled for this video"),
        }
    }
}
