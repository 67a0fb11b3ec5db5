//! Terminal progress bar for downloads.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use crate::adapters::ProgressSink;
use crate::domain::DownloadProgress;

/// Bar resolution (tenths of a percent)
const BAR_LENGTH: u64 = 1000;

/// Progress sink drawing an `indicatif` bar per download
#[derive(Default)]
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_bar() -> ProgressBar {
        let pb = ProgressBar::new(BAR_LENGTH);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }
}

fn describe(progress: &DownloadProgress) -> String {
    let mut parts = Vec::new();
    if let Some(total) = &progress.total {
        parts.push(total.clone());
    }
    if let Some(speed) = &progress.speed {
        parts.push(speed.clone());
    }
    if let Some(eta) = &progress.eta {
        parts.push(format!("ETA {}", eta));
    }
    parts.join("  ")
}

impl ProgressSink for BarProgress {
    fn start(&self, label: &str) {
        let pb = Self::create_bar();
        pb.println(format!("Downloading: {}", label));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn update(&self, progress: &DownloadProgress) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                let position = (progress.percent.clamp(0.0, 100.0) * 10.0).round() as u64;
                pb.set_position(position);
                pb.set_message(describe(progress));
            }
        }
    }

    fn finish(&self, message: &str) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_with_message(message.to_string());
            }
        }
    }
}
