//! Transcript extraction: captions in preferred-language order to `.txt`.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::adapters::{CaptionLookup, CaptionProvider};
use crate::domain::{
    lines_from_cues, render_document, watch_url, TranscriptError, TranscriptOutcome,
};

/// Default caption language preference
pub fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

/// Fetches captions and writes transcript files
pub struct TranscriptExtractor {
    captions: Arc<dyn CaptionProvider>,
    languages: Vec<String>,
}

impl TranscriptExtractor {
    pub fn new(captions: Arc<dyn CaptionProvider>, languages: Vec<String>) -> Self {
        let languages = if languages.is_empty() {
            default_languages()
        } else {
            languages
        };
        Self { captions, languages }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Extract the transcript of one video.
    ///
    /// The file lands at `<output_dir>/<base_name>.txt` and is only written
    /// when captions were found and non-empty.
    #[instrument(skip(self, title, output_dir))]
    pub async fn extract(
        &self,
        video_id: &str,
        title: &str,
        base_name: &str,
        output_dir: &Path,
    ) -> Result<TranscriptOutcome, TranscriptError> {
        let (language, cues) = match self.captions.fetch_cues(video_id, &self.languages).await? {
            CaptionLookup::Found { language, cues } => (language, cues),
            CaptionLookup::NotInLanguages => {
                info!(languages = ?self.languages, "No captions in the preferred languages");
                return Ok(TranscriptOutcome::Absent);
            }
            CaptionLookup::Disabled => {
                info!("Captions are disabled");
                return Ok(TranscriptOutcome::Disabled);
            }
        };

        let lines = lines_from_cues(&cues);
        if lines.is_empty() {
            info!(%language, "Caption track is empty");
            return Ok(TranscriptOutcome::Absent);
        }

        let disk_error = |path: &Path, source| TranscriptError::Disk {
            path: path.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| disk_error(output_dir, e))?;

        let path = output_dir.join(format!("{}.txt", base_name));
        let document = render_document(title, &watch_url(video_id), &lines);
        tokio::fs::write(&path, document)
            .await
            .map_err(|e| disk_error(&path, e))?;

        info!(path = %path.display(), lines = lines.len(), %language, "Transcript saved");

        Ok(TranscriptOutcome::Written {
            path,
            language,
            lines: lines.len(),
        })
    }
}
