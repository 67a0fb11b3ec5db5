//! Transcript Extractor Integration Tests
//!
//! Outcome distinctions and the on-disk file layout.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{file_names, sample_cues, FakeCaptions};
use tempfile::TempDir;
use tubeharvest::adapters::CaptionLookup;
use tubeharvest::core::TranscriptExtractor;
use tubeharvest::domain::{Cue, ProviderError, TranscriptError, TranscriptOutcome};

fn extractor(captions: FakeCaptions) -> TranscriptExtractor {
    TranscriptExtractor::new(Arc::new(captions), vec!["en".to_string()])
}

#[tokio::test]
async fn test_written_transcript_layout() {
    let temp = TempDir::new().unwrap();
    let extractor = extractor(FakeCaptions::default().with_cues("abc", sample_cues()));

    let outcome = tokio_test::assert_ok!(
        extractor
            .extract("abc", "My Video", "My Video", temp.path())
            .await
    );

    let path = temp.path().join("My Video.txt");
    assert_eq!(
        outcome,
        TranscriptOutcome::Written {
            path: path.clone(),
            language: "en".to_string(),
            lines: 2,
        }
    );

    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        content,
        "Title: My Video\n\
         URL: https://www.youtube.com/watch?v=abc\n\
         \n\
         \n\
         [00:00] hello there\n\
         [01:05] and then\n"
    );
}

#[tokio::test]
async fn test_disabled_and_absent_are_distinct() {
    let temp = TempDir::new().unwrap();
    let extractor = extractor(
        FakeCaptions::default()
            .with_lookup("off", CaptionLookup::Disabled)
            .with_lookup("other", CaptionLookup::NotInLanguages),
    );

    let disabled = extractor
        .extract("off", "Off", "Off", temp.path())
        .await
        .unwrap();
    let absent = extractor
        .extract("other", "Other", "Other", temp.path())
        .await
        .unwrap();

    assert_eq!(disabled, TranscriptOutcome::Disabled);
    assert_eq!(absent, TranscriptOutcome::Absent);
    assert_ne!(disabled.kind(), absent.kind());

    // Neither writes a file
    assert!(file_names(temp.path()).is_empty());
}

#[tokio::test]
async fn test_empty_track_is_absent() {
    let temp = TempDir::new().unwrap();
    let cues = vec![Cue::new(Duration::from_secs(1), "\n"), Cue::new(Duration::from_secs(2), " ")];
    let extractor = extractor(FakeCaptions::default().with_cues("blank", cues));

    let outcome = extractor
        .extract("blank", "Blank", "Blank", temp.path())
        .await
        .unwrap();

    assert_eq!(outcome, TranscriptOutcome::Absent);
    assert!(file_names(temp.path()).is_empty());
}

#[tokio::test]
async fn test_provider_failure_is_an_error() {
    let temp = TempDir::new().unwrap();
    let extractor = extractor(
        FakeCaptions::default().failing("abc", ProviderError::Transport("reset".to_string())),
    );

    let err = extractor
        .extract("abc", "T", "T", temp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, TranscriptError::Provider(_)));
    assert_eq!(err.kind(), "provider_error");
}

#[tokio::test]
async fn test_unwritable_directory_is_disk_error() {
    let temp = TempDir::new().unwrap();
    // A file where the directory should be
    let blocker = temp.path().join("transcripts");
    std::fs::write(&blocker, b"not a dir").unwrap();

    let extractor = extractor(FakeCaptions::default().with_cues("abc", sample_cues()));
    let err = extractor
        .extract("abc", "T", "T", &blocker)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "disk_error");
}

#[test]
fn test_empty_language_list_uses_default() {
    let extractor = TranscriptExtractor::new(Arc::new(FakeCaptions::default()), Vec::new());
    assert_eq!(extractor.languages(), ["en".to_string()]);
}
