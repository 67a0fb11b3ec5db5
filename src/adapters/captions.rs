//! Caption provider backed by YouTube's caption tracks.
//!
//! Track discovery goes through yt-dlp's info JSON (`subtitles` and
//! `automatic_captions`), reusing the download probe when the same `YtDlp`
//! handle made it; the chosen track is fetched in `json3` format over HTTP.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::ytdlp::{CaptionTrack, YtDlp};
use super::{CaptionLookup, CaptionProvider};
use crate::domain::{Cue, ProviderError};

/// Caption format requested from YouTube
const TRACK_FORMAT: &str = "json3";

/// Pseudo-language yt-dlp lists for live chat replays
const LIVE_CHAT: &str = "live_chat";

type TrackMap = BTreeMap<String, Vec<CaptionTrack>>;

/// A caption track picked for a preferred language
#[derive(Debug, Clone, PartialEq)]
pub struct TrackChoice {
    pub language: String,
    pub url: String,
    pub automatic: bool,
}

/// Outcome of matching the available tracks against the preference list
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSelection {
    Chosen(TrackChoice),
    NotInLanguages,
    Disabled,
}

/// Captions from YouTube via yt-dlp discovery
pub struct YouTubeCaptions {
    ytdlp: YtDlp,
    client: reqwest::Client,
}

impl YouTubeCaptions {
    pub fn new(ytdlp: YtDlp) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { ytdlp, client })
    }

    async fn download_track(&self, url: &str) -> Result<Vec<Cue>, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                reason: None,
                message: "caption track request failed".to_string(),
            });
        }

        let body = response.text().await?;
        parse_json3(&body)
    }
}

#[async_trait]
impl CaptionProvider for YouTubeCaptions {
    async fn fetch_cues(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<CaptionLookup, ProviderError> {
        let info = self.ytdlp.cached_info(video_id).await?;

        match select_track(&info.subtitles, &info.automatic_captions, languages) {
            TrackSelection::Disabled => Ok(CaptionLookup::Disabled),
            TrackSelection::NotInLanguages => Ok(CaptionLookup::NotInLanguages),
            TrackSelection::Chosen(choice) => {
                debug!(
                    video_id,
                    language = %choice.language,
                    automatic = choice.automatic,
                    "Fetching caption track"
                );
                let cues = self.download_track(&choice.url).await?;
                Ok(CaptionLookup::Found {
                    language: choice.language,
                    cues,
                })
            }
        }
    }
}

/// `language` itself or a regional variant of it (`en` matches `en-GB`)
fn language_matches(key: &str, language: &str) -> bool {
    key.eq_ignore_ascii_case(language)
        || key
            .get(..language.len() + 1)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&format!("{}-", language)))
}

/// Machine translations of another track carry a `tlang` query parameter
fn is_translated(track: &CaptionTrack) -> bool {
    Url::parse(&track.url)
        .map(|url| url.query_pairs().any(|(key, _)| key == "tlang"))
        .unwrap_or(false)
}

fn json3_url(tracks: &[CaptionTrack]) -> Option<&str> {
    tracks
        .iter()
        .filter(|t| !is_translated(t))
        .find(|t| t.ext == TRACK_FORMAT)
        .map(|t| t.url.as_str())
}

/// Find a track for one language in one map, exact code before variants
fn find_in(map: &TrackMap, language: &str) -> Option<(String, String)> {
    let exact = map
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(language));
    let variants = map
        .iter()
        .filter(|(key, _)| !key.eq_ignore_ascii_case(language) && language_matches(key, language));

    exact
        .chain(variants)
        .find_map(|(key, tracks)| json3_url(tracks).map(|url| (key.clone(), url.to_string())))
}

/// Pick the caption track to use.
///
/// Languages are tried in preference order; within a language manual
/// captions beat auto-generated ones. Machine-translated tracks are never
/// chosen.
pub fn select_track(
    manual: &TrackMap,
    automatic: &TrackMap,
    languages: &[String],
) -> TrackSelection {
    let has_tracks = |map: &TrackMap| {
        map.iter()
            .any(|(key, tracks)| key != LIVE_CHAT && tracks.iter().any(|t| !is_translated(t)))
    };
    if !has_tracks(manual) && !has_tracks(automatic) {
        return TrackSelection::Disabled;
    }

    for language in languages {
        if let Some((language, url)) = find_in(manual, language) {
            return TrackSelection::Chosen(TrackChoice {
                language,
                url,
                automatic: false,
            });
        }
        if let Some((language, url)) = find_in(automatic, language) {
            return TrackSelection::Chosen(TrackChoice {
                language,
                url,
                automatic: true,
            });
        }
    }

    TrackSelection::NotInLanguages
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    d_duration_ms: Option<u64>,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Parse a `json3` caption document into cues
pub fn parse_json3(body: &str) -> Result<Vec<Cue>, ProviderError> {
    let doc: Json3 = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("caption track: {}", e)))?;

    Ok(doc
        .events
        .into_iter()
        .filter(|event| !event.segs.is_empty())
        .map(|event| Cue {
            start: Duration::from_millis(event.t_start_ms),
            duration: event.d_duration_ms.map(Duration::from_millis),
            text: event.segs.iter().map(|s| s.utf8.as_str()).collect(),
        })
        .collect())
}
