//! YouTube Data API v3 client.
//!
//! Implements [`MetadataProvider`] over plain HTTPS + JSON. Listing uses the
//! channel's uploads playlist (`playlistItems`), which is cheaper in quota
//! than `search` and is not capped at ~500 results.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{MetadataProvider, VideoPage};
use crate::domain::{ChannelId, ChannelInfo, ProviderError, VideoDetails, VideoSummary};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum page size the API accepts
pub const PAGE_SIZE: u32 = 50;

/// Error reasons that mean the quota is gone for now
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

/// YouTube Data API client
pub struct YouTubeApiClient {
    /// API key (never logged)
    api_key: String,
    /// API root, overridable for testing against a local server
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl YouTubeApiClient {
    /// Create a new client for the public API
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom API root
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        })
    }

    /// Build an endpoint URL with query parameters and the API key
    fn endpoint_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint
        ))
        .map_err(|e| ProviderError::Transport(format!("Invalid API URL: {}", e)))?;

        url.query_pairs_mut()
            .extend_pairs(params.iter().copied())
            .append_pair("key", &self.api_key);

        Ok(url)
    }

    /// GET an endpoint and decode its JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = self.endpoint_url(endpoint, params)?;
        debug!(endpoint, ?params, "YouTube API request");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status.as_u16(), &body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Decode(format!("{} response: {}", endpoint, e)))
    }

    /// First channel ID from a `channels.list` call
    async fn first_channel(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Option<ChannelId>, ProviderError> {
        let response: ListResponse<ChannelItem> = self.get_json("channels", params).await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .map(|item| ChannelId::new(item.id)))
    }

    /// Look up the uploads playlist for channels whose ID is not `UC`-prefixed
    async fn uploads_playlist_lookup(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<String>, ProviderError> {
        let response: ListResponse<ChannelItem> = self
            .get_json(
                "channels",
                &[("part", "contentDetails"), ("id", channel_id.as_str())],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.content_details)
            .and_then(|details| details.related_playlists.uploads))
    }

    /// Durations for a batch of up to 50 video IDs
    async fn durations(
        &self,
        video_ids: &[&str],
    ) -> Result<HashMap<String, Duration>, ProviderError> {
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = video_ids.join(",");
        let max = PAGE_SIZE.to_string();
        let response: ListResponse<VideoItem> = self
            .get_json(
                "videos",
                &[("part", "contentDetails"), ("id", &ids), ("maxResults", &max)],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let duration = item
                    .content_details
                    .and_then(|d| d.duration)
                    .and_then(|d| parse_iso8601_duration(&d))?;
                Some((item.id, duration))
            })
            .collect())
    }
}

#[async_trait]
impl MetadataProvider for YouTubeApiClient {
    async fn channel_by_handle(&self, handle: &str) -> Result<Option<ChannelId>, ProviderError> {
        let handle = format!("@{}", handle.trim_start_matches('@'));
        self.first_channel(&[("part", "id"), ("forHandle", &handle)])
            .await
    }

    async fn channel_by_username(&self, name: &str) -> Result<Option<ChannelId>, ProviderError> {
        self.first_channel(&[("part", "id"), ("forUsername", name)])
            .await
    }

    async fn search_channel(&self, query: &str) -> Result<Option<ChannelId>, ProviderError> {
        let response: ListResponse<SearchItem> = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("maxResults", "1"),
                    ("q", query),
                ],
            )
            .await?;

        Ok(response.items.into_iter().next().and_then(|item| {
            item.id
                .channel_id
                .or(item.snippet.and_then(|s| s.channel_id))
                .map(ChannelId::new)
        }))
    }

    async fn uploads_page(
        &self,
        channel_id: &ChannelId,
        page_token: Option<&str>,
    ) -> Result<VideoPage, ProviderError> {
        let playlist_id = match channel_id.uploads_playlist() {
            Some(id) => id,
            None => match self.uploads_playlist_lookup(channel_id).await? {
                Some(id) => id,
                None => {
                    warn!(%channel_id, "Channel has no uploads playlist");
                    return Ok(VideoPage::default());
                }
            },
        };

        let max = PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", playlist_id.as_str()),
            ("maxResults", max.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let listed = self.get_json("playlistItems", &params).await;
        let response: ListResponse<PlaylistItem> = match listed {
            Ok(response) => response,
            // Channels without any uploads have no uploads playlist
            Err(ProviderError::Status {
                status: 404,
                reason: Some(ref reason),
                ..
            }) if reason == "playlistNotFound" => return Ok(VideoPage::default()),
            Err(e) => return Err(e),
        };

        let ids: Vec<&str> = response
            .items
            .iter()
            .map(|item| item.content_details.video_id.as_str())
            .collect();
        let durations = self.durations(&ids).await?;

        Ok(VideoPage {
            total_results: response.page_info.and_then(|p| p.total_results),
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
            videos: summaries_from_playlist(response.items, &durations),
        })
    }

    async fn channel_info(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ChannelInfo>, ProviderError> {
        let response: ListResponse<ChannelItem> = self
            .get_json(
                "channels",
                &[("part", "snippet,statistics"), ("id", channel_id.as_str())],
            )
            .await?;

        Ok(response.items.into_iter().next().map(channel_info_from_item))
    }

    async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>, ProviderError> {
        let response: ListResponse<VideoItem> = self
            .get_json(
                "videos",
                &[("part", "snippet,contentDetails,statistics"), ("id", video_id)],
            )
            .await?;

        Ok(response.items.into_iter().next().map(video_details_from_item))
    }

    async fn search_videos(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<VideoSummary>, ProviderError> {
        let max = limit.clamp(1, PAGE_SIZE).to_string();
        let response: ListResponse<SearchItem> = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("maxResults", &max),
                    ("q", query),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                let snippet = item.snippet.unwrap_or_default();
                Some(VideoSummary {
                    id,
                    title: unescape_html(&snippet.title),
                    published_at: snippet.published_at,
                    duration: None,
                })
            })
            .collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
struct ListResponse<T> {
    #[serde(default)]
    items: Vec<T>,
    next_page_token: Option<String>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    snippet: Option<ChannelSnippet>,
    statistics: Option<Statistics>,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

/// Counts come back as decimal strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
    video_count: Option<String>,
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    id: SearchId,
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    #[serde(default)]
    title: String,
    channel_id: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    snippet: PlaylistSnippet,
    content_details: PlaylistContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    #[serde(default)]
    title: String,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    video_id: String,
    video_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Option<VideoSnippet>,
    content_details: Option<VideoContentDetails>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    channel_title: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

// ============================================================================
// Conversions
// ============================================================================

fn parse_count(value: &Option<String>) -> Option<u64> {
    value.as_deref().and_then(|v| v.parse().ok())
}

fn summaries_from_playlist(
    items: Vec<PlaylistItem>,
    durations: &HashMap<String, Duration>,
) -> Vec<VideoSummary> {
    items
        .into_iter()
        .map(|item| {
            let id = item.content_details.video_id;
            VideoSummary {
                duration: durations.get(&id).copied(),
                published_at: item
                    .content_details
                    .video_published_at
                    .or(item.snippet.published_at),
                title: item.snippet.title,
                id,
            }
        })
        .collect()
}

fn channel_info_from_item(item: ChannelItem) -> ChannelInfo {
    let snippet = item.snippet.unwrap_or_default();
    let stats = item.statistics.unwrap_or_default();
    ChannelInfo {
        id: ChannelId::new(item.id),
        title: snippet.title,
        description: snippet.description,
        subscriber_count: parse_count(&stats.subscriber_count),
        video_count: parse_count(&stats.video_count),
        view_count: parse_count(&stats.view_count),
    }
}

fn video_details_from_item(item: VideoItem) -> VideoDetails {
    let snippet = item.snippet.unwrap_or_default();
    let stats = item.statistics.unwrap_or_default();
    VideoDetails {
        id: item.id,
        title: snippet.title,
        description: snippet.description,
        channel_title: snippet.channel_title,
        published_at: snippet.published_at,
        duration: item
            .content_details
            .and_then(|d| d.duration)
            .and_then(|d| parse_iso8601_duration(&d)),
        view_count: parse_count(&stats.view_count),
        like_count: parse_count(&stats.like_count),
        comment_count: parse_count(&stats.comment_count),
    }
}

/// Map a non-success API response to a provider error
fn map_api_error(status: u16, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let reason = parsed
        .as_ref()
        .and_then(|e| e.error.errors.first())
        .map(|d| d.reason.clone())
        .filter(|r| !r.is_empty());
    let message = parsed
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().chars().take(200).collect());

    let quota = status == 429
        || reason
            .as_deref()
            .is_some_and(|r| QUOTA_REASONS.contains(&r));

    if quota {
        ProviderError::QuotaExceeded(message)
    } else {
        ProviderError::Status {
            status,
            reason,
            message,
        }
    }
}

/// Parse an ISO-8601 duration as used by the API (`PT1H2M10S`, `P1DT2H`)
pub fn parse_iso8601_duration(value: &str) -> Option<Duration> {
    let rest = value.strip_prefix('P')?;
    let mut total = 0u64;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            'T' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' => number.push(c),
            unit => {
                let n: u64 = number.parse().ok()?;
                number.clear();
                let multiplier = match (unit, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                total = n.checked_mul(multiplier)?.checked_add(total)?;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }

    Some(Duration::from_secs(total))
}

/// `search` snippets come back HTML-escaped
fn unescape_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_includes_params_and_key() {
        let client =
            YouTubeApiClient::with_base_url("KEY", "https://api.test/youtube/v3/").unwrap();
        let url = client
            .endpoint_url("channels", &[("part", "id"), ("forHandle", "@some one")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.test/youtube/v3/channels?part=id&forHandle=%40some+one&key=KEY"
        );
    }

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT1H2M10S"), Some(Duration::from_secs(3730)));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(Duration::from_secs(45)));
        assert_eq!(parse_iso8601_duration("PT10M"), Some(Duration::from_secs(600)));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(Duration::from_secs(86_401)));
        assert_eq!(parse_iso8601_duration("P0D"), Some(Duration::ZERO));
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("1H"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
        assert_eq!(parse_iso8601_duration("P5M"), None);
    }

    #[test]
    fn test_parse_iso8601_duration_overflow() {
        assert_eq!(parse_iso8601_duration("PT18446744073709551615H"), None);
        assert_eq!(parse_iso8601_duration("PT18446744073709551615S1S"), None);
        assert_eq!(parse_iso8601_duration("PT99999999999999999999S"), None);
    }

    #[test]
    fn test_quota_error_mapping() {
        let body = r#"{
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{"domain": "youtube.quota", "reason": "quotaExceeded"}]
            }
        }"#;

        match map_api_error(403, body) {
            ProviderError::QuotaExceeded(message) => assert!(message.contains("quota")),
            other => panic!("Expected QuotaExceeded, got {:?}", other),
        }

        assert!(matches!(map_api_error(429, ""), ProviderError::QuotaExceeded(_)));
    }

    #[test]
    fn test_other_error_mapping() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "errors": [{"reason": "badRequest"}]}}"#;
        match map_api_error(400, body) {
            ProviderError::Status {
                status,
                reason,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(reason.as_deref(), Some("badRequest"));
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("Expected Status, got {:?}", other),
        }

        match map_api_error(502, "Bad Gateway") {
            ProviderError::Status { message, reason, .. } => {
                assert_eq!(message, "Bad Gateway");
                assert!(reason.is_none());
            }
            other => panic!("Expected Status, got {:?}", other),
        }
    }

    #[test]
    fn test_playlist_page_conversion() {
        let body = r#"{
            "nextPageToken": "CDIQAA",
            "pageInfo": {"totalResults": 120, "resultsPerPage": 50},
            "items": [
                {
                    "snippet": {"title": "Newest", "publishedAt": "2024-02-01T10:00:00Z"},
                    "contentDetails": {"videoId": "vid2", "videoPublishedAt": "2024-02-01T09:00:00Z"}
                },
                {
                    "snippet": {"title": "Older", "publishedAt": "2024-01-01T10:00:00Z"},
                    "contentDetails": {"videoId": "vid1"}
                }
            ]
        }"#;

        let response: ListResponse<PlaylistItem> = serde_json::from_str(body).unwrap();
        assert_eq!(response.next_page_token.as_deref(), Some("CDIQAA"));
        assert_eq!(response.page_info.as_ref().and_then(|p| p.total_results), Some(120));

        let mut durations = HashMap::new();
        durations.insert("vid2".to_string(), Duration::from_secs(61));

        let videos = summaries_from_playlist(response.items, &durations);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id, "vid2");
        assert_eq!(videos[0].title, "Newest");
        assert_eq!(videos[0].duration, Some(Duration::from_secs(61)));
        assert_eq!(
            videos[0].published_at.unwrap().to_rfc3339(),
            "2024-02-01T09:00:00+00:00"
        );
        assert_eq!(videos[1].id, "vid1");
        assert_eq!(videos[1].duration, None);
        assert_eq!(
            videos[1].published_at.unwrap().to_rfc3339(),
            "2024-01-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_video_details_conversion() {
        let body = r#"{
            "items": [{
                "id": "test_video_id",
                "snippet": {
                    "title": "Test Video",
                    "description": "Test Description",
                    "channelTitle": "Test Channel",
                    "publishedAt": "2024-01-01T00:00:00Z"
                },
                "contentDetails": {"duration": "PT1H2M10S"},
                "statistics": {"viewCount": "1000", "likeCount": "100", "commentCount": "50"}
            }]
        }"#;

        let response: ListResponse<VideoItem> = serde_json::from_str(body).unwrap();
        let details = video_details_from_item(response.items.into_iter().next().unwrap());

        assert_eq!(details.title, "Test Video");
        assert_eq!(details.description, "Test Description");
        assert_eq!(details.channel_title.as_deref(), Some("Test Channel"));
        assert_eq!(details.duration, Some(Duration::from_secs(3730)));
        assert_eq!(details.view_count, Some(1000));
        assert_eq!(details.like_count, Some(100));
        assert_eq!(details.comment_count, Some(50));
    }

    #[test]
    fn test_channel_info_conversion() {
        let body = r#"{
            "items": [{
                "id": "UCtest",
                "snippet": {"title": "Test Channel", "description": "About"},
                "statistics": {"subscriberCount": "1000", "videoCount": "50", "viewCount": "5000"}
            }]
        }"#;

        let response: ListResponse<ChannelItem> = serde_json::from_str(body).unwrap();
        let info = channel_info_from_item(response.items.into_iter().next().unwrap());

        assert_eq!(info.id.as_str(), "UCtest");
        assert_eq!(info.title, "Test Channel");
        assert_eq!(info.subscriber_count, Some(1000));
        assert_eq!(info.video_count, Some(50));
        assert_eq!(info.view_count, Some(5000));
    }

    #[test]
    fn test_empty_list_response() {
        let response: ListResponse<ChannelItem> =
            serde_json::from_str(r#"{"pageInfo": {"totalResults": 0}}"#).unwrap();
        assert!(response.items.is_empty());
        assert!(response.next_page_token.is_none());
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("Rock &amp; Roll &#39;live&#39;"), "Rock & Roll 'live'");
    }
}
