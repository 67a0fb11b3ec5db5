//! Channel references and identities.
//!
//! A user may name a channel in several URL shapes. The shape is decided
//! once by [`ChannelRef::parse`]; everything downstream matches on the enum.

use serde::{Deserialize, Serialize};
use url::Url;

/// Canonical channel identifier assigned by YouTube (e.g. `UC...`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The uploads playlist ID, derivable for standard `UC` channel IDs
    pub fn uploads_playlist(&self) -> Option<String> {
        self.0
            .strip_prefix("UC")
            .filter(|rest| !rest.is_empty())
            .map(|rest| format!("UU{}", rest))
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed channel reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// `/channel/<ID>`: the ID is used verbatim
    ChannelIdUrl(ChannelId),

    /// `/c/<name>`: custom URL, needs a lookup
    CustomUrl(String),

    /// `/@<handle>`: handle, stored without the `@`
    HandleUrl(String),

    /// `/user/<name>`: legacy username URL
    UserUrl(String),

    /// Matches none of the accepted shapes
    Invalid(String),
}

impl ChannelRef {
    /// Parse a user-supplied channel reference.
    ///
    /// Accepts full URLs, scheme-less URLs (`youtube.com/@name`) and bare
    /// handles (`@name`). Trailing path segments, queries and fragments are
    /// ignored.
    pub fn parse(reference: &str) -> Self {
        let raw = reference.trim();

        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else if raw.starts_with('@') {
            format!("https://www.youtube.com/{}", raw)
        } else {
            format!("https://{}", raw)
        };

        let url = match Url::parse(&with_scheme) {
            Ok(url) => url,
            Err(_) => return Self::Invalid(raw.to_string()),
        };

        let mut segments = match url.path_segments() {
            Some(segments) => segments.filter(|s| !s.is_empty()),
            None => return Self::Invalid(raw.to_string()),
        };

        match (segments.next(), segments.next()) {
            (Some("channel"), Some(id)) => Self::from_segment("channel", id, raw),
            (Some("c"), Some(name)) => Self::from_segment("c", name, raw),
            (Some("user"), Some(name)) => Self::from_segment("user", name, raw),
            (Some(first), _) if first.starts_with('@') => {
                Self::from_segment("@", &first[1..], raw)
            }
            _ => Self::Invalid(raw.to_string()),
        }
    }

    /// Build a reference from one path segment, percent-decoded
    fn from_segment(kind: &str, segment: &str, raw: &str) -> Self {
        let decoded = match urlencoding::decode(segment) {
            Ok(decoded) => decoded,
            Err(_) => return Self::Invalid(raw.to_string()),
        };
        let value = decoded.trim();
        if value.is_empty() {
            return Self::Invalid(raw.to_string());
        }

        match kind {
            "channel" => Self::ChannelIdUrl(ChannelId::new(value)),
            "c" => Self::CustomUrl(value.to_string()),
            "user" => Self::UserUrl(value.to_string()),
            "@" => Self::HandleUrl(value.to_string()),
            _ => Self::Invalid(raw.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelRef::ChannelIdUrl(id) => write!(f, "channel {}", id),
            ChannelRef::CustomUrl(name) => write!(f, "custom URL /c/{}", name),
            ChannelRef::HandleUrl(handle) => write!(f, "handle @{}", handle),
            ChannelRef::UserUrl(name) => write!(f, "user /user/{}", name),
            ChannelRef::Invalid(raw) => write!(f, "invalid reference '{}'", raw),
        }
    }
}

/// Channel metadata shown after resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub title: String,
    pub description: String,
    pub subscriber_count: Option<u64>,
    pub video_count: Option<u64>,
    pub view_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_url() {
        assert_eq!(
            ChannelRef::parse("https://www.youtube.com/channel/UC123abc"),
            ChannelRef::ChannelIdUrl(ChannelId::new("UC123abc"))
        );
    }

    #[test]
    fn test_channel_id_url_with_trailing_segments() {
        assert_eq!(
            ChannelRef::parse("https://www.youtube.com/channel/UC123abc/videos?view=0"),
            ChannelRef::ChannelIdUrl(ChannelId::new("UC123abc"))
        );
    }

    #[test]
    fn test_custom_url() {
        assert_eq!(
            ChannelRef::parse("https://youtube.com/c/SomeCreator"),
            ChannelRef::CustomUrl("SomeCreator".to_string())
        );
    }

    #[test]
    fn test_handle_url() {
        assert_eq!(
            ChannelRef::parse("https://www.youtube.com/@creator/featured"),
            ChannelRef::HandleUrl("creator".to_string())
        );
    }

    #[test]
    fn test_user_url() {
        assert_eq!(
            ChannelRef::parse("http://www.youtube.com/user/legacyname"),
            ChannelRef::UserUrl("legacyname".to_string())
        );
    }

    #[test]
    fn test_scheme_less_and_bare_handle() {
        assert_eq!(
            ChannelRef::parse("youtube.com/@creator"),
            ChannelRef::HandleUrl("creator".to_string())
        );
        assert_eq!(
            ChannelRef::parse("  @creator  "),
            ChannelRef::HandleUrl("creator".to_string())
        );
    }

    #[test]
    fn test_bare_handle_drops_trailing_path() {
        assert_eq!(
            ChannelRef::parse("@someone/videos"),
            ChannelRef::HandleUrl("someone".to_string())
        );
        assert_eq!(
            ChannelRef::parse("@someone?si=abc"),
            ChannelRef::HandleUrl("someone".to_string())
        );
    }

    #[test]
    fn test_unicode_segments_are_decoded() {
        let expected = ChannelRef::HandleUrl("café".to_string());
        assert_eq!(ChannelRef::parse("https://www.youtube.com/@café"), expected);
        assert_eq!(ChannelRef::parse("https://www.youtube.com/@caf%C3%A9"), expected);
        assert_eq!(ChannelRef::parse("@café"), expected);
        assert_eq!(
            ChannelRef::parse("youtube.com/c/%E3%83%86%E3%82%B9%E3%83%88"),
            ChannelRef::CustomUrl("テスト".to_string())
        );
    }

    #[test]
    fn test_invalid_shapes() {
        for input in [
            "https://example.com/foo",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/channel/",
            "https://www.youtube.com/@",
            "",
            "@",
        ] {
            let parsed = ChannelRef::parse(input);
            assert!(
                matches!(parsed, ChannelRef::Invalid(_)),
                "'{}' should be invalid, got {:?}",
                input,
                parsed
            );
        }
    }

    #[test]
    fn test_uploads_playlist() {
        assert_eq!(
            ChannelId::new("UCabc").uploads_playlist(),
            Some("UUabc".to_string())
        );
        assert_eq!(ChannelId::new("HCabc").uploads_playlist(), None);
        assert_eq!(ChannelId::new("UC").uploads_playlist(), None);
    }
}
