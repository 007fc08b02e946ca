//! Track identifiers and Deezer URL recognition

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{ProviderError, Result};

const TRACK_PATTERN: &str = r"(^https:)//(www\.)?deezer.com/([a-zA-Z]+/)?track/[0-9]+";
const COLLECTION_PATTERN: &str =
    r"(^https:)//(www\.)?deezer.com/[a-zA-Z]+/(playlist|album)/[0-9]+(\?)?(.*)";
const SHARE_PATTERN: &str = r"(^https:)//deezer\.page\.link/[A-Za-z0-9]+";
const TRACK_ID_PATTERN: &str = r"^https://(?:www\.)?deezer\.com/(?:[a-zA-Z]+/)?track/([0-9]+)";

struct UrlPatterns {
    track: Regex,
    collection: Regex,
    share: Regex,
    track_id: Regex,
}

fn patterns() -> &'static UrlPatterns {
    static PATTERNS: OnceLock<UrlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| UrlPatterns {
        track: Regex::new(TRACK_PATTERN).expect("track pattern is valid"),
        collection: Regex::new(COLLECTION_PATTERN).expect("collection pattern is valid"),
        share: Regex::new(SHARE_PATTERN).expect("share pattern is valid"),
        track_id: Regex::new(TRACK_ID_PATTERN).expect("track id pattern is valid"),
    })
}

/// True if `query` looks like a Deezer track, album, playlist or share link.
pub fn validate_url(query: &str) -> bool {
    let patterns = patterns();
    patterns.share.is_match(query)
        || patterns.collection.is_match(query)
        || patterns.track.is_match(query)
}

/// True for `deezer.page.link` short links.
pub fn is_share_link(query: &str) -> bool {
    patterns().share.is_match(query)
}

/// Numeric Deezer track identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Accepts a bare numeric id or a track URL.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self(input.to_string()));
        }
        Self::from_url(input)
    }

    /// Extracts the id from `https://www.deezer.com[/<lang>]/track/<digits>`.
    pub fn from_url(url: &str) -> Result<Self> {
        patterns()
            .track_id
            .captures(url.trim())
            .and_then(|captures| captures.get(1))
            .map(|id| Self(id.as_str().to_string()))
            .ok_or_else(|| ProviderError::InvalidTrackId(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical web URL for this track.
    pub fn url(&self) -> String {
        format!("https://www.deezer.com/track/{}", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TrackId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_id() {
        assert_eq!(TrackId::parse("3135556").unwrap().as_str(), "3135556");
        assert_eq!(TrackId::parse(" 42 ").unwrap().as_str(), "42");
    }

    #[test]
    fn test_parse_track_urls() {
        let plain = TrackId::parse("https://www.deezer.com/track/3135556").unwrap();
        assert_eq!(plain.as_str(), "3135556");

        let localized = TrackId::parse("https://www.deezer.com/en/track/916424?utm=share").unwrap();
        assert_eq!(localized.as_str(), "916424");

        let bare_host = TrackId::parse("https://deezer.com/fr/track/7").unwrap();
        assert_eq!(bare_host.as_str(), "7");
    }

    #[test]
    fn test_parse_rejects_non_track_input() {
        for input in [
            "",
            "   ",
            "abc",
            "12a4",
            "-12",
            "http://www.deezer.com/track/1",
            "https://www.deezer.com/en/album/302127",
            "https://deezer.page.link/abc123",
        ] {
            assert!(
                matches!(TrackId::parse(input), Err(ProviderError::InvalidTrackId(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_track_url() {
        assert!(validate_url("https://www.deezer.com/track/3135556"));
        assert!(validate_url("https://www.deezer.com/en/track/3135556"));
        assert!(validate_url("https://deezer.com/track/3135556"));
    }

    #[test]
    fn test_validate_collection_url_alone_suffices() {
        let query = "https://www.deezer.com/en/playlist/908622995?utm_source=share";
        assert!(!patterns().track.is_match(query));
        assert!(!patterns().share.is_match(query));
        assert!(validate_url(query));

        assert!(validate_url("https://www.deezer.com/fr/album/302127"));
    }

    #[test]
    fn test_validate_share_link_alone_suffices() {
        let query = "https://deezer.page.link/Ab12Cd34";
        assert!(!patterns().track.is_match(query));
        assert!(!patterns().collection.is_match(query));
        assert!(validate_url(query));
        assert!(is_share_link(query));
    }

    #[test]
    fn test_validate_rejects_other_urls() {
        assert!(!validate_url("http://www.deezer.com/track/3135556"));
        assert!(!validate_url("https://www.example.com/track/3135556"));
        assert!(!validate_url("https://www.deezer.com/en/artist/27"));
        assert!(!validate_url("3135556"));
    }

    #[test]
    fn test_track_url_round_trip() {
        let id = TrackId::parse("3135556").unwrap();
        assert_eq!(id.url(), "https://www.deezer.com/track/3135556");
        assert_eq!(TrackId::from_url(&id.url()).unwrap(), id);
        assert_eq!(id.to_string(), "3135556");
    }
}
