//! Deezer gateway and media API wire types
//!
//! Field names follow the service's JSON exactly, which mixes
//! `SCREAMING_CASE` and `snake_case`.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Media service used when `getUserData` omits `URL_MEDIA`.
pub const DEFAULT_MEDIA_BASE_URL: &str = "https://media.deezer.com";

/// Cipher requested for every format.
pub const STRIPE_CIPHER: &str = "BF_CBC_STRIPE";

// ============================================================================
// deezer.getUserData
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UserDataResponse {
    #[serde(default)]
    pub error: serde_json::Value,
    pub results: Option<UserDataResults>,
}

#[derive(Debug, Deserialize)]
pub struct UserDataResults {
    #[serde(rename = "USER")]
    pub user: Option<UserData>,

    #[serde(rename = "checkForm")]
    pub check_form: Option<String>,

    #[serde(rename = "URL_MEDIA")]
    pub url_media: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    #[serde(rename = "OPTIONS")]
    pub options: Option<UserOptions>,
}

#[derive(Debug, Deserialize)]
pub struct UserOptions {
    pub license_token: Option<String>,
}

// ============================================================================
// song.getListData
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TrackListRequest<'a> {
    pub sng_ids: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
pub struct TrackListResponse {
    /// `[]` or `{}` on success, populated otherwise.
    #[serde(default)]
    pub error: serde_json::Value,
    pub results: Option<TrackListResults>,
}

#[derive(Debug, Deserialize)]
pub struct TrackListResults {
    #[serde(default)]
    pub data: Vec<TrackData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackData {
    #[serde(rename = "SNG_ID", default, deserialize_with = "string_or_number")]
    pub sng_id: Option<String>,

    #[serde(rename = "SNG_TITLE")]
    pub title: Option<String>,

    #[serde(rename = "VERSION")]
    pub version: Option<String>,

    #[serde(rename = "ART_NAME")]
    pub artist: Option<String>,

    #[serde(rename = "ALB_TITLE")]
    pub album: Option<String>,

    #[serde(rename = "DURATION", default, deserialize_with = "string_or_number")]
    pub duration: Option<String>,

    #[serde(rename = "TRACK_TOKEN")]
    pub track_token: Option<String>,
}

/// Track details needed by callers and by the media URL request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    /// Opaque token exchanged for a media URL. Short-lived.
    #[serde(skip_serializing, default)]
    pub track_token: String,
}

impl TrackInfo {
    pub(crate) fn from_wire(track_id: &str, data: TrackData, track_token: String) -> Self {
        let title = match (data.title, data.version) {
            (Some(title), Some(version)) if !version.trim().is_empty() => {
                format!("{} {}", title, version.trim())
            }
            (Some(title), _) => title,
            (None, _) => String::new(),
        };

        Self {
            id: data.sng_id.unwrap_or_else(|| track_id.to_string()),
            title,
            artist: data.artist,
            album: data.album,
            duration: data
                .duration
                .and_then(|d| d.parse::<u64>().ok())
                .map(Duration::from_secs),
            track_token,
        }
    }
}

// ============================================================================
// media.deezer.com/v1/get_url
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatSpec {
    pub cipher: String,
    pub format: String,
}

#[derive(Debug, Serialize)]
pub struct MediaSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub formats: Vec<FormatSpec>,
}

#[derive(Debug, Serialize)]
pub struct MediaUrlRequest<'a> {
    pub license_token: &'a str,
    pub media: Vec<MediaSpec>,
    pub track_tokens: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
pub struct MediaUrlResponse {
    #[serde(default)]
    pub data: Vec<MediaData>,
}

#[derive(Debug, Deserialize)]
pub struct MediaData {
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub errors: Vec<MediaError>,
}

#[derive(Debug, Deserialize)]
pub struct Media {
    pub format: Option<String>,
    #[serde(default)]
    pub sources: Vec<MediaSource>,
}

#[derive(Debug, Deserialize)]
pub struct MediaSource {
    pub url: String,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaError {
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// True when a gateway `error` field carries something.
pub(crate) fn has_error_payload(error: &serde_json::Value) -> bool {
    match error {
        serde_json::Value::Null => false,
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => false,
    }
}

/// Gateway error keys meaning the session tokens are no longer accepted.
const TOKEN_REJECTION_KEYS: &[&str] = &["VALID_TOKEN_REQUIRED", "NEED_API_AUTH_REQUIRED"];

/// True when a gateway `error` field rejects the csrf or license token.
pub(crate) fn is_token_rejection(error: &serde_json::Value) -> bool {
    match error {
        serde_json::Value::Object(map) => map
            .keys()
            .any(|key| TOKEN_REJECTION_KEYS.contains(&key.as_str())),
        serde_json::Value::Array(items) => items.iter().any(is_token_rejection),
        serde_json::Value::String(s) => TOKEN_REJECTION_KEYS.contains(&s.as_str()),
        _ => false,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_payload_detection() {
        assert!(!has_error_payload(&json!(null)));
        assert!(!has_error_payload(&json!([])));
        assert!(!has_error_payload(&json!({})));
        assert!(has_error_payload(&json!(["DATA_ERROR"])));
        assert!(has_error_payload(&json!({"VALID_TOKEN_REQUIRED": "Invalid CSRF token"})));
        assert!(has_error_payload(&json!("DATA_ERROR")));
    }

    #[test]
    fn test_scalar_error_fields_are_not_errors() {
        assert!(!has_error_payload(&json!(false)));
        assert!(!has_error_payload(&json!(true)));
        assert!(!has_error_payload(&json!(0)));
        assert!(!has_error_payload(&json!("")));
    }

    #[test]
    fn test_token_rejection_detection() {
        assert!(is_token_rejection(&json!({"VALID_TOKEN_REQUIRED": "Invalid CSRF token"})));
        assert!(is_token_rejection(&json!(["NEED_API_AUTH_REQUIRED"])));
        assert!(!is_token_rejection(&json!({"DATA_ERROR": "song not found"})));
        assert!(!is_token_rejection(&json!(["DATA_ERROR"])));
        assert!(!is_token_rejection(&json!([])));
    }

    #[test]
    fn test_track_data_accepts_numeric_fields() {
        let data: TrackData = serde_json::from_value(json!({
            "SNG_ID": 3135556,
            "SNG_TITLE": "Harder, Better, Faster, Stronger",
            "ART_NAME": "Daft Punk",
            "ALB_TITLE": "Discovery",
            "DURATION": "224",
            "TRACK_TOKEN": "token"
        }))
        .unwrap();

        let info = TrackInfo::from_wire("3135556", data, "token".to_string());
        assert_eq!(info.id, "3135556");
        assert_eq!(info.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(info.duration, Some(Duration::from_secs(224)));
    }

    #[test]
    fn test_track_title_includes_version() {
        let data: TrackData = serde_json::from_value(json!({
            "SNG_TITLE": "One More Time",
            "VERSION": " (Radio Edit) ",
            "TRACK_TOKEN": "token"
        }))
        .unwrap();

        let info = TrackInfo::from_wire("3135553", data, "token".to_string());
        assert_eq!(info.id, "3135553");
        assert_eq!(info.title, "One More Time (Radio Edit)");
        assert_eq!(info.duration, None);
    }

    #[test]
    fn test_media_request_shape() {
        let request = MediaUrlRequest {
            license_token: "license",
            media: vec![MediaSpec {
                kind: "FULL",
                formats: vec![FormatSpec {
                    cipher: STRIPE_CIPHER.to_string(),
                    format: "MP3_128".to_string(),
                }],
            }],
            track_tokens: ["token"],
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "license_token": "license",
                "media": [{"type": "FULL", "formats": [{"cipher": "BF_CBC_STRIPE", "format": "MP3_128"}]}],
                "track_tokens": ["token"]
            })
        );
    }
}
