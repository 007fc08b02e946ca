//! Track to media URL resolution
//!
//! Two calls per track: `song.getListData` on the web gateway yields the
//! track token, then `get_url` on the media service trades it for a signed
//! URL of the encrypted file in the best format the account may stream.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::config::{AudioQuality, CoreConfig, DEFAULT_REQUEST_TIMEOUT};
use core_session::SessionCredentials;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{ProviderError, Result};
use crate::gateway::{browser_request, gateway_url};
use crate::types::{
    has_error_payload, is_token_rejection, FormatSpec, MediaSpec, MediaUrlRequest,
    MediaUrlResponse, TrackInfo, TrackListRequest, TrackListResponse, STRIPE_CIPHER,
};
use crate::url::TrackId;

/// Wire name of the format delivered for `quality`.
pub fn format_name(quality: AudioQuality) -> &'static str {
    match quality {
        AudioQuality::Lossless => "FLAC",
        AudioQuality::High => "MP3_320",
        AudioQuality::Standard => "MP3_128",
        AudioQuality::Basic => "MP3_64",
    }
}

/// Formats to request, best first, starting at `cap`.
pub fn format_preferences(cap: AudioQuality) -> Vec<FormatSpec> {
    [
        AudioQuality::Lossless,
        AudioQuality::High,
        AudioQuality::Standard,
        AudioQuality::Basic,
    ]
    .into_iter()
    .filter(|quality| *quality <= cap)
    .map(|quality| FormatSpec {
        cipher: STRIPE_CIPHER.to_string(),
        format: format_name(quality).to_string(),
    })
    .collect()
}

/// Media location and details for one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    /// Signed URL of the encrypted file. Expires shortly.
    pub media_url: String,
    /// Wire name of the format served, e.g. `MP3_320`.
    pub format: String,
    pub info: TrackInfo,
}

pub struct StreamResolver {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    request_timeout: Duration,
    quality: AudioQuality,
}

impl StreamResolver {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            quality: AudioQuality::default(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(Arc::clone(&config.http_client), config.access_token.clone())
            .with_timeout(config.request_timeout)
            .with_quality(config.audio_quality)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_quality(mut self, quality: AudioQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Resolves `track` to its encrypted media URL using one credential snapshot.
    ///
    /// # Errors
    ///
    /// - `SessionFetchFailed` if the gateway rejects the session tokens.
    /// - `TrackInfoUnavailable` if the gateway reports any other error,
    ///   returns no track token, or does not answer in time.
    /// - `MediaUrlUnavailable` if the media service returns no source or does
    ///   not answer in time.
    #[instrument(skip(self, credentials), fields(track_id = %track))]
    pub async fn resolve(
        &self,
        track: &TrackId,
        credentials: &SessionCredentials,
    ) -> Result<ResolvedTrack> {
        let info = self.fetch_track_info(track, credentials).await?;
        let (media_url, format) = self.fetch_media_url(track, &info, credentials).await?;

        info!(format = %format, "Resolved media URL");

        Ok(ResolvedTrack {
            media_url,
            format,
            info,
        })
    }

    async fn fetch_track_info(
        &self,
        track: &TrackId,
        credentials: &SessionCredentials,
    ) -> Result<TrackInfo> {
        let unavailable = |message: String| ProviderError::TrackInfoUnavailable {
            track_id: track.to_string(),
            message,
        };

        let url = gateway_url("song.getListData", &credentials.csrf_token)?;
        let request = browser_request(
            HttpMethod::Post,
            url,
            self.gateway_cookie(credentials),
            self.request_timeout,
        )
        .json(&TrackListRequest {
            sng_ids: [track.as_str()],
        })?;

        let response = self
            .send(request)
            .await
            .map_err(|message| unavailable(format!("song.getListData: {}", message)))?;

        let body: TrackListResponse = response.json().map_err(|e| unavailable(e.to_string()))?;

        if has_error_payload(&body.error) {
            warn!(error = %body.error, "Gateway returned an error payload");
            if is_token_rejection(&body.error) {
                return Err(ProviderError::SessionFetchFailed(format!(
                    "session tokens rejected: {}",
                    body.error
                )));
            }
            return Err(unavailable(body.error.to_string()));
        }

        let data = body
            .results
            .and_then(|results| results.data.into_iter().next())
            .ok_or_else(|| unavailable("no track data".to_string()))?;

        let track_token = data
            .track_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| unavailable("missing TRACK_TOKEN".to_string()))?;

        debug!("Fetched track token");
        Ok(TrackInfo::from_wire(track.as_str(), data, track_token))
    }

    async fn fetch_media_url(
        &self,
        track: &TrackId,
        info: &TrackInfo,
        credentials: &SessionCredentials,
    ) -> Result<(String, String)> {
        let unavailable = |message: String| ProviderError::MediaUrlUnavailable {
            track_id: track.to_string(),
            message,
        };

        let formats = format_preferences(self.quality);
        let fallback_format = formats
            .first()
            .map(|spec| spec.format.clone())
            .unwrap_or_default();

        let url = format!("{}/v1/get_url", credentials.media_base_url);
        let request = browser_request(
            HttpMethod::Post,
            url,
            self.gateway_cookie(credentials),
            self.request_timeout,
        )
        .json(&MediaUrlRequest {
            license_token: credentials.license_token.as_str(),
            media: vec![MediaSpec {
                kind: "FULL",
                formats,
            }],
            track_tokens: [info.track_token.as_str()],
        })?;

        let response = self
            .send(request)
            .await
            .map_err(|message| unavailable(format!("get_url: {}", message)))?;

        let body: MediaUrlResponse = response.json().map_err(|e| unavailable(e.to_string()))?;
        let entry = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| unavailable("empty response".to_string()))?;

        if let Some(error) = entry.errors.first() {
            let message = match (&error.code, &error.message) {
                (Some(code), Some(message)) => format!("{} ({})", message, code),
                (None, Some(message)) => message.clone(),
                (Some(code), None) => format!("error code {}", code),
                (None, None) => "unknown error".to_string(),
            };
            return Err(unavailable(message));
        }

        let media = entry
            .media
            .into_iter()
            .next()
            .ok_or_else(|| unavailable("no media entry".to_string()))?;

        let source = media
            .sources
            .into_iter()
            .next()
            .ok_or_else(|| unavailable("no media source".to_string()))?;

        debug!(provider = ?source.provider, "Selected media source");
        Ok((source.url, media.format.unwrap_or(fallback_format)))
    }

    /// `Cookie` header for calls authenticated by both the session and the account.
    fn gateway_cookie(&self, credentials: &SessionCredentials) -> String {
        if credentials.cookie.is_empty() {
            format!("arl={}", self.access_token)
        } else {
            format!("{}; arl={}", credentials.cookie, self.access_token)
        }
    }

    /// One bounded attempt; any failure is reported as a message.
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, String> {
        match tokio::time::timeout(self.request_timeout, self.http_client.execute(request)).await {
            Ok(Ok(response)) if response.is_success() => Ok(response),
            Ok(Ok(response)) => Err(format!("status {}", response.status)),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.request_timeout)),
        }
    }
}
