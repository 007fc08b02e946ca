//! Deezer web gateway (`gw-light.php`) session handshake
//!
//! Exchanges the long-lived `arl` cookie for the short-lived session
//! credentials: the session cookie, the license token for media URL requests,
//! and the `checkForm` token that authorises further gateway calls.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use chrono::Utc;
use cookie::Cookie;
use core_runtime::config::{CoreConfig, DEFAULT_REQUEST_TIMEOUT};
use core_session::{CredentialSource, SessionCredentials, SessionError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{ProviderError, Result};
use crate::types::{has_error_payload, UserDataResponse, DEFAULT_MEDIA_BASE_URL};

/// Gateway endpoint for all `method=` calls
pub const GATEWAY_URL: &str = "https://www.deezer.com/ajax/gw-light.php";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";

/// Gateway URL for `method`, authorised by `api_token`.
pub(crate) fn gateway_url(method: &str, api_token: &str) -> Result<String> {
    let url = Url::parse_with_params(
        GATEWAY_URL,
        &[
            ("method", method),
            ("input", "3"),
            ("api_version", "1.0"),
            ("api_token", api_token),
        ],
    )
    .map_err(|e| BridgeError::OperationFailed(format!("Invalid gateway URL: {}", e)))?;
    Ok(url.into())
}

/// Request carrying the browser-like headers the web player sends.
pub(crate) fn browser_request(
    method: HttpMethod,
    url: impl Into<String>,
    cookie: impl Into<String>,
    timeout: Duration,
) -> HttpRequest {
    HttpRequest::new(method, url)
        .cookie(cookie)
        .header("User-Agent", USER_AGENT)
        .header("DNT", "1")
        .header("Origin", "https://www.deezer.com")
        .header("Connection", "keep-alive")
        .header("Referer", "https://www.deezer.com/login")
        .timeout(timeout)
}

/// Session cookie assembled from every `Set-Cookie` line of `response`.
pub(crate) fn session_cookie(response: &HttpResponse) -> String {
    response
        .cookies
        .iter()
        .filter_map(|raw| match Cookie::parse(raw.as_str()) {
            Ok(cookie) => Some(format!("{}={}", cookie.name(), cookie.value())),
            Err(e) => {
                debug!(error = %e, "Skipping malformed Set-Cookie header");
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fresh random `api_token` for the unauthenticated `getUserData` call.
fn random_api_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// `CredentialSource` backed by `deezer.getUserData`.
pub struct GatewayCredentialSource {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    request_timeout: Duration,
}

impl GatewayCredentialSource {
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `access_token` - value of the account's `arl` cookie
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(Arc::clone(&config.http_client), config.access_token.clone())
            .with_timeout(config.request_timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Performs the handshake and validates the returned tokens.
    #[instrument(skip(self))]
    pub async fn fetch_user_data(&self) -> Result<SessionCredentials> {
        let url = gateway_url("deezer.getUserData", &random_api_token())?;
        let request = browser_request(
            HttpMethod::Get,
            url,
            format!("arl={}", self.access_token),
            self.request_timeout,
        );

        let response =
            match tokio::time::timeout(self.request_timeout, self.http_client.execute(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(error = %e, "getUserData request failed");
                    return Err(ProviderError::SessionFetchFailed(e.to_string()));
                }
                Err(_) => {
                    return Err(ProviderError::SessionFetchFailed(format!(
                        "getUserData timed out after {:?}",
                        self.request_timeout
                    )))
                }
            };

        if !response.is_success() {
            return Err(ProviderError::SessionFetchFailed(format!(
                "getUserData returned status {}",
                response.status
            )));
        }

        let body: UserDataResponse = response
            .json()
            .map_err(|e| ProviderError::SessionFetchFailed(e.to_string()))?;

        if has_error_payload(&body.error) {
            return Err(ProviderError::SessionFetchFailed(format!(
                "getUserData error: {}",
                body.error
            )));
        }

        let results = body.results.ok_or_else(|| {
            ProviderError::SessionFetchFailed("getUserData response has no results".to_string())
        })?;

        let license_token = results
            .user
            .as_ref()
            .and_then(|user| user.options.as_ref())
            .and_then(|options| options.license_token.clone())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ProviderError::SessionFetchFailed("Unable to get license token".to_string())
            })?;

        let csrf_token = results
            .check_form
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ProviderError::SessionFetchFailed(
                    "Unable to get csrf token which is required for decryption".to_string(),
                )
            })?;

        let media_base_url = results
            .url_media
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_MEDIA_BASE_URL.to_string());

        info!(media_base_url = %media_base_url, "Fetched Deezer session");

        Ok(SessionCredentials {
            cookie: session_cookie(&response),
            license_token,
            csrf_token,
            media_base_url: media_base_url.trim_end_matches('/').to_string(),
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl CredentialSource for GatewayCredentialSource {
    async fn fetch_credentials(&self) -> core_session::Result<SessionCredentials> {
        self.fetch_user_data().await.map_err(SessionError::from)
    }
}
