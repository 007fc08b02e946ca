#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{ByteStream, HttpClient, HttpRequest, HttpResponse};
use chrono::Utc;
use core_session::SessionCredentials;
use mockall::mock;
use std::time::Duration;

mock! {
    pub HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        async fn download_stream(&self, url: String) -> Result<ByteStream>;
    }
}

/// Client whose every request hangs for `delay`.
pub struct SlowHttpClient {
    pub delay: Duration,
}

#[async_trait]
impl HttpClient for SlowHttpClient {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
        tokio::time::sleep(self.delay).await;
        Ok(HttpResponse::new(200, "{}"))
    }

    async fn download_stream(&self, _url: String) -> Result<ByteStream> {
        Err(BridgeError::NotAvailable("downloads".to_string()))
    }
}

/// Client that answers gateway calls with `gateway_body` and hangs for
/// `delay` on every other request.
pub struct StalledMediaClient {
    pub gateway_body: serde_json::Value,
    pub delay: Duration,
}

#[async_trait]
impl HttpClient for StalledMediaClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        if request.url.contains("gw-light.php") {
            return Ok(json_response(self.gateway_body.clone()));
        }
        tokio::time::sleep(self.delay).await;
        Ok(HttpResponse::new(200, "{}"))
    }

    async fn download_stream(&self, _url: String) -> Result<ByteStream> {
        Err(BridgeError::NotAvailable("downloads".to_string()))
    }
}

pub fn json_response(body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string())
}

pub fn request_json(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_ref().expect("request has a body")).unwrap()
}

pub fn credentials() -> SessionCredentials {
    SessionCredentials {
        cookie: "sid=fr1234".to_string(),
        license_token: "license-abc".to_string(),
        csrf_token: "csrf-xyz".to_string(),
        media_base_url: "https://media.deezer.com".to_string(),
        fetched_at: Utc::now(),
    }
}
