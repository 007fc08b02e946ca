mod common;

use bridge_traits::error::BridgeError;
use bridge_traits::http::HttpMethod;
use common::{json_response, MockHttpClient, SlowHttpClient};
use core_runtime::events::EventBus;
use core_session::{CredentialSource, SessionError, SessionManager, SessionSettings};
use provider_deezer::{GatewayCredentialSource, ProviderError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn user_data(url_media: Option<&str>) -> serde_json::Value {
    let mut results = json!({
        "USER": {
            "USER_ID": 1234567,
            "OPTIONS": { "license_token": "license-abc" }
        },
        "checkForm": "csrf-xyz"
    });
    if let Some(url) = url_media {
        results["URL_MEDIA"] = json!(url);
    }
    json!({ "error": [], "results": results })
}

#[tokio::test]
async fn test_handshake_builds_credentials() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .withf(|request| {
            let api_token = request
                .url
                .split("api_token=")
                .nth(1)
                .unwrap_or_default();

            request.method == HttpMethod::Get
                && request.url.starts_with(
                    "https://www.deezer.com/ajax/gw-light.php?method=deezer.getUserData&input=3&api_version=1.0&api_token=",
                )
                && api_token.len() == 32
                && api_token.bytes().all(|b| b.is_ascii_hexdigit())
                && request.headers.get("Cookie").map(String::as_str) == Some("arl=account-arl")
                && request.headers.contains_key("User-Agent")
        })
        .times(1)
        .returning(|_| {
            let mut response = json_response(user_data(Some("https://media.deezer.com/")));
            response.cookies = vec![
                "sid=fr1234; path=/; domain=.deezer.com; HttpOnly".to_string(),
                "dzr_uniq_id=dzr_uniq_id_fr42; path=/".to_string(),
            ];
            Ok(response)
        });

    let source = GatewayCredentialSource::new(Arc::new(client), "account-arl");
    let credentials = source.fetch_user_data().await.unwrap();

    assert_eq!(credentials.cookie, "sid=fr1234; dzr_uniq_id=dzr_uniq_id_fr42");
    assert_eq!(credentials.license_token, "license-abc");
    assert_eq!(credentials.csrf_token, "csrf-xyz");
    assert_eq!(credentials.media_base_url, "https://media.deezer.com");
}

#[tokio::test]
async fn test_missing_media_url_uses_default() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .returning(|_| Ok(json_response(user_data(None))));

    let source = GatewayCredentialSource::new(Arc::new(client), "account-arl");
    let credentials = source.fetch_user_data().await.unwrap();

    assert_eq!(credentials.media_base_url, "https://media.deezer.com");
}

#[tokio::test]
async fn test_empty_license_token_is_rejected() {
    let mut client = MockHttpClient::new();
    client.expect_execute().returning(|_| {
        let mut body = user_data(None);
        body["results"]["USER"]["OPTIONS"]["license_token"] = json!("");
        Ok(json_response(body))
    });

    let source = GatewayCredentialSource::new(Arc::new(client), "account-arl");
    let err = source.fetch_user_data().await.unwrap_err();

    assert!(matches!(err, ProviderError::SessionFetchFailed(ref m) if m.contains("license token")));
}

#[tokio::test]
async fn test_missing_check_form_is_rejected() {
    let mut client = MockHttpClient::new();
    client.expect_execute().returning(|_| {
        Ok(json_response(json!({
            "error": [],
            "results": { "USER": { "OPTIONS": { "license_token": "license-abc" } } }
        })))
    });

    let source = GatewayCredentialSource::new(Arc::new(client), "account-arl");
    let err = source.fetch_user_data().await.unwrap_err();

    assert!(matches!(err, ProviderError::SessionFetchFailed(ref m) if m.contains("csrf")));
}

#[tokio::test]
async fn test_gateway_error_payload_is_rejected() {
    let mut client = MockHttpClient::new();
    client.expect_execute().returning(|_| {
        Ok(json_response(json!({
            "error": { "GATEWAY_ERROR": "invalid arl" },
            "results": {}
        })))
    });

    let source = GatewayCredentialSource::new(Arc::new(client), "expired-arl");
    assert!(matches!(
        source.fetch_user_data().await,
        Err(ProviderError::SessionFetchFailed(_))
    ));
}

#[tokio::test]
async fn test_transport_and_status_failures() {
    let mut failing = MockHttpClient::new();
    failing
        .expect_execute()
        .returning(|_| Err(BridgeError::OperationFailed("connection reset".to_string())));
    let source = GatewayCredentialSource::new(Arc::new(failing), "account-arl");
    assert!(matches!(
        source.fetch_credentials().await,
        Err(SessionError::SessionFetchFailed(ref m)) if m.contains("connection reset")
    ));

    let mut server_error = MockHttpClient::new();
    server_error
        .expect_execute()
        .returning(|_| Ok(bridge_traits::http::HttpResponse::new(503, "")));
    let source = GatewayCredentialSource::new(Arc::new(server_error), "account-arl");
    assert!(matches!(
        source.fetch_credentials().await,
        Err(SessionError::SessionFetchFailed(ref m)) if m.contains("503")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_handshake_times_out() {
    let client = SlowHttpClient {
        delay: Duration::from_secs(120),
    };
    let source = GatewayCredentialSource::new(Arc::new(client), "account-arl")
        .with_timeout(Duration::from_secs(5));

    let err = source.fetch_user_data().await.unwrap_err();
    assert!(matches!(err, ProviderError::SessionFetchFailed(ref m) if m.contains("timed out")));
}

#[tokio::test]
async fn test_session_manager_activates_through_gateway() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .times(1)
        .returning(|_| Ok(json_response(user_data(None))));

    let source = Arc::new(GatewayCredentialSource::new(Arc::new(client), "account-arl"));
    let manager = SessionManager::new(source, SessionSettings::default(), EventBus::new(16));

    let credentials = manager.activate().await.unwrap();
    assert_eq!(credentials.license_token, "license-abc");

    manager.deactivate().await;
}
