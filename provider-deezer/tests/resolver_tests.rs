mod common;

use bridge_traits::http::HttpMethod;
use common::{
    credentials, json_response, request_json, MockHttpClient, SlowHttpClient, StalledMediaClient,
};
use core_runtime::config::AudioQuality;
use provider_deezer::{ProviderError, StreamResolver, TrackId};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const TRACK_INFO_URL: &str = "https://www.deezer.com/ajax/gw-light.php?method=song.getListData&input=3&api_version=1.0&api_token=csrf-xyz";
const MEDIA_URL: &str = "https://media.deezer.com/v1/get_url";

fn track_list(track_token: Option<&str>) -> serde_json::Value {
    let mut track = json!({
        "SNG_ID": "3135556",
        "SNG_TITLE": "Harder, Better, Faster, Stronger",
        "ART_NAME": "Daft Punk",
        "ALB_TITLE": "Discovery",
        "DURATION": "224"
    });
    if let Some(token) = track_token {
        track["TRACK_TOKEN"] = json!(token);
    }
    json!({ "error": [], "results": { "data": [track], "count": 1 } })
}

fn media_response(format: &str) -> serde_json::Value {
    json!({
        "data": [{
            "media": [{
                "media_type": "FULL",
                "cipher": { "type": "BF_CBC_STRIPE" },
                "format": format,
                "sources": [
                    { "url": "https://cdnt-proxy.dzcdn.net/media/1/abc", "provider": "ak" },
                    { "url": "https://cdnt-proxy.dzcdn.net/media/2/abc", "provider": "ec" }
                ]
            }]
        }]
    })
}

fn expect_track_info(client: &mut MockHttpClient, body: serde_json::Value) {
    client
        .expect_execute()
        .withf(|request| request.url == TRACK_INFO_URL)
        .times(1)
        .returning(move |_| Ok(json_response(body.clone())));
}

fn track() -> TrackId {
    TrackId::parse("3135556").unwrap()
}

#[tokio::test]
async fn test_resolve_sends_both_requests() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute()
        .withf(|request| {
            request.method == HttpMethod::Post
                && request.url == TRACK_INFO_URL
                && request.headers.get("Cookie").map(String::as_str)
                    == Some("sid=fr1234; arl=account-arl")
                && request_json(request) == json!({ "sng_ids": ["3135556"] })
        })
        .times(1)
        .returning(|_| Ok(json_response(track_list(Some("track-token-1")))));
    client
        .expect_execute()
        .withf(|request| {
            request.method == HttpMethod::Post
                && request.url == MEDIA_URL
                && request_json(request)
                    == json!({
                        "license_token": "license-abc",
                        "media": [{
                            "type": "FULL",
                            "formats": [
                                { "cipher": "BF_CBC_STRIPE", "format": "FLAC" },
                                { "cipher": "BF_CBC_STRIPE", "format": "MP3_320" },
                                { "cipher": "BF_CBC_STRIPE", "format": "MP3_128" },
                                { "cipher": "BF_CBC_STRIPE", "format": "MP3_64" }
                            ]
                        }],
                        "track_tokens": ["track-token-1"]
                    })
        })
        .times(1)
        .returning(|_| Ok(json_response(media_response("MP3_320"))));

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    let resolved = resolver.resolve(&track(), &credentials()).await.unwrap();

    assert_eq!(resolved.media_url, "https://cdnt-proxy.dzcdn.net/media/1/abc");
    assert_eq!(resolved.format, "MP3_320");
    assert_eq!(resolved.info.id, "3135556");
    assert_eq!(resolved.info.artist.as_deref(), Some("Daft Punk"));
    assert_eq!(resolved.info.duration, Some(Duration::from_secs(224)));
    assert_eq!(resolved.info.track_token, "track-token-1");
}

#[tokio::test]
async fn test_quality_cap_limits_requested_formats() {
    let mut client = MockHttpClient::new();
    expect_track_info(&mut client, track_list(Some("track-token-1")));
    client
        .expect_execute()
        .withf(|request| {
            request.url == MEDIA_URL
                && request_json(request)["media"][0]["formats"]
                    == json!([
                        { "cipher": "BF_CBC_STRIPE", "format": "MP3_128" },
                        { "cipher": "BF_CBC_STRIPE", "format": "MP3_64" }
                    ])
        })
        .times(1)
        .returning(|_| Ok(json_response(media_response("MP3_128"))));

    let resolver =
        StreamResolver::new(Arc::new(client), "account-arl").with_quality(AudioQuality::Standard);
    let resolved = resolver.resolve(&track(), &credentials()).await.unwrap();

    assert_eq!(resolved.format, "MP3_128");
}

#[tokio::test]
async fn test_error_payload_array_maps_to_track_info_unavailable() {
    let mut client = MockHttpClient::new();
    expect_track_info(
        &mut client,
        json!({ "error": ["DATA_ERROR"], "results": {} }),
    );

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    let err = resolver.resolve(&track(), &credentials()).await.unwrap_err();

    assert!(matches!(
        err,
        ProviderError::TrackInfoUnavailable { ref track_id, ref message }
            if track_id == "3135556" && message.contains("DATA_ERROR")
    ));
}

#[tokio::test]
async fn test_error_payload_object_maps_to_track_info_unavailable() {
    let mut client = MockHttpClient::new();
    expect_track_info(
        &mut client,
        json!({ "error": { "DATA_ERROR": "song not found" }, "results": {} }),
    );

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    assert!(matches!(
        resolver.resolve(&track(), &credentials()).await,
        Err(ProviderError::TrackInfoUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_rejected_session_token_maps_to_session_fetch_failed() {
    let mut client = MockHttpClient::new();
    expect_track_info(
        &mut client,
        json!({ "error": { "VALID_TOKEN_REQUIRED": "Invalid CSRF token" }, "results": {} }),
    );
    client
        .expect_execute()
        .withf(|request| request.url == MEDIA_URL)
        .times(0);

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    let err = resolver.resolve(&track(), &credentials()).await.unwrap_err();

    assert!(matches!(
        err,
        ProviderError::SessionFetchFailed(ref message) if message.contains("VALID_TOKEN_REQUIRED")
    ));
}

#[tokio::test]
async fn test_scalar_error_field_is_not_an_error() {
    let mut client = MockHttpClient::new();
    let mut body = track_list(Some("track-token-1"));
    body["error"] = json!(false);
    expect_track_info(&mut client, body);
    client
        .expect_execute()
        .withf(|request| request.url == MEDIA_URL)
        .times(1)
        .returning(|_| Ok(json_response(media_response("FLAC"))));

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    let resolved = resolver.resolve(&track(), &credentials()).await.unwrap();

    assert_eq!(resolved.format, "FLAC");
}

#[tokio::test]
async fn test_missing_track_token_skips_media_request() {
    let mut client = MockHttpClient::new();
    expect_track_info(&mut client, track_list(None));
    client
        .expect_execute()
        .withf(|request| request.url == MEDIA_URL)
        .times(0);

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    let err = resolver.resolve(&track(), &credentials()).await.unwrap_err();

    assert!(matches!(err, ProviderError::TrackInfoUnavailable { ref message, .. } if message.contains("TRACK_TOKEN")));
}

#[tokio::test]
async fn test_missing_sources_maps_to_media_url_unavailable() {
    let mut client = MockHttpClient::new();
    expect_track_info(&mut client, track_list(Some("track-token-1")));
    client
        .expect_execute()
        .withf(|request| request.url == MEDIA_URL)
        .returning(|_| {
            Ok(json_response(json!({
                "data": [{ "media": [{ "format": "FLAC", "sources": [] }] }]
            })))
        });

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    assert!(matches!(
        resolver.resolve(&track(), &credentials()).await,
        Err(ProviderError::MediaUrlUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_media_errors_map_to_media_url_unavailable() {
    let mut client = MockHttpClient::new();
    expect_track_info(&mut client, track_list(Some("track-token-1")));
    client
        .expect_execute()
        .withf(|request| request.url == MEDIA_URL)
        .returning(|_| {
            Ok(json_response(json!({
                "data": [{ "errors": [{ "code": 2002, "message": "Track token has no sufficient rights on requested media" }] }]
            })))
        });

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    let err = resolver.resolve(&track(), &credentials()).await.unwrap_err();

    assert!(matches!(
        err,
        ProviderError::MediaUrlUnavailable { ref message, .. }
            if message.contains("sufficient rights") && message.contains("2002")
    ));
}

#[tokio::test]
async fn test_media_status_error_maps_to_media_url_unavailable() {
    let mut client = MockHttpClient::new();
    expect_track_info(&mut client, track_list(Some("track-token-1")));
    client
        .expect_execute()
        .withf(|request| request.url == MEDIA_URL)
        .returning(|_| Ok(bridge_traits::http::HttpResponse::new(403, "")));

    let resolver = StreamResolver::new(Arc::new(client), "account-arl");
    assert!(matches!(
        resolver.resolve(&track(), &credentials()).await,
        Err(ProviderError::MediaUrlUnavailable { ref message, .. }) if message.contains("403")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_track_info_timeout() {
    let client = SlowHttpClient {
        delay: Duration::from_secs(60),
    };
    let resolver =
        StreamResolver::new(Arc::new(client), "account-arl").with_timeout(Duration::from_secs(30));

    let err = resolver.resolve(&track(), &credentials()).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::TrackInfoUnavailable { ref message, .. } if message.contains("timed out")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_media_url_timeout() {
    let client = StalledMediaClient {
        gateway_body: track_list(Some("track-token-1")),
        delay: Duration::from_secs(60),
    };
    let resolver =
        StreamResolver::new(Arc::new(client), "account-arl").with_timeout(Duration::from_secs(30));

    let err = resolver.resolve(&track(), &credentials()).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::MediaUrlUnavailable { ref message, .. } if message.contains("timed out")
    ));
}
