//! Concrete caching scenarios, spec §8 items 4-6.

mod common;

use common::{json_response, text_response, MockTransport};
use http::HeaderMap;
use rhttp_cache::{CacheControlRecord, DurationOrBool, FifoMemoryProvider};
use rhttp_client::{CacheOptions, Client, RequestOptions};
use std::sync::Arc;
use std::time::Duration;

fn fresh_for_an_hour() -> CacheControlRecord {
    CacheControlRecord {
        max_age: Some(DurationOrBool::Seconds(3600)),
        ..Default::default()
    }
}

#[tokio::test]
async fn race_mode_returns_the_fresh_cache_hit_without_update() {
    let provider = Arc::new(FifoMemoryProvider::new("memory", 16));
    let backend = provider.create("Cached").await.unwrap();
    backend
        .set("widgets", serde_json::json!({"result": "stale"}), HeaderMap::new(), fresh_for_an_hour())
        .await
        .unwrap();

    let transport = Arc::new(MockTransport::new(vec![
        json_response(200, serde_json::json!({"result": "fresh"})).with_delay(Duration::from_millis(100)),
        json_response(200, serde_json::json!({"result": "fresh"})),
    ]));
    let client = Client::builder()
        .register_cache_provider(provider)
        .unwrap()
        .build(transport.clone());

    let cache = CacheOptions {
        key: "widgets".to_string(),
        mode: rhttp_cache::CacheMode::Race,
        update: false,
        ..Default::default()
    };
    let response = client
        .fetch_json("https://example.com/widgets", RequestOptions::default(), Some(cache))
        .await
        .unwrap();

    assert_eq!(response.value, serde_json::json!({"result": "stale"}));
    assert!(response.update.is_none());

    let followup = client
        .fetch_json("https://example.com/widgets", RequestOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(followup.value, serde_json::json!({"result": "fresh"}));
}

#[tokio::test]
async fn race_mode_with_update_resolves_the_update_channel_to_the_fetched_value() {
    let provider = Arc::new(FifoMemoryProvider::new("memory", 16));
    let backend = provider.create("Cached").await.unwrap();
    backend
        .set("widgets", serde_json::json!({"result": "stale"}), HeaderMap::new(), fresh_for_an_hour())
        .await
        .unwrap();

    let transport = Arc::new(MockTransport::new(vec![
        json_response(200, serde_json::json!({"result": "fresh"})).with_delay(Duration::from_millis(100)),
    ]));
    let client = Client::builder()
        .register_cache_provider(provider)
        .unwrap()
        .build(transport.clone());

    let cache = CacheOptions {
        key: "widgets".to_string(),
        mode: rhttp_cache::CacheMode::Race,
        update: true,
        ..Default::default()
    };
    let response = client
        .fetch_json("https://example.com/widgets", RequestOptions::default(), Some(cache))
        .await
        .unwrap();

    assert_eq!(response.value, serde_json::json!({"result": "stale"}));
    let update = response.update.expect("update channel requested").await;
    match update {
        rhttp_cache::UpdateOutcome::Updated(result) => {
            assert_eq!(result.value, serde_json::json!({"result": "fresh"}));
        }
        other => panic!("expected an updated value, got {other:?}"),
    }
}

#[tokio::test]
async fn cache_control_no_store_never_writes_through() {
    let provider = Arc::new(FifoMemoryProvider::new("memory", 16));
    let transport = Arc::new(MockTransport::new(vec![
        json_response(200, serde_json::json!({"n": 1})).with_header("cache-control", "no-store"),
        json_response(200, serde_json::json!({"n": 2})).with_header("cache-control", "no-store"),
    ]));
    let client = Client::builder()
        .register_cache_provider(provider.clone())
        .unwrap()
        .build(transport.clone());

    let cache_options = || CacheOptions {
        key: "widgets".to_string(),
        ..Default::default()
    };

    let first = client
        .fetch_json("https://example.com/widgets", RequestOptions::default(), Some(cache_options()))
        .await
        .unwrap();
    let second = client
        .fetch_json("https://example.com/widgets", RequestOptions::default(), Some(cache_options()))
        .await
        .unwrap();

    assert_eq!(first.value, serde_json::json!({"n": 1}));
    assert_eq!(second.value, serde_json::json!({"n": 2}));
    assert_ne!(first.value, second.value);

    let backend = provider.create("Cached").await.unwrap();
    assert!(backend.get("widgets").await.unwrap().is_none());
}
