//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server.
//! Push delivery goes through a recording transport, so no push service or
//! network access is needed.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use beacon_api::routes::create_router;
use beacon_api::state::AppState;
use beacon_common::types::PushSubscriptionRecord;
use beacon_engine::dispatch::DispatchService;
use beacon_engine::registry::SubscriptionRegistry;
use beacon_notifier::{DeliveryOutcome, NotifierError, PushTransport};

// ============================================================
// Helpers
// ============================================================

const TEST_PUBLIC_KEY: &str = "BTestPublicKey";

/// Records every send; endpoints listed in `gone` answer 410.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(String, serde_json::Value)>>,
    gone: Vec<String>,
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn send(
        &self,
        subscription: &PushSubscriptionRecord,
        payload: &[u8],
    ) -> Result<DeliveryOutcome, NotifierError> {
        let json = serde_json::from_slice(payload).unwrap();
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), json));

        if self.gone.contains(&subscription.endpoint) {
            Ok(DeliveryOutcome::Gone { status: 410 })
        } else {
            Ok(DeliveryOutcome::Accepted)
        }
    }
}

fn build_app(transport: Arc<RecordingTransport>) -> (Router, AppState) {
    let registry = Arc::new(SubscriptionRegistry::new());
    let dispatcher = DispatchService::new(registry, transport);
    let state = AppState::new(dispatcher, TEST_PUBLIC_KEY.to_string());
    (create_router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn subscription_json(endpoint: &str) -> serde_json::Value {
    serde_json::json!({
        "endpoint": endpoint,
        "expirationTime": null,
        "keys": { "p256dh": "k1", "auth": "a1" }
    })
}

// ============================================================
// Route tests
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = build_app(Arc::default());

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "beacon-api");
    assert_eq!(json["subscriptions"], 0);
}

#[tokio::test]
async fn test_vapid_public_key_endpoint() {
    let (app, _) = build_app(Arc::default());

    let (status, json) = send(&app, "GET", "/vapid-public-key", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["public_key"], TEST_PUBLIC_KEY);
}

#[tokio::test]
async fn test_subscribe_twice_stores_one_record() {
    let (app, state) = build_app(Arc::default());

    let (status, json) = send(
        &app,
        "POST",
        "/subscribe",
        Some(subscription_json("https://push.example.com/E1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Subscription received");
    assert_eq!(json["total_subscriptions"], 1);

    let (status, json) = send(
        &app,
        "POST",
        "/subscribe",
        Some(subscription_json("https://push.example.com/E1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Subscription updated");
    assert_eq!(json["total_subscriptions"], 1);

    assert_eq!(state.registry.len().await, 1);
}

#[tokio::test]
async fn test_subscribe_rejects_malformed_body() {
    let (app, state) = build_app(Arc::default());

    let (status, json) = send(
        &app,
        "POST",
        "/subscribe",
        Some(serde_json::json!({ "endpoint": "https://push.example.com/E1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("keys.p256dh"));

    let (status, _) = send(&app, "POST", "/subscribe", Some(serde_json::json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.registry.is_empty().await);
}

#[tokio::test]
async fn test_list_subscriptions_truncates_endpoints() {
    let (app, _) = build_app(Arc::default());
    let long_endpoint = format!("https://fcm.googleapis.com/fcm/send/{}", "x".repeat(100));

    send(&app, "POST", "/subscribe", Some(subscription_json(&long_endpoint))).await;

    let (status, json) = send(&app, "GET", "/subscriptions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);

    let entry = &json["subscriptions"][0];
    assert_eq!(entry["has_keys"], true);
    let shown = entry["endpoint"].as_str().unwrap();
    assert!(shown.ends_with("..."));
    assert!(shown.len() < long_endpoint.len());
    assert!(entry.get("keys").is_none(), "key material is not echoed");
}

#[tokio::test]
async fn test_send_notification_end_to_end() {
    let transport = Arc::new(RecordingTransport::default());
    let (app, _) = build_app(transport.clone());

    send(
        &app,
        "POST",
        "/subscribe",
        Some(subscription_json("https://push.example.com/E1")),
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        "/send-notification",
        Some(serde_json::json!({ "title": "Hi", "body": "there" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["success_count"], 1);
    assert_eq!(json["failure_count"], 0);
    assert_eq!(json["message"], "Notification sent to 1 client(s)");

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "https://push.example.com/E1");
    assert_eq!(sent[0].1["title"], "Hi");
    assert_eq!(sent[0].1["body"], "there");
}

#[tokio::test]
async fn test_send_notification_requires_title_and_body() {
    let transport = Arc::new(RecordingTransport::default());
    let (app, _) = build_app(transport.clone());

    send(
        &app,
        "POST",
        "/subscribe",
        Some(subscription_json("https://push.example.com/E1")),
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        "/send-notification",
        Some(serde_json::json!({ "title": "Hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Notification must include title and body");
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_notification_rejects_oversized_body() {
    let transport = Arc::new(RecordingTransport::default());
    let (app, _) = build_app(transport.clone());

    send(
        &app,
        "POST",
        "/subscribe",
        Some(subscription_json("https://push.example.com/E1")),
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        "/send-notification",
        Some(serde_json::json!({ "title": "Hi", "body": "x".repeat(5000) })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("limited to"));
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_notification_without_subscribers_is_noop() {
    let transport = Arc::new(RecordingTransport::default());
    let (app, _) = build_app(transport.clone());

    let (status, json) = send(&app, "POST", "/test-notification", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success_count"], 0);
    assert_eq!(json["total_subscriptions"], 0);
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_test_notification_prunes_gone_subscription() {
    let transport = Arc::new(RecordingTransport {
        gone: vec!["https://push.example.com/A".to_string()],
        ..Default::default()
    });
    let (app, state) = build_app(transport.clone());

    for endpoint in ["https://push.example.com/A", "https://push.example.com/B"] {
        send(&app, "POST", "/subscribe", Some(subscription_json(endpoint))).await;
    }

    let (status, json) = send(&app, "POST", "/test-notification", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success_count"], 1);
    assert_eq!(json["failure_count"], 1);
    assert_eq!(json["total_subscriptions"], 1);
    assert_eq!(json["removed_subscriptions"][0], "https://push.example.com/A");

    {
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, p)| p["title"] == "Test Notification"));
    }

    let remaining = state.registry.list().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].endpoint, "https://push.example.com/B");
}
