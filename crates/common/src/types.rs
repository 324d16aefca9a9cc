use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of endpoint characters kept when an endpoint is logged or echoed back.
pub const ENDPOINT_DISPLAY_LEN: usize = 50;

/// Encryption key material issued by the browser alongside a push endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Browser's P-256 ECDH public key (base64url)
    #[serde(default)]
    pub p256dh: String,
    /// Shared authentication secret (base64url)
    #[serde(default)]
    pub auth: String,
}

/// A browser push subscription as stored by the server.
///
/// Mirrors the JSON shape of the browser's `PushSubscription.toJSON()` so the
/// client can forward it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionRecord {
    /// Push service endpoint URL (registry key)
    #[serde(default)]
    pub endpoint: String,
    /// Expiry reported by the browser, in milliseconds since the epoch
    #[serde(
        rename = "expirationTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_time: Option<i64>,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

impl PushSubscriptionRecord {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }

    /// Reject records missing any of the fields needed to deliver a push.
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = [
            ("endpoint", self.endpoint.as_str()),
            ("keys.p256dh", self.keys.p256dh.as_str()),
            ("keys.auth", self.keys.auth.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidSubscription(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Endpoint shortened for logs and debug listings.
    pub fn short_endpoint(&self) -> String {
        short_endpoint(&self.endpoint)
    }
}

/// Truncate an endpoint to `ENDPOINT_DISPLAY_LEN` characters, marking the cut.
pub fn short_endpoint(endpoint: &str) -> String {
    if endpoint.chars().count() <= ENDPOINT_DISPLAY_LEN {
        return endpoint.to_string();
    }
    let head: String = endpoint.chars().take(ENDPOINT_DISPLAY_LEN).collect();
    format!("{}...", head)
}

/// Notification content pushed to every subscription.
///
/// Serialized as JSON and used as the (encrypted) push message body; the
/// service worker parses it back into a visible notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Opaque application data handed through to the notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            data: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Title and body must both be present and non-blank.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() || self.body.trim().is_empty() {
            return Err(AppError::InvalidPayload(
                "Notification must include title and body".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of inserting a record into the subscription registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    Replaced,
}

/// A single endpoint that could not be reached during fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    /// Truncated endpoint
    pub endpoint: String,
    pub reason: String,
}

/// Summary of one dispatch call across all registered subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub success_count: usize,
    pub failure_count: usize,
    /// Registry size after stale subscriptions were pruned
    pub total_subscriptions: usize,
    /// Truncated endpoints removed because the push service reported them gone
    pub removed_subscriptions: Vec<String>,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    /// Human-readable summary, e.g. "Notification sent to 2 client(s)".
    pub fn message(&self) -> String {
        format!("Notification sent to {} client(s)", self.success_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_browser_json() {
        let json = serde_json::json!({
            "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
            "expirationTime": null,
            "keys": { "p256dh": "k1", "auth": "a1" }
        });
        let record: PushSubscriptionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.endpoint, "https://fcm.googleapis.com/fcm/send/abc");
        assert_eq!(record.expiration_time, None);
        assert_eq!(record.keys.p256dh, "k1");
        assert_eq!(record.keys.auth, "a1");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_record_missing_keys_fails_validation() {
        let json = serde_json::json!({ "endpoint": "https://push.example.com/1" });
        let record: PushSubscriptionRecord = serde_json::from_value(json).unwrap();
        let err = record.validate().unwrap_err();
        match err {
            AppError::InvalidSubscription(msg) => {
                assert!(msg.contains("keys.p256dh"));
                assert!(msg.contains("keys.auth"));
                assert!(!msg.contains("endpoint"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_blank_endpoint_fails_validation() {
        let record = PushSubscriptionRecord::new("   ", "k1", "a1");
        assert!(matches!(
            record.validate(),
            Err(AppError::InvalidSubscription(_))
        ));
    }

    #[test]
    fn test_short_endpoint_truncates_long_urls() {
        let long = format!("https://push.example.com/{}", "x".repeat(80));
        let short = short_endpoint(&long);
        assert_eq!(short.chars().count(), ENDPOINT_DISPLAY_LEN + 3);
        assert!(short.ends_with("..."));

        assert_eq!(short_endpoint("https://a.b/c"), "https://a.b/c");
    }

    #[test]
    fn test_payload_requires_title_and_body() {
        assert!(NotificationPayload::new("Hi", "there").validate().is_ok());
        assert!(NotificationPayload::new("", "there").validate().is_err());
        assert!(NotificationPayload::new("Hi", "  ").validate().is_err());

        let missing_body: NotificationPayload =
            serde_json::from_value(serde_json::json!({ "title": "Hi" })).unwrap();
        assert!(matches!(
            missing_body.validate(),
            Err(AppError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_payload_serialization_skips_absent_optionals() {
        let json = serde_json::to_value(NotificationPayload::new("Hi", "there")).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "Hi", "body": "there" }));

        let json = serde_json::to_value(
            NotificationPayload::new("Hi", "there")
                .with_icon("/icon.png")
                .with_data(serde_json::json!({ "url": "/inbox" })),
        )
        .unwrap();
        assert_eq!(json["icon"], "/icon.png");
        assert_eq!(json["data"]["url"], "/inbox");
    }

    #[test]
    fn test_report_message() {
        let report = DispatchReport {
            success_count: 2,
            ..Default::default()
        };
        assert_eq!(report.message(), "Notification sent to 2 client(s)");
    }
}
