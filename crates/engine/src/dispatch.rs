//! Dispatch service — fans one notification out to every subscription.
//!
//! Sends are independent: one endpoint failing never aborts the others, and
//! endpoints the push service reports as gone (404/410) are pruned from the
//! registry. Delivery is best-effort; an accepted send says nothing about
//! whether the browser ever displayed the notification.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use beacon_common::error::AppError;
use beacon_common::types::{
    DeliveryFailure, DispatchReport, NotificationPayload, PushSubscriptionRecord,
};
use beacon_notifier::{DeliveryOutcome, MAX_PAYLOAD_BYTES, NotifierError, PushTransport};

use crate::registry::SubscriptionRegistry;

const TEST_TITLE: &str = "Test Notification";
const TEST_BODY: &str = "This is a test notification from your push server!";
const TEST_ICON: &str = "/pwa-192x192.png";

/// Per-endpoint result of one fan-out.
enum SendResult {
    Delivered,
    Gone,
    Failed(String),
}

/// Signs and sends notification payloads to all registered subscriptions.
pub struct DispatchService {
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<dyn PushTransport>,
}

impl DispatchService {
    pub fn new(registry: Arc<SubscriptionRegistry>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Send `payload` to every registered subscription.
    ///
    /// The payload is validated before anything is sent; an invalid payload
    /// fails the whole call with `InvalidPayload`. Per-endpoint failures are
    /// collected in the returned report instead.
    pub async fn send_to_all(
        &self,
        payload: &NotificationPayload,
    ) -> Result<DispatchReport, AppError> {
        payload.validate()?;

        let body = serde_json::to_vec(payload)?;
        if body.len() > MAX_PAYLOAD_BYTES {
            return Err(AppError::InvalidPayload(format!(
                "Notification is {} bytes, push messages are limited to {} bytes",
                body.len(),
                MAX_PAYLOAD_BYTES
            )));
        }

        let subscriptions = self.registry.list().await;
        if subscriptions.is_empty() {
            tracing::debug!("No subscriptions registered, nothing to dispatch");
            return Ok(DispatchReport::default());
        }

        let dispatch_id = Uuid::new_v4();

        tracing::info!(
            dispatch_id = %dispatch_id,
            recipients = subscriptions.len(),
            title = %payload.title,
            "Dispatching notification"
        );

        let results = join_all(
            subscriptions
                .iter()
                .map(|subscription| self.send_one(dispatch_id, subscription, &body)),
        )
        .await;

        let mut report = DispatchReport::default();
        for (subscription, result) in subscriptions.iter().zip(results) {
            match result {
                SendResult::Delivered => report.success_count += 1,
                SendResult::Gone => {
                    report.failure_count += 1;
                    if self.registry.remove(&subscription.endpoint).await {
                        report
                            .removed_subscriptions
                            .push(subscription.short_endpoint());
                        tracing::info!(
                            dispatch_id = %dispatch_id,
                            endpoint = %subscription.short_endpoint(),
                            "Removed invalid subscription"
                        );
                    }
                }
                SendResult::Failed(reason) => {
                    report.failure_count += 1;
                    report.failures.push(DeliveryFailure {
                        endpoint: subscription.short_endpoint(),
                        reason,
                    });
                }
            }
        }
        report.total_subscriptions = self.registry.len().await;

        tracing::info!(
            dispatch_id = %dispatch_id,
            success_count = report.success_count,
            failure_count = report.failure_count,
            removed = report.removed_subscriptions.len(),
            "Dispatch complete"
        );

        Ok(report)
    }

    /// Send the fixed test notification to every subscription.
    pub async fn send_test_notification(&self) -> Result<DispatchReport, AppError> {
        self.send_to_all(&test_payload()).await
    }

    async fn send_one(
        &self,
        dispatch_id: Uuid,
        subscription: &PushSubscriptionRecord,
        body: &[u8],
    ) -> SendResult {
        match self.transport.send(subscription, body).await {
            Ok(DeliveryOutcome::Accepted) | Ok(DeliveryOutcome::Throttled) => {
                tracing::debug!(
                    dispatch_id = %dispatch_id,
                    endpoint = %subscription.short_endpoint(),
                    "Notification sent"
                );
                SendResult::Delivered
            }
            Ok(DeliveryOutcome::Gone { status }) => {
                tracing::warn!(
                    dispatch_id = %dispatch_id,
                    endpoint = %subscription.short_endpoint(),
                    status,
                    "Push service reports subscription gone"
                );
                SendResult::Gone
            }
            Err(e) => {
                log_send_error(dispatch_id, subscription, &e);
                SendResult::Failed(e.to_string())
            }
        }
    }
}

fn log_send_error(dispatch_id: Uuid, subscription: &PushSubscriptionRecord, error: &NotifierError) {
    tracing::warn!(
        dispatch_id = %dispatch_id,
        endpoint = %subscription.short_endpoint(),
        error = %error,
        "Failed to send notification"
    );
}

/// Fixed payload used for manual verification.
pub fn test_payload() -> NotificationPayload {
    NotificationPayload::new(TEST_TITLE, TEST_BODY)
        .with_icon(TEST_ICON)
        .with_data(serde_json::json!({ "timestamp": Utc::now().to_rfc3339() }))
}
