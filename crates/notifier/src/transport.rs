//! Push message transport.
//!
//! `WebPushTransport` uses the `web-push` crate only for payload encryption
//! and VAPID signing; the HTTP request itself goes through a shared
//! `reqwest::Client` so connections to the same push service are pooled.

use async_trait::async_trait;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessage,
    WebPushMessageBuilder,
};

use beacon_common::types::PushSubscriptionRecord;

use crate::NotifierError;
use crate::vapid::VapidKeys;

/// How the push service answered a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Message accepted for delivery (2xx).
    Accepted,
    /// Push service is rate limiting us (429); the subscription is still valid.
    Throttled,
    /// Subscription expired or was revoked (404/410) and should be dropped.
    Gone { status: u16 },
}

/// Sends one encoded payload to one subscription.
///
/// Implementations must treat each call independently; the dispatch service
/// runs many sends concurrently.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscriptionRecord,
        payload: &[u8],
    ) -> Result<DeliveryOutcome, NotifierError>;
}

/// Production transport: RFC 8291 `aes128gcm` encryption + VAPID JWT.
pub struct WebPushTransport {
    client: reqwest::Client,
    keys: VapidKeys,
    subject: String,
    ttl_seconds: u32,
}

impl WebPushTransport {
    pub fn new(keys: VapidKeys, subject: impl Into<String>, ttl_seconds: u32) -> Self {
        Self::with_client(reqwest::Client::new(), keys, subject, ttl_seconds)
    }

    pub fn with_client(
        client: reqwest::Client,
        keys: VapidKeys,
        subject: impl Into<String>,
        ttl_seconds: u32,
    ) -> Self {
        Self {
            client,
            keys,
            subject: subject.into(),
            ttl_seconds,
        }
    }

    /// Encrypt and sign `payload` for `subscription`.
    ///
    /// The VAPID `aud` claim is derived by `web-push` from the endpoint origin.
    fn build_message(
        &self,
        subscription: &PushSubscriptionRecord,
        payload: &[u8],
    ) -> Result<WebPushMessage, NotifierError> {
        let sub_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder =
            VapidSignatureBuilder::from_base64(self.keys.private_key_base64url(), &sub_info)?;
        sig_builder.add_claim("sub", self.subject.as_str());
        let signature = sig_builder.build()?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl_seconds);

        Ok(builder.build()?)
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(
        &self,
        subscription: &PushSubscriptionRecord,
        payload: &[u8],
    ) -> Result<DeliveryOutcome, NotifierError> {
        let message = self.build_message(subscription, payload)?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }

        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(push_payload.content);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        match status {
            200..=299 => Ok(DeliveryOutcome::Accepted),
            404 | 410 => {
                tracing::info!(
                    endpoint = %subscription.short_endpoint(),
                    status,
                    "Subscription no longer valid"
                );
                Ok(DeliveryOutcome::Gone { status })
            }
            429 => {
                tracing::warn!(endpoint = %subscription.short_endpoint(), "Push service rate limited");
                Ok(DeliveryOutcome::Throttled)
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(NotifierError::Rejected { status, body })
            }
        }
    }
}
