//! Platform push capabilities.

use async_trait::async_trait;

use beacon_common::types::PushSubscriptionRecord;

use crate::ClientError;

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The user dismissed the prompt without choosing.
    Default,
}

/// Subscription object as handed back by the platform.
///
/// Fields are optional because platforms have been seen returning partial
/// objects; [`PlatformSubscription::into_record`] enforces completeness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSubscription {
    pub endpoint: Option<String>,
    pub p256dh: Option<String>,
    pub auth: Option<String>,
    pub expiration_time: Option<i64>,
}

impl PlatformSubscription {
    pub fn into_record(self) -> Result<PushSubscriptionRecord, ClientError> {
        let endpoint = non_empty(self.endpoint, "endpoint")?;
        let p256dh = non_empty(self.p256dh, "p256dh")?;
        let auth = non_empty(self.auth, "auth")?;

        let mut record = PushSubscriptionRecord::new(endpoint, p256dh, auth);
        record.expiration_time = self.expiration_time;
        Ok(record)
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, ClientError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ClientError::InvalidSubscriptionData(format!("missing {}", field)))
}

/// Permission and push registration facilities of the host platform.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Whether the platform has a push manager at all.
    fn supports_push(&self) -> bool;

    /// Current permission without prompting.
    fn permission(&self) -> Permission;

    /// Show the permission prompt; resolves when the user answers or dismisses it.
    async fn request_permission(&self) -> Permission;

    /// The active subscription, if any.
    async fn get_subscription(&self) -> Result<Option<PlatformSubscription>, ClientError>;

    /// Create a subscription bound to `application_server_key` (uncompressed P-256 point).
    async fn subscribe(
        &self,
        application_server_key: &[u8],
    ) -> Result<PlatformSubscription, ClientError>;

    /// Cancel the subscription for `endpoint`. Returns whether it was active.
    async fn unsubscribe(&self, endpoint: &str) -> Result<bool, ClientError>;
}
