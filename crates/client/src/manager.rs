//! Client subscription manager.
//!
//! Obtains a push subscription from the platform and forwards it to the
//! Beacon server. Nothing here retries: every failure is returned to the
//! caller to show as status text.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use serde::Deserialize;
use url::Url;

use beacon_common::types::PushSubscriptionRecord;

use crate::ClientError;
use crate::platform::{Permission, PushPlatform};

#[derive(Debug, Deserialize)]
struct VapidKeyResponse {
    public_key: String,
}

/// Drives permission, subscription and server registration for one client.
#[derive(Debug)]
pub struct SubscriptionManager<P> {
    platform: P,
    http: reqwest::Client,
    server_url: Url,
}

impl<P: PushPlatform> SubscriptionManager<P> {
    /// `server_url` is the Beacon server base, e.g. `http://localhost:5001`.
    pub fn new(platform: P, server_url: &str) -> Result<Self, ClientError> {
        let mut server_url =
            Url::parse(server_url).map_err(|e| ClientError::InvalidServerUrl(e.to_string()))?;
        // Url::join replaces the last path segment unless the base ends in '/'
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }

        Ok(Self {
            platform,
            http: reqwest::Client::new(),
            server_url,
        })
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Prompt the user for notification permission.
    pub async fn request_permission(&self) -> Permission {
        let permission = self.platform.request_permission().await;
        tracing::debug!(?permission, "Notification permission answered");
        permission
    }

    /// Return the active subscription, creating one if needed.
    ///
    /// Calling this repeatedly without `unsubscribe()` in between returns the
    /// same subscription; the platform is only asked to create one once.
    pub async fn subscribe(
        &self,
        vapid_public_key: &str,
    ) -> Result<PushSubscriptionRecord, ClientError> {
        if !self.platform.supports_push() {
            return Err(ClientError::NotSupported);
        }

        let application_server_key = decode_application_server_key(vapid_public_key)?;

        if let Some(existing) = self.platform.get_subscription().await? {
            tracing::debug!("Reusing existing push subscription");
            return existing.into_record();
        }

        if self.platform.permission() != Permission::Granted
            && self.request_permission().await != Permission::Granted
        {
            return Err(ClientError::PermissionDenied);
        }

        let record = self
            .platform
            .subscribe(&application_server_key)
            .await?
            .into_record()?;

        tracing::info!(endpoint = %record.short_endpoint(), "Push subscription created");
        Ok(record)
    }

    /// Cancel the active subscription. Returns whether one existed.
    pub async fn unsubscribe(&self) -> Result<bool, ClientError> {
        let Some(existing) = self.platform.get_subscription().await? else {
            return Ok(false);
        };
        let Some(endpoint) = existing.endpoint.filter(|e| !e.trim().is_empty()) else {
            return Err(ClientError::InvalidSubscriptionData(
                "active subscription has no endpoint".to_string(),
            ));
        };

        let removed = self.platform.unsubscribe(&endpoint).await?;
        if removed {
            tracing::info!("Push subscription cancelled");
        }
        Ok(removed)
    }

    /// Forward `record` to the server's `/subscribe` endpoint.
    pub async fn send_to_server(&self, record: &PushSubscriptionRecord) -> Result<(), ClientError> {
        let url = self.endpoint("subscribe")?;

        let response = self
            .http
            .post(url)
            .json(record)
            .send()
            .await
            .map_err(|e| ClientError::ServerUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::ServerUnreachable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        tracing::info!(endpoint = %record.short_endpoint(), "Subscription sent to server");
        Ok(())
    }

    /// Fetch the server's VAPID public key.
    pub async fn fetch_vapid_public_key(&self) -> Result<String, ClientError> {
        let url = self.endpoint("vapid-public-key")?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ClientError::ServerUnreachable(e.to_string()))?;

        let body: VapidKeyResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ServerUnreachable(e.to_string()))?;
        Ok(body.public_key)
    }

    /// Full client flow: fetch the server key, subscribe, register with the server.
    pub async fn register(&self) -> Result<PushSubscriptionRecord, ClientError> {
        let vapid_public_key = self.fetch_vapid_public_key().await?;
        let record = self.subscribe(&vapid_public_key).await?;
        self.send_to_server(&record).await?;
        Ok(record)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.server_url
            .join(path)
            .map_err(|e| ClientError::InvalidServerUrl(e.to_string()))
    }
}

/// Decode a base64url VAPID key into the uncompressed P-256 point browsers expect.
fn decode_application_server_key(key: &str) -> Result<Vec<u8>, ClientError> {
    let bytes = BASE64URL
        .decode(key.trim().trim_end_matches('='))
        .map_err(|e| ClientError::InvalidVapidKey(e.to_string()))?;

    if bytes.len() != 65 || bytes[0] != 0x04 {
        return Err(ClientError::InvalidVapidKey(format!(
            "expected 65-byte uncompressed P-256 point, got {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes)
}
