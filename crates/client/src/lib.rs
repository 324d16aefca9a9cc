//! Browser-side half of Beacon.
//!
//! The platform's permission prompt, push registration and notification
//! surface are reached through the [`platform::PushPlatform`] and
//! [`worker::WorkerHost`] traits so the logic here can run against any
//! binding (a wasm shim, a test double).
//!
//! - [`manager::SubscriptionManager`] obtains a subscription and forwards it
//!   to the server.
//! - [`worker::ServiceWorker`] turns push events into notifications and
//!   handles clicks.

pub mod manager;
pub mod platform;
pub mod worker;

use thiserror::Error;

/// Errors surfaced to the user by the subscription manager.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Push notifications are not supported on this platform")]
    NotSupported,

    #[error("Notification permission was not granted")]
    PermissionDenied,

    #[error("Platform returned an incomplete subscription: {0}")]
    InvalidSubscriptionData(String),

    #[error("Invalid VAPID public key: {0}")]
    InvalidVapidKey(String),

    #[error("Invalid server URL: {0}")]
    InvalidServerUrl(String),

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}
