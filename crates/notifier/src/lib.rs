//! Web push delivery for Beacon.
//!
//! Turns a notification body into an encrypted (RFC 8291), VAPID-signed
//! (RFC 8292) push message and hands it to the subscriber's push service.
//!
//! ```text
//! DispatchService fan-out
//!     ↓
//! PushTransport::send (one call per subscription)
//!     ↓
//! Browser push service (FCM, Mozilla autopush, APNs web)
//!     ↓
//! Service worker `push` event
//! ```
//!
//! The `PushTransport` trait is the seam the dispatch service talks to;
//! `WebPushTransport` is the production implementation.

pub mod transport;
pub mod vapid;

use thiserror::Error;

/// Largest plaintext body `web-push` will encrypt into a single message.
pub const MAX_PAYLOAD_BYTES: usize = 3070;

pub use transport::{DeliveryOutcome, PushTransport, WebPushTransport};
pub use vapid::VapidKeys;

/// Errors raised while preparing or delivering a push message.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("VAPID key error: {0}")]
    Vapid(String),

    #[error("Failed to build push message: {0}")]
    Message(#[from] web_push::WebPushError),

    #[error("Push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push service rejected message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}
