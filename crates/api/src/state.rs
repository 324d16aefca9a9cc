//! Shared application state for the Axum API server.

use std::sync::Arc;

use beacon_engine::dispatch::DispatchService;
use beacon_engine::registry::SubscriptionRegistry;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriptionRegistry>,
    pub dispatcher: Arc<DispatchService>,
    /// Base64url VAPID public key handed to browsers
    pub vapid_public_key: String,
}

impl AppState {
    pub fn new(dispatcher: DispatchService, vapid_public_key: String) -> Self {
        Self {
            registry: dispatcher.registry().clone(),
            dispatcher: Arc::new(dispatcher),
            vapid_public_key,
        }
    }
}
