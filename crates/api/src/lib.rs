//! Beacon HTTP API.
//!
//! Endpoints:
//! - POST /subscribe — Register a browser push subscription
//! - GET  /subscriptions — Debug listing of stored subscriptions
//! - POST /test-notification — Push a fixed test notification to everyone
//! - POST /send-notification — Push a custom notification to everyone
//! - GET  /vapid-public-key — Application server key for `pushManager.subscribe`
//! - GET  /health — Liveness

pub mod routes;
pub mod state;
