//! Subscription registration routes.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use beacon_common::error::AppError;
use beacon_common::types::{PushSubscriptionRecord, RegisterOutcome};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/subscriptions", get(list_subscriptions))
        .route("/vapid-public-key", get(vapid_public_key))
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
    pub total_subscriptions: usize,
}

/// Debug view of a stored subscription; key material is never echoed.
#[derive(Debug, Serialize)]
pub struct SubscriptionSummary {
    pub endpoint: String,
    pub has_keys: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionListResponse {
    pub total: usize,
    pub subscriptions: Vec<SubscriptionSummary>,
}

#[derive(Debug, Serialize)]
pub struct VapidKeyResponse {
    pub public_key: String,
}

/// POST /subscribe — Store (or replace) a browser push subscription.
async fn subscribe(
    State(state): State<AppState>,
    payload: Result<Json<PushSubscriptionRecord>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let Json(record) = payload.map_err(|e| AppError::InvalidSubscription(e.body_text()))?;
    let endpoint = record.short_endpoint();

    let outcome = state.registry.register(record).await?;
    let message = match outcome {
        RegisterOutcome::Created => "Subscription received",
        RegisterOutcome::Replaced => "Subscription updated",
    };

    tracing::info!(endpoint = %endpoint, ?outcome, "Subscription registered");

    Ok(Json(SubscribeResponse {
        success: true,
        message: message.to_string(),
        total_subscriptions: state.registry.len().await,
    }))
}

/// GET /subscriptions — List stored subscriptions (debug only).
async fn list_subscriptions(State(state): State<AppState>) -> Json<SubscriptionListResponse> {
    let subscriptions: Vec<SubscriptionSummary> = state
        .registry
        .list()
        .await
        .iter()
        .map(|record| SubscriptionSummary {
            endpoint: record.short_endpoint(),
            has_keys: !record.keys.p256dh.is_empty() && !record.keys.auth.is_empty(),
        })
        .collect();

    Json(SubscriptionListResponse {
        total: subscriptions.len(),
        subscriptions,
    })
}

/// GET /vapid-public-key — Key the browser passes as `applicationServerKey`.
async fn vapid_public_key(State(state): State<AppState>) -> Json<VapidKeyResponse> {
    Json(VapidKeyResponse {
        public_key: state.vapid_public_key.clone(),
    })
}
