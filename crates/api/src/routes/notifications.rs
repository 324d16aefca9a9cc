//! Notification dispatch routes.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use beacon_common::error::AppError;
use beacon_common::types::{DispatchReport, NotificationPayload};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/test-notification", post(test_notification))
        .route("/send-notification", post(send_notification))
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub report: DispatchReport,
}

impl From<DispatchReport> for DispatchResponse {
    fn from(report: DispatchReport) -> Self {
        Self {
            success: true,
            message: report.message(),
            report,
        }
    }
}

/// POST /test-notification — Send the fixed test notification to all subscribers.
async fn test_notification(
    State(state): State<AppState>,
) -> Result<Json<DispatchResponse>, AppError> {
    let report = state.dispatcher.send_test_notification().await?;
    Ok(Json(report.into()))
}

/// POST /send-notification — Send a custom `{title, body, icon?, data?}` notification.
async fn send_notification(
    State(state): State<AppState>,
    payload: Result<Json<NotificationPayload>, JsonRejection>,
) -> Result<Json<DispatchResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidPayload(e.body_text()))?;
    let report = state.dispatcher.send_to_all(&payload).await?;
    Ok(Json(report.into()))
}
