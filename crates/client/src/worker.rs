//! Service worker notification handler.
//!
//! Lifecycle: `Installing → Active → HandlingPush → Active`. The platform
//! delivers callbacks as [`WorkerEvent`]s which are processed one at a time;
//! eviction of the worker is outside this module's control.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use url::Url;

use beacon_common::types::NotificationPayload;

/// Title used when a push carries no structured payload.
pub const DEFAULT_TITLE: &str = "New Notification";

/// Path opened when a click finds no window to focus.
const ROOT_PATH: &str = "/";

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker is not active (state: {0:?})")]
    NotActive(WorkerState),

    #[error("Invalid worker origin: {0}")]
    InvalidOrigin(String),

    #[error("Host error: {0}")]
    Host(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Active,
    HandlingPush,
}

/// A notification the user clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationClick {
    pub tag: String,
    pub data: Option<serde_json::Value>,
}

/// Callbacks the platform delivers to the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Install,
    Activate,
    /// Raw (already decrypted) push message data, if any.
    Push(Option<Vec<u8>>),
    NotificationClick(NotificationClick),
}

/// What the worker asks the OS to display.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    /// Unique per push so consecutive notifications do not replace each other.
    pub tag: String,
    pub renotify: bool,
    pub data: Option<serde_json::Value>,
}

/// An open page controlled by this worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: String,
    pub url: String,
}

/// Platform services available inside the worker.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    async fn show_notification(&self, request: NotificationRequest) -> Result<(), WorkerError>;

    async fn close_notification(&self, tag: &str) -> Result<(), WorkerError>;

    /// Window clients, including ones not yet controlled by this worker.
    async fn window_clients(&self) -> Result<Vec<ClientWindow>, WorkerError>;

    async fn focus(&self, client_id: &str) -> Result<(), WorkerError>;

    async fn open_window(&self, url: &str) -> Result<(), WorkerError>;
}

pub struct ServiceWorker<H> {
    host: H,
    origin: Url,
    state: WorkerState,
    sequence: u64,
}

impl<H: WorkerHost> ServiceWorker<H> {
    /// `origin` is the scope origin the worker was registered under.
    pub fn new(host: H, origin: &str) -> Result<Self, WorkerError> {
        let origin = Url::parse(origin).map_err(|e| WorkerError::InvalidOrigin(e.to_string()))?;
        Ok(Self {
            host,
            origin,
            state: WorkerState::Installing,
            sequence: 0,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Process one platform callback to completion.
    pub async fn handle(&mut self, event: WorkerEvent) -> Result<(), WorkerError> {
        match event {
            WorkerEvent::Install => {
                tracing::debug!("Service worker installing");
                Ok(())
            }
            WorkerEvent::Activate => {
                self.state = WorkerState::Active;
                tracing::debug!("Service worker activated");
                Ok(())
            }
            WorkerEvent::Push(data) => {
                self.ensure_active()?;
                self.state = WorkerState::HandlingPush;
                let result = self.on_push(data).await;
                self.state = WorkerState::Active;
                result
            }
            WorkerEvent::NotificationClick(click) => {
                self.ensure_active()?;
                self.on_notification_click(click).await
            }
        }
    }

    fn ensure_active(&self) -> Result<(), WorkerError> {
        if self.state == WorkerState::Installing {
            return Err(WorkerError::NotActive(self.state));
        }
        Ok(())
    }

    async fn on_push(&mut self, data: Option<Vec<u8>>) -> Result<(), WorkerError> {
        let payload = parse_push_data(data.as_deref());

        self.sequence += 1;
        let tag = format!(
            "notification-{}-{}",
            Utc::now().timestamp_millis(),
            self.sequence
        );

        tracing::debug!(tag = %tag, title = %payload.title, "Showing push notification");

        self.host
            .show_notification(NotificationRequest {
                title: payload.title,
                body: payload.body,
                icon: payload.icon,
                tag,
                renotify: true,
                data: payload.data,
            })
            .await
    }

    async fn on_notification_click(&self, click: NotificationClick) -> Result<(), WorkerError> {
        self.host.close_notification(&click.tag).await?;

        let clients = self.host.window_clients().await?;
        let same_origin = clients.iter().find(|client| {
            Url::parse(&client.url)
                .map(|url| url.origin() == self.origin.origin())
                .unwrap_or(false)
        });

        match same_origin {
            Some(client) => {
                tracing::debug!(client_id = %client.id, "Focusing existing window");
                self.host.focus(&client.id).await
            }
            None => {
                tracing::debug!("No open window, opening a new one");
                self.host.open_window(ROOT_PATH).await
            }
        }
    }
}

/// Parse push data as a JSON payload, falling back to plain text.
fn parse_push_data(data: Option<&[u8]>) -> NotificationPayload {
    let Some(bytes) = data else {
        return NotificationPayload::new(DEFAULT_TITLE, "");
    };

    match serde_json::from_slice::<NotificationPayload>(bytes) {
        Ok(mut payload) => {
            if payload.title.trim().is_empty() {
                payload.title = DEFAULT_TITLE.to_string();
            }
            payload
        }
        Err(_) => NotificationPayload::new(DEFAULT_TITLE, String::from_utf8_lossy(bytes)),
    }
}
