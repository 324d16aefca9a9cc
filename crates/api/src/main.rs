//! Beacon push server binary entrypoint.

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use beacon_common::config::AppConfig;
use beacon_engine::dispatch::DispatchService;
use beacon_engine::registry::SubscriptionRegistry;
use beacon_notifier::{VapidKeys, WebPushTransport};

use beacon_api::routes::create_router;
use beacon_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "beacon_api=debug,beacon_engine=debug,beacon_notifier=info,tower_http=debug",
            )
        }))
        .init();

    tracing::info!("Starting Beacon push server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Load VAPID keys; a bad key is fatal since no push could ever be signed
    let keys = VapidKeys::from_config(
        &config.vapid_private_key,
        config.vapid_public_key.as_deref(),
    )
    .map_err(|e| anyhow::anyhow!("Check VAPID_PRIVATE_KEY / VAPID_PUBLIC_KEY: {}", e))?;
    let public_key = keys.public_key_base64url().to_string();
    tracing::info!(
        vapid_public_key = %public_key,
        vapid_subject = %config.vapid_subject,
        "VAPID key loaded"
    );

    // Build application state
    let transport = WebPushTransport::new(keys, &config.vapid_subject, config.push_ttl_seconds);
    let registry = Arc::new(SubscriptionRegistry::new());
    let dispatcher = DispatchService::new(registry, Arc::new(transport));
    let state = AppState::new(dispatcher, public_key);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    tracing::info!("API server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    tracing::info!("Beacon push server stopped.");
    Ok(())
}
