//! uninews-gateway: REST boundary for reminder management.
//!
//! Provides:
//! - Reminder CRUD under `/channel/{channel_id}/reminder`
//! - Bearer token authentication
//! - HTTP health check endpoint
//!
//! The gateway owns all mutation of reminder records: it validates,
//! stamps timestamps, and initializes the recurrence cursor before
//! anything reaches the store. The scheduler only ever sees records
//! that already carry a cursor.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use tracing::info;

use uninews_config::UniNewsConfig;
use uninews_store::ReminderStore;

use handlers::ApiError;

/// Shared gateway state.
pub struct GatewayState {
    pub store: Arc<ReminderStore>,
    pub tz: chrono_tz::Tz,
    pub auth_token: Option<String>,
}

/// Build the gateway router.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/channel/{channel_id}/reminder",
            post(handlers::create_reminder).get(handlers::list_reminders),
        )
        .route(
            "/channel/{channel_id}/reminder/{reminder_id}",
            get(handlers::get_reminder)
                .patch(handlers::patch_reminder)
                .delete(handlers::delete_reminder),
        )
        .with_state(state)
}

/// Start the gateway server.
///
/// Binds to the configured address and serves requests until the process
/// is shut down.
pub async fn start_gateway(
    config: &UniNewsConfig,
    store: Arc<ReminderStore>,
    port_override: Option<u16>,
) -> anyhow::Result<()> {
    let port = port_override.unwrap_or(config.server.port);
    let host = config.server.host.clone();
    let tz = config.time_zone()?;

    let state = Arc::new(GatewayState {
        store,
        tz,
        auth_token: config.server.auth_token.clone(),
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Gateway listening on {addr}");
    info!("  Reminders: http://{addr}/channel/{{channel_id}}/reminder");
    info!("  Health:    http://{addr}/health");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Check the request against the configured bearer token, if any.
pub(crate) fn authorize(state: &GatewayState, headers: &HeaderMap) -> Result<(), ApiError> {
    if let Some(expected) = &state.auth_token {
        match extract_bearer_token(headers) {
            Some(provided) if provided == expected => Ok(()),
            _ => {
                tracing::warn!("Request authentication failed");
                Err(ApiError::Unauthorized)
            }
        }
    } else {
        Ok(())
    }
}

/// Extract bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
