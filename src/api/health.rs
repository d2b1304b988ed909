//! Health, status and read-only configuration endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::ApiState;
use crate::config::ResponderConfig;

/// Bot name reported by the status endpoint
const BOT_NAME: &str = "WhatsApp Auto Responder";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Status response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub bot: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub tracked_conversations: usize,
    pub endpoints: Endpoints,
}

/// Public endpoint map
#[derive(Serialize)]
pub struct Endpoints {
    pub webhook: &'static str,
    pub status: &'static str,
    pub config: &'static str,
}

/// Current responder settings
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub auto_response_message: String,
    pub spam_limit: u32,
    pub spam_time_window: u64,
    pub reactivation_time: u64,
    pub webhook_configured: bool,
}

impl ConfigResponse {
    /// Settings plus whether outbound delivery credentials are configured
    #[must_use]
    pub fn new(config: ResponderConfig, webhook_configured: bool) -> Self {
        Self {
            auto_response_message: config.auto_response_message,
            spam_limit: config.spam_limit,
            spam_time_window: config.spam_time_window_ms,
            reactivation_time: config.reactivation_time_ms,
            webhook_configured,
        }
    }
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Bot status
async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let snapshot = state.engine.status_snapshot();

    Json(StatusResponse {
        bot: BOT_NAME,
        status: if snapshot.active { "active" } else { "inactive" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tracked_conversations: snapshot.tracked_conversations,
        endpoints: Endpoints {
            webhook: "/api/webhooks/whatsapp",
            status: "/api/status",
            config: "/api/config",
        },
    })
}

/// Current responder settings
async fn config(State(state): State<Arc<ApiState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse::new(
        state.engine.settings(),
        state.webhook_configured,
    ))
}

/// Build the liveness router
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build the status and config router
pub fn status_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/config", get(config))
        .with_state(state)
}
