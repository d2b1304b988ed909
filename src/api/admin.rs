//! Admin API endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{auth::require_api_key, health::ConfigResponse, ApiState};
use crate::config::ResponderUpdate;
use crate::engine::{now_ms, StatusSnapshot};

// --- Request/Response types ---

#[derive(Serialize)]
pub struct ToggleResponse {
    pub active: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub cleared: bool,
    pub tracked_conversations: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerActivityResponse {
    pub conversation: String,
    pub last_owner_activity_at: Option<i64>,
}

/// Partial settings update; absent fields keep their current value
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    pub message: Option<String>,
    pub spam_limit: Option<u32>,
    pub spam_time_window: Option<u64>,
    pub reactivation_minutes: Option<u64>,
}

impl UpdateConfigRequest {
    fn into_update(self) -> ResponderUpdate {
        ResponderUpdate {
            auto_response_message: self.message,
            spam_limit: self.spam_limit,
            spam_time_window_ms: self.spam_time_window,
            reactivation_time_ms: self
                .reactivation_minutes
                .map(|minutes| minutes.saturating_mul(60_000)),
        }
    }
}

#[derive(Serialize)]
pub struct UpdateConfigResponse {
    pub success: bool,
    pub config: ConfigResponse,
    pub updated: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

fn error_response(code: &str, message: &str) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    })
}

// --- Handlers ---

/// Enable or disable automatic replies
async fn toggle(State(state): State<Arc<ApiState>>) -> Json<ToggleResponse> {
    Json(ToggleResponse {
        active: state.engine.toggle_active(),
    })
}

/// Forget all responded conversations
async fn clear(State(state): State<Arc<ApiState>>) -> Json<ClearResponse> {
    state.engine.clear_all_conversation_state();

    Json(ClearResponse {
        cleared: true,
        tracked_conversations: state.engine.status_snapshot().tracked_conversations,
    })
}

/// Active flag and tracked conversation count
async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusSnapshot> {
    Json(state.engine.status_snapshot())
}

/// Record that the owner wrote into a conversation
async fn owner_activity(
    State(state): State<Arc<ApiState>>,
    Path(key): Path<String>,
) -> Json<OwnerActivityResponse> {
    state.engine.record_owner_activity(&key, now_ms());

    let last_owner_activity_at = state
        .engine
        .conversation(&key)
        .and_then(|c| c.last_owner_activity_at);

    Json(OwnerActivityResponse {
        conversation: key,
        last_owner_activity_at,
    })
}

/// Current responder settings
async fn get_config(State(state): State<Arc<ApiState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse::new(
        state.engine.settings(),
        state.webhook_configured,
    ))
}

/// Update responder settings
async fn update_config(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<UpdateConfigRequest>,
) -> Result<Json<UpdateConfigResponse>, (StatusCode, Json<ErrorResponse>)> {
    let updated = state
        .engine
        .reconfigure(&req.into_update())
        .map_err(|e| (StatusCode::BAD_REQUEST, error_response("invalid_config", &e.to_string())))?;

    Ok(Json(UpdateConfigResponse {
        success: true,
        config: ConfigResponse::new(updated, state.webhook_configured),
        updated: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Build admin router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/toggle", post(toggle))
        .route("/clear", post(clear))
        .route("/status", get(status))
        .route("/conversations/{key}/owner-activity", post(owner_activity))
        .route("/config", get(get_config).put(update_config))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}
