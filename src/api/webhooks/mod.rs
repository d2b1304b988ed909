//! Webhook endpoints for channel integrations

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use super::{rate_limit::limit_webhook_callers, ApiState};

pub mod whatsapp;

/// Build webhooks router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/whatsapp",
            get(whatsapp::verify).post(whatsapp::handle_webhook),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_webhook_callers,
        ))
        .with_state(state)
}
