//! `WhatsApp` Cloud API webhook handler
//!
//! `GET` answers the subscription handshake, `POST` receives message
//! deliveries and runs each message through the auto-responder.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::api::{auth::secrets_match, ApiState};
use crate::channels::WhatsAppWebhook;
use crate::engine::now_ms;

/// Subscription handshake query (`hub.*` parameters)
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Webhook response
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// Answer the webhook subscription handshake
pub async fn verify(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    let subscribed = params.mode.as_deref() == Some("subscribe")
        && params
            .verify_token
            .as_deref()
            .is_some_and(|token| secrets_match(token, state.verify_token.expose_secret()));

    if subscribed {
        tracing::info!("WhatsApp webhook verified");
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        tracing::warn!(mode = ?params.mode, "WhatsApp webhook verification failed");
        (StatusCode::FORBIDDEN, "Forbidden".to_string())
    }
}

/// Handle a `WhatsApp` message delivery
///
/// Messages are processed one after another in delivery order. Delivery
/// failures are logged and do not fail the webhook, so the provider does
/// not redeliver and trigger a second reply. A body that does not parse is
/// treated as a delivery without messages.
pub async fn handle_webhook(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let payload = match WhatsAppWebhook::parse(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "unreadable WhatsApp webhook body");
            return (StatusCode::OK, Json(WebhookResponse { status: "success" }));
        }
    };

    if !payload.is_business_account() {
        tracing::debug!(object = ?payload.object, "ignoring non-WhatsApp webhook object");
        return (StatusCode::OK, Json(WebhookResponse { status: "success" }));
    }

    for event in payload.inbound_events(&state.owner, now_ms()) {
        tracing::info!(
            conversation = %event.message.conversation_key,
            from = %event.sender_name,
            text = ?event.message.text_body,
            "WhatsApp message received"
        );

        match state.responder.handle(&event.message).await {
            Ok(action) => {
                tracing::debug!(
                    conversation = %event.message.conversation_key,
                    %action,
                    "WhatsApp message processed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    conversation = %event.message.conversation_key,
                    error = %e,
                    "WhatsApp message processing failed"
                );
            }
        }
    }

    (StatusCode::OK, Json(WebhookResponse { status: "success" }))
}
