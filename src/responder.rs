//! Auto-reply dispatch
//!
//! Runs the decision engine and performs the resulting send. Conversation
//! state is committed before the send starts, so a failed or interrupted
//! delivery never causes a second reply (at most once).

use std::sync::Arc;

use crate::channels::MessageSender;
use crate::engine::{Action, InboundMessage, ResponseEngine};
use crate::{Error, Result};

/// Engine plus the delivery channel it replies through
#[derive(Clone)]
pub struct AutoResponder {
    engine: Arc<ResponseEngine>,
    sender: Arc<dyn MessageSender>,
}

impl AutoResponder {
    /// Create a responder
    #[must_use]
    pub fn new(engine: Arc<ResponseEngine>, sender: Arc<dyn MessageSender>) -> Self {
        Self { engine, sender }
    }

    /// Shared decision engine
    #[must_use]
    pub const fn engine(&self) -> &Arc<ResponseEngine> {
        &self.engine
    }

    /// Process one inbound message, sending the automatic reply if due
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] if the reply could not be sent. The
    /// conversation stays marked as responded and nothing is retried.
    pub async fn handle(&self, message: &InboundMessage) -> Result<Action> {
        let decision = self.engine.decide(message);

        let Some(effect) = decision.effect else {
            return Ok(decision.action);
        };

        match self.sender.send(&effect.recipient_id, &effect.body).await {
            Ok(()) => {
                tracing::info!(
                    channel = self.sender.name(),
                    conversation = %effect.conversation_key,
                    recipient = %effect.recipient_id,
                    "automatic reply sent"
                );
                Ok(decision.action)
            }
            Err(e) => {
                tracing::error!(
                    channel = self.sender.name(),
                    conversation = %effect.conversation_key,
                    error = %e,
                    "failed to send automatic reply"
                );
                Err(Error::Delivery(format!("{}: {e}", effect.recipient_id)))
            }
        }
    }
}
