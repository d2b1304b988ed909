//! Autoresponder Gateway - automatic replies for a `WhatsApp` account
//!
//! Watches incoming messages and sends one canned reply per conversation,
//! with per-conversation spam control, until the owner steps in. Owner
//! activity silences the bot in that conversation for a reactivation window.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │     Webhook (axum)   │   Admin API   │   Console     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ InboundMessage
//! ┌────────────────────▼────────────────────────────────┐
//! │                 ResponseEngine                       │
//! │  ReactivationPolicy │ SpamGuard │ ConversationStore  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ SendEffect
//! ┌────────────────────▼────────────────────────────────┐
//! │        AutoResponder -> WhatsApp Cloud API           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod channels;
pub mod config;
pub mod console;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod responder;

pub use config::{Config, ResponderConfig, ResponderUpdate};
pub use daemon::Daemon;
pub use engine::{
    Action, Conversation, ConversationStore, Decision, InboundMessage, ReactivationPolicy,
    ResponseEngine, SendEffect, SpamGuard, StatusSnapshot,
};
pub use error::{Error, Result};
pub use responder::AutoResponder;
