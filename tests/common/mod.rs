//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use autoresponder_gateway::api::{ApiServer, ApiServerBuilder};
use autoresponder_gateway::channels::{MessageSender, OwnerIdentity};
use autoresponder_gateway::{AutoResponder, Error, ResponderConfig, ResponseEngine, Result};
use secrecy::SecretString;

/// Owner number used across tests
pub const OWNER: &str = "5511900000000";

/// Admin API key used across tests
pub const API_KEY: &str = "test-api-key";

/// Webhook verification token used across tests
pub const VERIFY_TOKEN: &str = "test-verify-token";

/// Message sender that records deliveries instead of calling a provider
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSender {
    /// A sender whose every delivery fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Recorded `(recipient, body)` pairs
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, recipient_id: &str, body: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Channel("provider unavailable".to_string()));
        }

        self.sent
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), body.to_string()));
        Ok(())
    }
}

/// Settings matching the documented defaults
pub fn default_settings() -> ResponderConfig {
    ResponderConfig::default()
}

/// Create an engine with default settings
pub fn engine() -> Arc<ResponseEngine> {
    Arc::new(ResponseEngine::new(default_settings()).expect("default settings are valid"))
}

/// Create a responder over a fresh engine
pub fn responder(sender: Arc<RecordingSender>) -> AutoResponder {
    AutoResponder::new(engine(), sender)
}

/// API server builder with a recording sender, owner, verify token and API key
pub fn api_builder(sender: Arc<RecordingSender>) -> ApiServerBuilder {
    ApiServerBuilder::new(responder(sender), 0)
        .owner(OwnerIdentity::new(Some(OWNER)))
        .verify_token(SecretString::from(VERIFY_TOKEN))
        .api_key(Some(SecretString::from(API_KEY)))
        .webhook_configured(true)
}

/// Build the default test API server
pub fn api_server(sender: Arc<RecordingSender>) -> ApiServer {
    api_builder(sender).build()
}
