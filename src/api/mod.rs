//! HTTP API server for the autoresponder gateway

pub mod admin;
pub(crate) mod auth;
pub mod health;
pub mod rate_limit;
pub mod webhooks;

use std::future::Future;
use std::sync::Arc;

use std::net::SocketAddr;

use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::channels::OwnerIdentity;
use crate::config::DEFAULT_VERIFY_TOKEN;
use crate::engine::ResponseEngine;
use crate::responder::AutoResponder;
use crate::Result;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub responder: AutoResponder,
    pub engine: Arc<ResponseEngine>,
    pub owner: OwnerIdentity,
    pub verify_token: SecretString,
    pub api_key: Option<SecretString>,
    /// Whether outbound `WhatsApp` credentials are configured
    pub webhook_configured: bool,
    pub webhook_limiter: Option<rate_limit::SharedLimiter>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    responder: AutoResponder,
    port: u16,
    owner: OwnerIdentity,
    verify_token: SecretString,
    api_key: Option<SecretString>,
    webhook_configured: bool,
    webhook_deliveries_per_minute: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(responder: AutoResponder, port: u16) -> Self {
        Self {
            responder,
            port,
            owner: OwnerIdentity::default(),
            verify_token: SecretString::from(DEFAULT_VERIFY_TOKEN),
            api_key: None,
            webhook_configured: false,
            webhook_deliveries_per_minute: None,
        }
    }

    /// Set the owner identity used to classify webhook senders
    #[must_use]
    pub fn owner(mut self, owner: OwnerIdentity) -> Self {
        self.owner = owner;
        self
    }

    /// Set the webhook verification token
    #[must_use]
    pub fn verify_token(mut self, token: SecretString) -> Self {
        self.verify_token = token;
        self
    }

    /// Set the API key for admin endpoints
    #[must_use]
    pub fn api_key(mut self, key: Option<SecretString>) -> Self {
        self.api_key = key;
        self
    }

    /// Report whether outbound delivery credentials are configured
    #[must_use]
    pub const fn webhook_configured(mut self, configured: bool) -> Self {
        self.webhook_configured = configured;
        self
    }

    /// Limit webhook deliveries per caller
    #[must_use]
    pub const fn webhook_limit(mut self, deliveries_per_minute: Option<u32>) -> Self {
        self.webhook_deliveries_per_minute = deliveries_per_minute;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let engine = Arc::clone(self.responder.engine());
        let webhook_limiter = self
            .webhook_deliveries_per_minute
            .map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            responder: self.responder,
            engine,
            owner: self.owner,
            verify_token: self.verify_token,
            api_key: self.api_key,
            webhook_configured: self.webhook_configured,
            webhook_limiter,
        });

        ApiServer {
            state,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .nest("/api/admin", admin::router(self.state.clone()))
            .nest("/api/webhooks", webhooks::router(self.state.clone()))
            .merge(health::router())
            .merge(health::status_router(self.state.clone()));

        // Webhook and status endpoints accept any origin
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Webhook caller limiter, if configured
    #[must_use]
    pub fn webhook_limiter(&self) -> Option<rate_limit::SharedLimiter> {
        self.state.webhook_limiter.clone()
    }

    /// Run the API server until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(port = self.port, "API server listening");

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn<F>(self, shutdown: F) -> tokio::task::JoinHandle<Result<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move { self.run_until(shutdown).await })
    }
}
