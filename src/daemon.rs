//! Daemon - the main gateway service
//!
//! Wires the decision engine to the `WhatsApp` channel, the HTTP API and the
//! operator console, and runs until a shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::api::rate_limit::{forget_idle_callers, SharedLimiter};
use crate::api::ApiServerBuilder;
use crate::channels::{MessageSender, OwnerIdentity, WhatsAppChannel};
use crate::engine::{now_ms, ResponseEngine};
use crate::responder::AutoResponder;
use crate::{Config, Error, Result};

/// Lower bound for the idle-window pruning interval
const MIN_PRUNE_INTERVAL: Duration = Duration::from_secs(1);

/// The gateway daemon
pub struct Daemon {
    config: Config,
    engine: Arc<ResponseEngine>,
    sender: Arc<dyn MessageSender>,
    console: bool,
}

impl Daemon {
    /// Create a daemon delivering through the `WhatsApp` Cloud API
    ///
    /// # Errors
    ///
    /// Returns error if thresholds are invalid or `WhatsApp` credentials are missing
    pub fn new(config: Config) -> Result<Self> {
        let channel = WhatsAppChannel::from_config(&config.whatsapp)?;
        Self::with_sender(config, Arc::new(channel))
    }

    /// Create a daemon delivering through `sender`
    ///
    /// # Errors
    ///
    /// Returns error if thresholds are invalid
    pub fn with_sender(config: Config, sender: Arc<dyn MessageSender>) -> Result<Self> {
        let engine = Arc::new(ResponseEngine::new(config.responder.clone())?);

        Ok(Self {
            config,
            engine,
            sender,
            console: true,
        })
    }

    /// Enable or disable the stdin console
    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Shared decision engine
    #[must_use]
    pub const fn engine(&self) -> &Arc<ResponseEngine> {
        &self.engine
    }

    /// Run until ctrl-c, SIGTERM or the console `stop` command
    ///
    /// # Errors
    ///
    /// Returns error if the API server fails
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (stop_tx, stop_rx) = watch::channel(false);

        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            let _ = signal_tx.send(()).await;
        });

        if self.console {
            tokio::spawn(crate::console::run(Arc::clone(&self.engine), shutdown_tx.clone()));
        }

        let responder = AutoResponder::new(Arc::clone(&self.engine), Arc::clone(&self.sender));
        let api_server = ApiServerBuilder::new(responder, self.config.server.port)
            .owner(OwnerIdentity::new(self.config.whatsapp.owner_number.as_deref()))
            .verify_token(self.config.whatsapp.verify_token.clone())
            .api_key(self.config.server.api_key.clone())
            .webhook_configured(self.config.whatsapp.is_configured())
            .webhook_limit(self.config.server.webhook_deliveries_per_minute)
            .build();

        self.spawn_pruning(api_server.webhook_limiter(), stop_rx.clone());

        let mut server_stop = stop_rx;
        let mut api_handle = api_server.spawn(async move {
            let _ = server_stop.changed().await;
        });

        tracing::info!(
            channel = self.sender.name(),
            owner_configured = self.config.whatsapp.owner_number.is_some(),
            "autoresponder running"
        );

        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown requested");
            }
            result = &mut api_handle => {
                let _ = stop_tx.send(true);
                return match result {
                    Ok(result) => result,
                    Err(e) => Err(Error::Io(std::io::Error::other(e))),
                };
            }
        }

        let _ = stop_tx.send(true);
        match api_handle.await {
            Ok(result) => result?,
            Err(e) => tracing::warn!(error = %e, "API server task did not shut down cleanly"),
        }

        tracing::info!("autoresponder stopped");
        Ok(())
    }

    /// Periodically drop spam windows and caller budgets that can no longer
    /// affect a decision
    fn spawn_pruning(
        &self,
        webhook_limiter: Option<SharedLimiter>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let engine = Arc::clone(&self.engine);
        let period = Duration::from_millis(self.config.responder.spam_time_window_ms)
            .max(MIN_PRUNE_INTERVAL);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => return,
                    _ = interval.tick() => {
                        let pruned = engine.prune(now_ms());
                        if pruned > 0 {
                            tracing::debug!(pruned, "pruned idle spam windows");
                        }
                        if let Some(ref limiter) = webhook_limiter {
                            forget_idle_callers(limiter);
                        }
                    }
                }
            }
        });
    }
}

/// Resolve on ctrl-c or, on Unix, SIGTERM
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
