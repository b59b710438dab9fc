//! Startup orchestration.
//!
//! # Responsibilities
//! - Load (or generate) the RSA key pair
//! - Build the shared ReceiverContext
//! - Bind the listener and spawn its accept loop
//!
//! # Design Decisions
//! - Fail fast: key and bind errors are returned, never retried
//! - The listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::ReceiverConfig;
use crate::context::ReceiverContext;
use crate::crypto::{keys, CryptoProvider, KeyError, RsaDecryptor};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::notify::Notifier;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to prepare RSA keys: {0}")]
    Keys(#[from] KeyError),

    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("key loading task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StartupError {
    /// Operator advice for errors that have a usual cause.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            StartupError::Bind(_) => Some(
                "Verify that the configured address and port are not already in use; \
                 hosting providers often restrict which ports can be bound",
            ),
            StartupError::Keys(_) | StartupError::Join(_) => None,
        }
    }
}

/// A receiver whose accept loop is running in the background.
#[derive(Debug)]
pub struct RunningReceiver {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    task: JoinHandle<()>,
}

impl RunningReceiver {
    /// Address actually bound (useful when the configured port was 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that stops the accept loop when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Connection handlers currently running.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Wait for the accept loop to end, after someone triggered shutdown.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Listener task failed");
        }
    }

    /// Stop accepting and wait for the accept loop to exit.
    ///
    /// Does not wait for in-flight connection handlers.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        self.wait().await;
    }

    /// Wait for the accept loop to end, then for every in-flight handler
    /// to finish. Each handler is bounded by the read timeout.
    pub async fn drain(self) {
        let tracker = self.tracker.clone();
        self.wait().await;

        let in_flight = tracker.active_count();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for in-flight connections");
        }
        tracker.wait_idle().await;
    }
}

/// Load keys from `config.keys.directory` and start the receiver.
pub async fn start(config: &ReceiverConfig, notifier: Notifier) -> Result<RunningReceiver, StartupError> {
    let directory = config.keys.directory.clone();
    let pair = tokio::task::spawn_blocking(move || keys::load_or_generate(&directory)).await??;

    tracing::info!(directory = %config.keys.directory.display(), "RSA key pair loaded");

    let crypto = Arc::new(RsaDecryptor::new(pair.private));
    Ok(start_with_crypto(config, crypto, notifier).await?)
}

/// Start the receiver with an already prepared crypto provider.
pub async fn start_with_crypto(
    config: &ReceiverConfig,
    crypto: Arc<dyn CryptoProvider>,
    notifier: Notifier,
) -> Result<RunningReceiver, ListenerError> {
    let ctx = Arc::new(
        ReceiverContext::new(config.protocol.version.clone(), crypto, Arc::new(notifier))
            .with_debug(config.observability.debug),
    );

    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
        address: format!("{}:{}", config.listener.host, config.listener.port),
        source,
    })?;
    let tracker = listener.tracker();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(listener.serve(ctx, shutdown.clone()));

    Ok(RunningReceiver {
        local_addr,
        shutdown,
        tracker,
        task,
    })
}
