//! Votifier vote receiver daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌────────────────────────────────────────────────────┐
//!                   │                  VOTE RECEIVER                     │
//!                   │                                                    │
//!   Vote site       │  ┌──────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ────────────────┼─▶│   net    │──▶│ handler  │──▶│   crypto     │   │
//!   TCP, 256 bytes  │  │ listener │   │ (1 task/ │   │ RSA decrypt  │   │
//!                   │  └──────────┘   │  conn)   │   └──────┬───────┘   │
//!                   │                 └──────────┘          ▼           │
//!                   │                               ┌──────────────┐    │
//!                   │                               │  protocol    │    │
//!                   │                               │ fields, Vote │    │
//!                   │                               └──────┬───────┘    │
//!                   │                                      ▼            │
//!                   │                               ┌──────────────┐    │  Host
//!                   │                               │   notify     │────┼──▶ (dispatcher)
//!                   │                               │  consumers   │    │
//!                   │                               └──────────────┘    │
//!                   │  config · lifecycle · observability                │
//!                   └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use votifier::config::{load_config, ReceiverConfig};
use votifier::lifecycle::{self, signals};
use votifier::notify::{ChannelDispatcher, LogConsumer, Notifier};
use votifier::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "votifier")]
#[command(about = "Receives encrypted vote notifications over TCP", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults are used if it does not exist.
    #[arg(short, long, default_value = "votifier.toml")]
    config: PathBuf,

    /// Verbose logging, overrides the config file.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        ReceiverConfig::default()
    };
    if cli.debug {
        config.observability.debug = true;
    }

    logging::init(config.observability.debug)?;

    tracing::info!(
        config = %cli.config.display(),
        host = %config.listener.host,
        port = config.listener.port,
        version = %config.protocol.version,
        "votifier starting"
    );

    if config.observability.metrics_enabled {
        // Already validated by load_config.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr)?;
        }
    }

    let (dispatcher, mut votes) = ChannelDispatcher::new();
    let notifier = Notifier::new()
        .with_consumer(Arc::new(LogConsumer))
        .with_dispatcher(Arc::new(dispatcher));

    let receiver = match lifecycle::start(&config, notifier).await {
        Ok(receiver) => receiver,
        Err(e) => {
            match e.hint() {
                Some(hint) => tracing::error!(error = %e, hint, "Error initializing vote receiver"),
                None => tracing::error!(error = %e, "Error initializing vote receiver"),
            }
            return Err(e.into());
        }
    };

    tracing::info!(address = %receiver.local_addr(), "Listening for votes");

    // Stands in for the host application's event loop.
    let host = tokio::spawn(async move {
        while let Some(vote) = votes.recv().await {
            tracing::debug!(%vote, "Vote event delivered");
        }
    });

    signals::shutdown_on_signal(receiver.shutdown_handle()).await;
    receiver.drain().await;

    // Ends once the last handler drops its dispatcher handle.
    if let Err(e) = host.await {
        tracing::error!(error = %e, "Vote host task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
