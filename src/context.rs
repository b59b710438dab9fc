//! Services shared by the listener and every connection handler.

use std::sync::Arc;

use crate::crypto::CryptoProvider;
use crate::notify::Notifier;

/// Read-only state built once at startup and shared through `Arc`.
#[derive(Clone)]
pub struct ReceiverContext {
    version: String,
    crypto: Arc<dyn CryptoProvider>,
    notifier: Arc<Notifier>,
    debug: bool,
}

impl ReceiverContext {
    pub fn new(
        version: impl Into<String>,
        crypto: Arc<dyn CryptoProvider>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            version: version.into(),
            crypto,
            notifier,
            debug: false,
        }
    }

    /// Enable verbose per-connection logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Version announced in the greeting.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn crypto(&self) -> &dyn CryptoProvider {
        self.crypto.as_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

impl std::fmt::Debug for ReceiverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverContext")
            .field("version", &self.version)
            .field("block_size", &self.crypto.block_size())
            .field("notifier", &self.notifier)
            .field("debug", &self.debug)
            .finish()
    }
}
