//! Votifier vote receiver library.
//!
//! Accepts RSA-encrypted vote notifications pushed over plain TCP, decodes
//! them, and fans them out to registered consumers.

pub mod client;
pub mod config;
pub mod context;
pub mod crypto;
pub mod lifecycle;
pub mod net;
pub mod notify;
pub mod observability;
pub mod protocol;

pub use config::ReceiverConfig;
pub use context::ReceiverContext;
pub use lifecycle::Shutdown;
pub use net::Listener;
pub use notify::Notifier;
pub use protocol::Vote;
