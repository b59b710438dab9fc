//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load keys → Build context → Bind listener (fatal on failure) → Spawn accept loop
//!
//! Shutdown (shutdown.rs):
//!     Trigger → accept loop exits → listening socket closed
//!     In-flight handlers are left to finish or time out on their own
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Bind errors surface to the caller and are never retried
//! - Shutdown does not wait for connection handlers

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, start_with_crypto, RunningReceiver, StartupError};
