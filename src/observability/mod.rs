//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! listener / connection handlers / notifier produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every per-connection event carries `connection_id` and `peer_addr`
//! - The debug flag raises verbosity only; it never changes control flow
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
