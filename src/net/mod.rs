//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop bounded by accept timeout, optional connection cap)
//!     → connection.rs (Connection: stream + peer + read timeout, lifetime tracking)
//!     → handler.rs (greeting → block → decrypt → parse → notify), one task per connection
//!
//! Connection States:
//!     Greeted → BlockRead → Decrypted → Validated → Dispatched | Failed → Closed
//! ```
//!
//! # Design Decisions
//! - A failing connection never affects the accept loop or other connections
//! - The accept loop only ends through shutdown
//! - Shutdown stops accepting but leaves in-flight handlers alone

pub mod connection;
pub mod handler;
pub mod listener;

pub use connection::{Connection, ConnectionId, ConnectionTracker};
pub use handler::{handle_connection, ConnectionError};
pub use listener::{Listener, ListenerError};
