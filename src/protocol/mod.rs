//! Vote wire protocol.
//!
//! # Data Flow
//! ```text
//! server → client: "VOTIFIER <version>\n"          (greeting)
//! client → server: [u8; block_size]                (RSA ciphertext)
//!     → crypto (decrypt)
//!     → fields.rs (split on '\n')
//!     → vote.rs (opcode check, build Vote)
//! ```
//!
//! # Design Decisions
//! - One exchange per connection, no length prefix; the key size fixes the block size
//! - The leading `VOTE` opcode doubles as a check that the right key was used
//! - Bytes past the fifth field are decryption leftovers and are ignored

pub mod fields;
pub mod vote;

pub use fields::{read_fields, Fields};
pub use vote::{ProtocolError, Vote};

/// Prefix of the greeting line sent to every client.
pub const GREETING_PREFIX: &str = "VOTIFIER";

/// Opcode every valid plaintext must start with.
pub const OPCODE: &str = "VOTE";

/// Number of newline-delimited fields in a vote plaintext (opcode included).
pub const FIELD_COUNT: usize = 5;

/// Build the greeting line, trailing newline included.
pub fn greeting(version: &str) -> String {
    format!("{} {}\n", GREETING_PREFIX, version)
}
