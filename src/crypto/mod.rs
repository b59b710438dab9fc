//! Asymmetric decryption of vote blocks and key material handling.
//!
//! # Data Flow
//! ```text
//! keys.rs (load or generate RSA key pair on disk)
//!     → decryptor.rs (RsaDecryptor, PKCS#1 v1.5)
//!     → shared read-only by every connection handler
//! ```
//!
//! # Design Decisions
//! - Handlers only see the `CryptoProvider` trait, so tests can swap it out
//! - A padding failure is reported as a key mismatch, not a generic error

pub mod decryptor;
pub mod keys;

pub use decryptor::RsaDecryptor;
pub use keys::{KeyError, KeyPair};

/// Errors produced while decrypting a ciphertext block.
#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    /// Padding check failed: the sender encrypted with some other public key.
    #[error("block did not decrypt under the configured key")]
    KeyMismatch,

    /// The block is not exactly one key length.
    #[error("expected a {expected} byte block, got {actual}")]
    BlockSize { expected: usize, actual: usize },

    /// Any other failure reported by the crypto backend.
    #[error("decryption failed: {0}")]
    Crypto(String),
}

/// Decrypts fixed-size ciphertext blocks with the service's private key.
///
/// Implementations are shared by all connection handlers at once and must
/// not need `&mut self`.
pub trait CryptoProvider: Send + Sync {
    /// Ciphertext length in bytes, fixed by the key size.
    fn block_size(&self) -> usize;

    /// Decrypt one block into its plaintext.
    fn decrypt(&self, block: &[u8]) -> Result<Vec<u8>, DecryptError>;
}
