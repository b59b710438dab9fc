//! RSA PKCS#1 v1.5 block decryption.

use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};

use super::{CryptoProvider, DecryptError};

/// Decrypts vote blocks with an RSA private key.
#[derive(Debug, Clone)]
pub struct RsaDecryptor {
    key: RsaPrivateKey,
}

impl RsaDecryptor {
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }
}

impl CryptoProvider for RsaDecryptor {
    fn block_size(&self) -> usize {
        self.key.size()
    }

    fn decrypt(&self, block: &[u8]) -> Result<Vec<u8>, DecryptError> {
        let expected = self.block_size();
        if block.len() != expected {
            return Err(DecryptError::BlockSize {
                expected,
                actual: block.len(),
            });
        }

        let mut rng = rand::thread_rng();
        self.key
            .decrypt_blinded(&mut rng, Pkcs1v15Encrypt, block)
            .map_err(|e| match e {
                rsa::Error::Decryption => DecryptError::KeyMismatch,
                other => DecryptError::Crypto(other.to_string()),
            })
    }
}
