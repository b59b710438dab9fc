//! Sending side of the vote protocol.
//!
//! Used by `vote-cli` and by tests to talk to a running receiver the same
//! way a vote site would.

use std::net::SocketAddr;
use std::time::Duration;

use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time;

use crate::protocol::{Vote, GREETING_PREFIX};

/// PKCS#1 v1.5 overhead: the plaintext may use at most `key size - 11` bytes.
const PKCS1_OVERHEAD: usize = 11;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out talking to the receiver")]
    Timeout,

    #[error("unexpected greeting {0:?}")]
    Greeting(String),

    #[error("vote is {len} bytes, the key fits at most {max}")]
    VoteTooLarge { len: usize, max: usize },

    #[error("encryption failed: {0}")]
    Encrypt(#[from] rsa::Error),
}

/// Encrypt `vote` into one ciphertext block for `key`.
pub fn encrypt_vote(key: &RsaPublicKey, vote: &Vote) -> Result<Vec<u8>, ClientError> {
    let plaintext = vote.encode();
    let max = key.size().saturating_sub(PKCS1_OVERHEAD);
    if plaintext.len() > max {
        return Err(ClientError::VoteTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    Ok(key.encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, &plaintext)?)
}

/// Deliver `vote` to the receiver at `addr`.
///
/// Returns the version the receiver announced in its greeting.
pub async fn send_vote(
    addr: SocketAddr,
    key: &RsaPublicKey,
    vote: &Vote,
    timeout: Duration,
) -> Result<String, ClientError> {
    let block = encrypt_vote(key, vote)?;
    time::timeout(timeout, exchange(addr, &block))
        .await
        .map_err(|_| ClientError::Timeout)?
}

/// Connect, check the greeting, write `block` as-is.
///
/// Also used to send deliberately broken blocks.
pub async fn send_block(addr: SocketAddr, block: &[u8], timeout: Duration) -> Result<String, ClientError> {
    time::timeout(timeout, exchange(addr, block))
        .await
        .map_err(|_| ClientError::Timeout)?
}

async fn exchange(addr: SocketAddr, block: &[u8]) -> Result<String, ClientError> {
    let stream = TcpStream::connect(addr).await?;
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let version = parse_greeting(&line)?;

    let stream = reader.get_mut();
    stream.write_all(block).await?;
    stream.flush().await?;
    // The receiver may already have closed its side.
    let _ = stream.shutdown().await;

    Ok(version)
}

fn parse_greeting(line: &str) -> Result<String, ClientError> {
    line.strip_suffix('\n')
        .and_then(|l| l.strip_prefix(GREETING_PREFIX))
        .and_then(|l| l.strip_prefix(' '))
        .map(str::to_owned)
        .ok_or_else(|| ClientError::Greeting(line.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePrivateKey;
    use rsa::RsaPrivateKey;

    fn public_key() -> RsaPublicKey {
        RsaPrivateKey::from_pkcs8_pem(include_str!("../tests/fixtures/receiver_key.pem"))
            .unwrap()
            .to_public_key()
    }

    #[test]
    fn greeting_version_is_extracted() {
        assert_eq!(parse_greeting("VOTIFIER 1.9\n").unwrap(), "1.9");
        assert!(matches!(parse_greeting("HTTP/1.1 400\n"), Err(ClientError::Greeting(_))));
        assert!(matches!(parse_greeting("VOTIFIER 1.9"), Err(ClientError::Greeting(_))));
    }

    #[test]
    fn block_is_one_key_length() {
        let vote = Vote::new("MyServer", "player1", "203.0.113.5", "1700000000");
        assert_eq!(encrypt_vote(&public_key(), &vote).unwrap().len(), 256);
    }

    #[test]
    fn oversized_vote_is_refused() {
        let vote = Vote::new("s".repeat(300), "u", "a", "t");
        assert!(matches!(
            encrypt_vote(&public_key(), &vote),
            Err(ClientError::VoteTooLarge { max: 245, .. })
        ));
    }
}
