//! Per-connection vote exchange.
//!
//! # States
//! ```text
//! START → GREETED → BLOCK_READ → DECRYPTED → VALIDATED → DISPATCHED
//!   any step may fail → FAILED
//! DISPATCHED | FAILED → CLOSED (stream shut down and dropped)
//! ```
//!
//! Each connection gets exactly one attempt; nothing is retried.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time;

use crate::context::ReceiverContext;
use crate::crypto::DecryptError;
use crate::net::connection::Connection;
use crate::notify::DeliveryReport;
use crate::observability::metrics;
use crate::protocol::{self, ProtocolError, Vote};

/// Ways a single connection can fail. None of them reach the listener.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("failed to send greeting: {0}")]
    Greeting(#[source] io::Error),

    #[error("no vote block within {0:?}")]
    ReadTimeout(Duration),

    #[error("failed to read vote block: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    #[error("malformed vote record: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ConnectionError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ConnectionError::Greeting(_) => "greeting",
            ConnectionError::ReadTimeout(_) => "read_timeout",
            ConnectionError::Read(_) => "read",
            ConnectionError::Decrypt(DecryptError::KeyMismatch) => "key_mismatch",
            ConnectionError::Decrypt(_) => "decrypt",
            ConnectionError::Protocol(_) => "protocol",
        }
    }
}

/// Run the full exchange on `conn` and close it.
///
/// Failures are logged here and returned for inspection; the caller has
/// nothing left to do with them. The stream is shut down on every path.
pub async fn handle_connection<S>(
    mut conn: Connection<S>,
    ctx: &ReceiverContext,
) -> Result<DeliveryReport, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let result = receive_vote(&mut conn, ctx).await;

    let outcome = match result {
        Ok(vote) => {
            if ctx.is_debug() {
                tracing::info!(%vote, "Received vote record");
            }
            metrics::record_vote_received();
            Ok(ctx.notifier().deliver(vote))
        }
        Err(e) => {
            log_failure(&conn, &e);
            metrics::record_connection_failed(e.reason());
            Err(e)
        }
    };

    let _ = conn.stream.shutdown().await;
    drop(conn);
    outcome
}

/// Greet, read one block, decrypt and parse it.
pub async fn receive_vote<S>(
    conn: &mut Connection<S>,
    ctx: &ReceiverContext,
) -> Result<Vote, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_greeting(conn, ctx.version()).await?;

    let block = read_block(conn, ctx.crypto().block_size()).await?;

    let plaintext = ctx.crypto().decrypt(&block)?;

    Ok(Vote::decode(&plaintext)?)
}

async fn send_greeting<S>(conn: &mut Connection<S>, version: &str) -> Result<(), ConnectionError>
where
    S: AsyncWrite + Unpin,
{
    let greeting = protocol::greeting(version);
    let write = async {
        conn.stream.write_all(greeting.as_bytes()).await?;
        conn.stream.flush().await
    };

    match time::timeout(conn.read_timeout, write).await {
        Ok(result) => result.map_err(ConnectionError::Greeting),
        Err(_) => Err(ConnectionError::Greeting(io::Error::new(
            io::ErrorKind::TimedOut,
            "greeting write timed out",
        ))),
    }
}

/// Read exactly `len` bytes, across as many partial reads as it takes,
/// within the connection's read timeout.
async fn read_block<S>(conn: &mut Connection<S>, len: usize) -> Result<Vec<u8>, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    let mut block = vec![0u8; len];
    match time::timeout(conn.read_timeout, conn.stream.read_exact(&mut block)).await {
        Ok(Ok(_)) => Ok(block),
        Ok(Err(e)) => Err(ConnectionError::Read(e)),
        Err(_) => Err(ConnectionError::ReadTimeout(conn.read_timeout)),
    }
}

fn log_failure<S>(conn: &Connection<S>, error: &ConnectionError) {
    match error {
        ConnectionError::Decrypt(DecryptError::KeyMismatch) => {
            tracing::warn!(
                connection_id = %conn.id,
                peer_addr = %conn.peer_addr,
                "Unable to decrypt vote record. Make sure that your public key matches the one you gave the server list"
            );
        }
        ConnectionError::Protocol(e) => {
            tracing::warn!(
                connection_id = %conn.id,
                peer_addr = %conn.peer_addr,
                error = %e,
                "Vote record has an invalid format; the sender may be using another key or a different protocol"
            );
        }
        other => {
            tracing::warn!(
                connection_id = %conn.id,
                peer_addr = %conn.peer_addr,
                error = %other,
                "Error while receiving a vote notification"
            );
        }
    }
}
