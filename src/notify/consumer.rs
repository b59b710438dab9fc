//! Vote consumers.

use crate::protocol::Vote;

/// Error a consumer may return; it is logged and otherwise ignored.
pub type ConsumerError = Box<dyn std::error::Error + Send + Sync>;

/// Something that wants to hear about every received vote.
///
/// Called from connection tasks, possibly many at once.
pub trait VoteConsumer: Send + Sync {
    /// Name used in logs when this consumer fails.
    fn name(&self) -> &str;

    fn vote_made(&self, vote: &Vote) -> Result<(), ConsumerError>;
}

/// Logs every vote it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConsumer;

impl VoteConsumer for LogConsumer {
    fn name(&self) -> &str {
        "log"
    }

    fn vote_made(&self, vote: &Vote) -> Result<(), ConsumerError> {
        tracing::info!(
            service = vote.service_name(),
            username = vote.username(),
            address = vote.address(),
            timestamp = vote.timestamp(),
            "Received vote"
        );
        Ok(())
    }
}
