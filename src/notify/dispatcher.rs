//! Hand-off of decoded votes to the host application.

use tokio::sync::mpsc;

use crate::protocol::Vote;

/// Final delivery seam. The host decides where and on which thread the
/// vote is consumed.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, vote: Vote);
}

/// Forwards votes into an unbounded channel drained by the host.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<Vote>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver the host should drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vote>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, vote: Vote) {
        if let Err(mpsc::error::SendError(vote)) = self.tx.send(vote) {
            tracing::warn!(%vote, "Vote dropped: host receiver is gone");
        }
    }
}
