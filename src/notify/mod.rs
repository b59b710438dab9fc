//! Vote fan-out to registered consumers.
//!
//! # Data Flow
//! ```text
//! connection handler (decoded Vote)
//!     → Notifier::deliver
//!         → every VoteConsumer, in registration order (errors and panics isolated)
//!         → Dispatcher (ownership of the Vote moves to the host)
//! ```
//!
//! # Design Decisions
//! - The consumer list is fixed at construction; handlers share it through `Arc` without locks
//! - Delivery never fails from the caller's point of view
//! - Which thread finally consumes a vote is the dispatcher's business, not the core's

pub mod consumer;
pub mod dispatcher;

pub use consumer::{ConsumerError, LogConsumer, VoteConsumer};
pub use dispatcher::{ChannelDispatcher, Dispatcher};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::observability::metrics;
use crate::protocol::Vote;

/// Outcome of one [`Notifier::deliver`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Consumers that accepted the vote.
    pub delivered: usize,
    /// Consumers that returned an error or panicked.
    pub failed: usize,
    /// Whether a dispatcher received the vote.
    pub dispatched: bool,
}

/// Delivers decoded votes to consumers and then to the host dispatcher.
#[derive(Default)]
pub struct Notifier {
    consumers: Vec<Arc<dyn VoteConsumer>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer. Consumers are called in registration order.
    pub fn with_consumer(mut self, consumer: Arc<dyn VoteConsumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// Set the dispatcher that receives each vote after the consumers ran.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Hand `vote` to every consumer, then to the dispatcher.
    ///
    /// A consumer that errors or panics is logged and skipped; the remaining
    /// consumers still run.
    pub fn deliver(&self, vote: Vote) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for consumer in &self.consumers {
            let outcome = catch_unwind(AssertUnwindSafe(|| consumer.vote_made(&vote)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        consumer = consumer.name(),
                        error = %e,
                        "Exception caught while sending the vote notification to consumer"
                    );
                    metrics::record_consumer_failure(consumer.name());
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::warn!(
                        consumer = consumer.name(),
                        "Consumer panicked while handling a vote notification"
                    );
                    metrics::record_consumer_failure(consumer.name());
                }
            }
        }

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.dispatch(vote);
            report.dispatched = true;
        }

        report
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.consumers.iter().map(|c| c.name()).collect();
        f.debug_struct("Notifier")
            .field("consumers", &names)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}
