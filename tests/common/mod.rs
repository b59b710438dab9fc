//! Shared utilities for integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rsa::pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tokio::sync::mpsc;

use votifier::config::ReceiverConfig;
use votifier::crypto::RsaDecryptor;
use votifier::lifecycle::{start_with_crypto, RunningReceiver};
use votifier::notify::{ChannelDispatcher, ConsumerError, Notifier, VoteConsumer};
use votifier::Vote;

pub const RECEIVER_KEY: &str = include_str!("../fixtures/receiver_key.pem");
pub const FOREIGN_KEY: &str = include_str!("../fixtures/foreign_key.pem");

pub fn private_key(pem: &str) -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(pem).unwrap()
}

pub fn receiver_public_key() -> RsaPublicKey {
    private_key(RECEIVER_KEY).to_public_key()
}

pub fn foreign_public_key() -> RsaPublicKey {
    private_key(FOREIGN_KEY).to_public_key()
}

/// Loopback config on an ephemeral port with short timeouts.
pub fn test_config() -> ReceiverConfig {
    let mut config = ReceiverConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.listener.accept_timeout_ms = 50;
    config.listener.read_timeout_ms = 2_000;
    config
}

/// Consumer that records every vote it sees.
#[derive(Default)]
pub struct RecordingConsumer {
    pub votes: Mutex<Vec<Vote>>,
}

impl VoteConsumer for RecordingConsumer {
    fn name(&self) -> &str {
        "recording"
    }

    fn vote_made(&self, vote: &Vote) -> Result<(), ConsumerError> {
        self.votes.lock().unwrap().push(vote.clone());
        Ok(())
    }
}

/// Consumer that always fails.
pub struct BrokenConsumer;

impl VoteConsumer for BrokenConsumer {
    fn name(&self) -> &str {
        "broken"
    }

    fn vote_made(&self, _vote: &Vote) -> Result<(), ConsumerError> {
        Err("consumer is broken".into())
    }
}

pub struct TestReceiver {
    pub receiver: RunningReceiver,
    pub votes: mpsc::UnboundedReceiver<Vote>,
    pub recording: Arc<RecordingConsumer>,
}

/// Start a receiver with the fixture key, a broken consumer, a recording
/// consumer and a channel dispatcher.
pub async fn start_receiver(config: ReceiverConfig) -> TestReceiver {
    let recording = Arc::new(RecordingConsumer::default());
    let (dispatcher, votes) = ChannelDispatcher::new();
    let notifier = Notifier::new()
        .with_consumer(Arc::new(BrokenConsumer))
        .with_consumer(recording.clone())
        .with_dispatcher(Arc::new(dispatcher));

    let crypto = Arc::new(RsaDecryptor::new(private_key(RECEIVER_KEY)));
    let receiver = start_with_crypto(&config, crypto, notifier).await.unwrap();

    TestReceiver {
        receiver,
        votes,
        recording,
    }
}

/// Wait for the next dispatched vote, failing the test after a few seconds.
pub async fn next_vote(votes: &mut mpsc::UnboundedReceiver<Vote>) -> Vote {
    tokio::time::timeout(Duration::from_secs(5), votes.recv())
        .await
        .expect("no vote dispatched in time")
        .expect("dispatcher closed")
}

/// Poll `f` until it holds or a few seconds pass.
#[allow(dead_code)]
pub async fn eventually<F: Fn() -> bool>(f: F) -> bool {
    for _ in 0..100 {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    f()
}
