//! End-to-end tests against a receiver on a loopback socket.

use std::collections::HashSet;
use std::time::Duration;

use rsa::Pkcs1v15Encrypt;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use votifier::client::{self, encrypt_vote};
use votifier::lifecycle::start_with_crypto;
use votifier::net::ListenerError;
use votifier::notify::Notifier;
use votifier::crypto::RsaDecryptor;
use votifier::Vote;

mod common;

const TIMEOUT: Duration = Duration::from_secs(5);

fn sample_vote() -> Vote {
    Vote::new("MyServer", "player1", "203.0.113.5", "1700000000")
}

async fn read_greeting(stream: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    stream.read_line(&mut line).await.unwrap();
    line
}

/// Give the receiver time to process, then assert nothing was dispatched.
async fn assert_no_vote(votes: &mut tokio::sync::mpsc::UnboundedReceiver<Vote>) {
    let received = tokio::time::timeout(Duration::from_millis(300), votes.recv()).await;
    assert!(received.is_err(), "unexpected vote: {received:?}");
}

#[tokio::test]
async fn vote_is_decoded_and_delivered_once() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();

    let version = client::send_vote(addr, &common::receiver_public_key(), &sample_vote(), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(version, "1.9");
    let vote = common::next_vote(&mut t.votes).await;
    assert_eq!(vote.service_name(), "MyServer");
    assert_eq!(vote.username(), "player1");
    assert_eq!(vote.address(), "203.0.113.5");
    assert_eq!(vote.timestamp(), "1700000000");

    assert_no_vote(&mut t.votes).await;
    assert_eq!(*t.recording.votes.lock().unwrap(), vec![sample_vote()]);

    t.receiver.shutdown().await;
}

#[tokio::test]
async fn greeting_is_sent_before_any_client_data() {
    let mut config = common::test_config();
    config.protocol.version = "2.3-test".into();
    let t = common::start_receiver(config).await;

    let stream = TcpStream::connect(t.receiver.local_addr()).await.unwrap();
    let mut stream = BufReader::new(stream);
    assert_eq!(read_greeting(&mut stream).await, "VOTIFIER 2.3-test\n");

    t.receiver.shutdown().await;
}

#[tokio::test]
async fn foreign_key_produces_no_vote_and_listener_continues() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();

    client::send_vote(addr, &common::foreign_public_key(), &sample_vote(), TIMEOUT)
        .await
        .unwrap();
    assert_no_vote(&mut t.votes).await;

    client::send_vote(addr, &common::receiver_public_key(), &sample_vote(), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(common::next_vote(&mut t.votes).await, sample_vote());

    t.receiver.shutdown().await;
}

#[tokio::test]
async fn zero_block_is_rejected_and_next_accept_succeeds() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut stream = BufReader::new(stream);
    assert_eq!(read_greeting(&mut stream).await, "VOTIFIER 1.9\n");
    stream.get_mut().write_all(&[0u8; 256]).await.unwrap();

    // The server closes without sending anything else.
    let mut rest = Vec::new();
    tokio::time::timeout(TIMEOUT, stream.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert!(rest.is_empty());
    assert_no_vote(&mut t.votes).await;

    client::send_vote(addr, &common::receiver_public_key(), &sample_vote(), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(common::next_vote(&mut t.votes).await, sample_vote());

    t.receiver.shutdown().await;
}

#[tokio::test]
async fn malformed_plaintexts_never_produce_votes() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();
    let key = common::receiver_public_key();

    let bad: [&[u8]; 4] = [
        b"VOTE\nMyServer\nplayer1\n",
        b"VOTES\nMyServer\nplayer1\n203.0.113.5\n1700000000\n",
        b"vote\nMyServer\nplayer1\n203.0.113.5\n1700000000\n",
        b"",
    ];
    for plaintext in bad {
        let block = key
            .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, plaintext)
            .unwrap();
        client::send_block(addr, &block, TIMEOUT).await.unwrap();
    }

    assert_no_vote(&mut t.votes).await;
    assert!(t.recording.votes.lock().unwrap().is_empty());

    t.receiver.shutdown().await;
}

#[tokio::test]
async fn listener_survives_repeated_failures() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();

    for i in 0..10 {
        match i % 3 {
            0 => {
                // Disconnect right after connecting.
                drop(TcpStream::connect(addr).await.unwrap());
            }
            1 => {
                // Half a block, then hang up.
                let mut stream = TcpStream::connect(addr).await.unwrap();
                stream.write_all(&[7u8; 100]).await.unwrap();
            }
            _ => {
                client::send_block(addr, &[0xFFu8; 256], TIMEOUT).await.unwrap();
            }
        }
    }

    // Idle longer than several accept timeouts.
    tokio::time::sleep(Duration::from_millis(200)).await;

    client::send_vote(addr, &common::receiver_public_key(), &sample_vote(), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(common::next_vote(&mut t.votes).await, sample_vote());

    t.receiver.shutdown().await;
}

#[tokio::test]
async fn silent_client_is_dropped_after_read_timeout() {
    let mut config = common::test_config();
    config.listener.read_timeout_ms = 200;
    let t = common::start_receiver(config).await;

    let stream = TcpStream::connect(t.receiver.local_addr()).await.unwrap();
    let mut stream = BufReader::new(stream);
    read_greeting(&mut stream).await;

    let mut rest = Vec::new();
    let closed = tokio::time::timeout(TIMEOUT, stream.read_to_end(&mut rest)).await;
    assert!(closed.is_ok(), "server kept an idle connection open");

    assert!(common::eventually(|| t.receiver.active_connections() == 0).await);
    t.receiver.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_accepting_but_lets_in_flight_finish() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut stream = BufReader::new(stream);
    assert_eq!(read_greeting(&mut stream).await, "VOTIFIER 1.9\n");

    t.receiver.shutdown().await;

    // The handler started before shutdown still completes.
    let block = encrypt_vote(&common::receiver_public_key(), &sample_vote()).unwrap();
    stream.get_mut().write_all(&block).await.unwrap();
    assert_eq!(common::next_vote(&mut t.votes).await, sample_vote());

    // No new connections are served.
    match TcpStream::connect(addr).await {
        Err(_) => {}
        Ok(stream) => {
            let mut stream = BufReader::new(stream);
            let mut line = String::new();
            let read = tokio::time::timeout(Duration::from_millis(300), stream.read_line(&mut line)).await;
            assert!(
                !matches!(read, Ok(Ok(n)) if n > 0),
                "received a greeting after shutdown: {line:?}"
            );
        }
    }
}

#[tokio::test]
async fn drain_waits_for_in_flight_handlers_to_deliver() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut stream = BufReader::new(stream);
    assert_eq!(read_greeting(&mut stream).await, "VOTIFIER 1.9\n");

    // The client only sends its block after shutdown has begun.
    let block = encrypt_vote(&common::receiver_public_key(), &sample_vote()).unwrap();
    let client = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        stream.get_mut().write_all(&block).await.unwrap();
        stream
    });

    // Same sequence the daemon runs on SIGINT/SIGTERM.
    t.receiver.shutdown_handle().trigger();
    t.receiver.drain().await;

    assert_eq!(t.votes.try_recv().unwrap(), sample_vote());

    // With every handler finished, no dispatcher handle is left and the
    // host loop ends on its own.
    let closed = tokio::time::timeout(TIMEOUT, t.votes.recv()).await.unwrap();
    assert!(closed.is_none());

    client.await.unwrap();
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = common::test_config();
    config.listener.port = occupied.local_addr().unwrap().port();

    let crypto = std::sync::Arc::new(RsaDecryptor::new(common::private_key(common::RECEIVER_KEY)));
    let result = start_with_crypto(&config, crypto, Notifier::new()).await;

    assert!(matches!(result, Err(ListenerError::Bind { .. })));
}

#[tokio::test]
async fn connection_cap_defers_extra_clients() {
    let mut config = common::test_config();
    config.listener.max_connections = Some(1);
    let mut t = common::start_receiver(config).await;
    let addr = t.receiver.local_addr();

    let first = TcpStream::connect(addr).await.unwrap();
    let mut first = BufReader::new(first);
    read_greeting(&mut first).await;

    // Queued in the backlog, not served while the only slot is taken.
    let second = TcpStream::connect(addr).await.unwrap();
    let mut second = BufReader::new(second);
    let mut line = String::new();
    let early = tokio::time::timeout(Duration::from_millis(300), second.read_line(&mut line)).await;
    assert!(early.is_err(), "second client served while the cap was reached");

    let block = encrypt_vote(&common::receiver_public_key(), &sample_vote()).unwrap();
    first.get_mut().write_all(&block).await.unwrap();
    assert_eq!(common::next_vote(&mut t.votes).await, sample_vote());

    let greeting = tokio::time::timeout(TIMEOUT, second.read_line(&mut line)).await;
    assert!(matches!(greeting, Ok(Ok(n)) if n > 0));
    assert_eq!(line, "VOTIFIER 1.9\n");

    t.receiver.shutdown().await;
}

#[tokio::test]
async fn concurrent_clients_are_all_served() {
    let mut t = common::start_receiver(common::test_config()).await;
    let addr = t.receiver.local_addr();
    let key = common::receiver_public_key();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            let vote = Vote::new("MyServer", format!("player{i}"), "203.0.113.5", "1700000000");
            client::send_vote(addr, &key, &vote, TIMEOUT).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut usernames = HashSet::new();
    for _ in 0..20 {
        usernames.insert(common::next_vote(&mut t.votes).await.username().to_owned());
    }
    let expected: HashSet<String> = (0..20).map(|i| format!("player{i}")).collect();
    assert_eq!(usernames, expected);

    t.receiver.shutdown().await;
}
