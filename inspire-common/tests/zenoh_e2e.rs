//! End-to-end tests with Zenoh pub/sub.
//!
//! Note: Zenoh requires multi-thread tokio runtime.
//! Each test uses a unique key prefix to avoid interference.

use inspire_common::{
    ControlCommand, Format, HandSide, HandState, HandTopics, ZenohConfig, decode_auto, encode,
};
use std::time::Duration;

/// Generate a unique test prefix to avoid test interference.
fn unique_prefix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test_{}", nanos)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_pubsub() {
    let topics = HandTopics::with_prefix(unique_prefix(), HandSide::Right);

    let session = inspire_common::connect(&ZenohConfig::default())
        .await
        .expect("Failed to open Zenoh session");

    let subscriber = session
        .declare_subscriber(topics.state())
        .await
        .expect("Failed to create subscriber");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = HandState {
        timestamp: 42,
        angle_act: Some(vec![1000, 900, 800, 700, 600, 500]),
        err: Some(vec![0, 0, 0, 0, 0, 4]),
        ..Default::default()
    };
    session
        .put(topics.state(), encode(&state, Format::Json).unwrap())
        .await
        .expect("Failed to publish");

    let received = tokio::time::timeout(Duration::from_secs(5), subscriber.recv_async())
        .await
        .expect("Timeout waiting for message")
        .expect("Failed to receive message");

    let decoded: HandState = decode_auto(&received.payload().to_bytes()).unwrap();
    assert_eq!(decoded, state);

    drop(subscriber);
    session.close().await.expect("Failed to close session");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cbor_command_pubsub() {
    let topics = HandTopics::with_prefix(unique_prefix(), HandSide::Left);
    let session = zenoh::open(zenoh::Config::default()).await.unwrap();

    let subscriber = session.declare_subscriber(topics.ctrl()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let command = ControlCommand::builder()
        .angle(&[0, 0, 0, 0, 500, 500])
        .unwrap()
        .build();
    session
        .put(topics.ctrl(), encode(&command, Format::Cbor).unwrap())
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), subscriber.recv_async())
        .await
        .expect("Timeout waiting for command")
        .unwrap();

    let decoded: ControlCommand = decode_auto(&received.payload().to_bytes()).unwrap();
    assert_eq!(decoded, command);

    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hand_wildcard_excludes_other_side() {
    let prefix = unique_prefix();
    let left = HandTopics::with_prefix(&prefix, HandSide::Left);
    let right = HandTopics::with_prefix(&prefix, HandSide::Right);
    let session = zenoh::open(zenoh::Config::default()).await.unwrap();

    let subscriber = session.declare_subscriber(left.wildcard()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.put(right.state(), "{}").await.unwrap();
    session.put(left.touch(), "{}").await.unwrap();
    session.put(left.state(), "{}").await.unwrap();

    let mut keys = Vec::new();
    for _ in 0..2 {
        let sample = tokio::time::timeout(Duration::from_secs(5), subscriber.recv_async())
            .await
            .expect("Timeout waiting for sample")
            .unwrap();
        keys.push(sample.key_expr().to_string());
    }
    keys.sort();
    assert_eq!(keys, vec![left.state(), left.touch()]);

    session.close().await.unwrap();
}
