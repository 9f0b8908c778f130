use super::message::Message;
use super::{Broadcaster, Member, Registry};
use crate::client::{PeerInfo, Role, Subscriber};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, DuplexStream};

fn info(port: u16) -> PeerInfo {
    PeerInfo::new(format!("127.0.0.1:{port}").parse().unwrap())
}

fn subscriber(port: u16) -> (Subscriber, BufReader<DuplexStream>) {
    let (writer, reader) = tokio::io::duplex(1024);
    (Subscriber::new(info(port), writer), BufReader::new(reader))
}

async fn next_line(reader: &mut BufReader<DuplexStream>) -> String {
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(1), reader.read_line(&mut line))
        .await
        .expect("timed out waiting for a line")
        .unwrap();
    line
}

#[test]
fn test_message_trims_and_rejects_blank() {
    assert_eq!(Message::new("  Hello\r").unwrap().as_str(), "Hello");
    assert!(Message::new("").is_none());
    assert!(Message::new(" \t\r").is_none());
}

#[test]
fn test_message_from_raw_replaces_invalid_utf8() {
    let msg = Message::from_raw(b"caf\xff").unwrap();
    assert_eq!(msg.as_str(), "caf\u{fffd}");
    let msg = Message::from_raw("Привет".as_bytes()).unwrap();
    assert_eq!(msg.to_wire(), "Привет\n".as_bytes());
}

#[test]
fn test_registry_new_is_empty() {
    let registry = Registry::new();
    assert_eq!(registry.publisher_count(), 0);
    assert_eq!(registry.subscriber_count(), 0);
    assert!(registry.snapshot_subscribers().is_empty());
}

#[test]
fn test_registry_register_and_unregister() {
    let registry = Registry::new();
    let publisher = info(1);
    let publisher_id = publisher.id;
    let (sub, _reader) = subscriber(2);
    let sub_id = sub.id();

    registry.register(Member::Publisher(publisher));
    registry.register(Member::Subscriber(sub));
    assert_eq!(registry.role_of(&publisher_id), Some(Role::Publisher));
    assert_eq!(registry.role_of(&sub_id), Some(Role::Subscriber));
    assert_eq!(registry.publisher_count(), 1);
    assert_eq!(registry.subscriber_count(), 1);

    assert_eq!(registry.unregister(&sub_id), Some(Role::Subscriber));
    assert_eq!(registry.unregister(&publisher_id), Some(Role::Publisher));
    assert_eq!(registry.role_of(&sub_id), None);
}

#[test]
fn test_registry_unregister_is_idempotent() {
    let registry = Registry::new();
    let (sub, _reader) = subscriber(3);
    let id = sub.id();
    registry.register(Member::Subscriber(sub));

    assert_eq!(registry.unregister(&id), Some(Role::Subscriber));
    assert_eq!(registry.unregister(&id), None);
    assert_eq!(registry.subscriber_count(), 0);
}

#[test]
fn test_registry_member_is_in_one_set_only() {
    let registry = Registry::new();
    let (sub, _reader) = subscriber(4);
    let id = sub.id();
    let publisher = PeerInfo {
        id,
        ..info(4)
    };

    registry.register(Member::Subscriber(sub));
    registry.register(Member::Publisher(publisher));
    assert_eq!(registry.publisher_count(), 1);
    assert_eq!(registry.subscriber_count(), 0);
}

#[test]
fn test_snapshot_is_detached_from_later_changes() {
    let registry = Registry::new();
    let (sub, _reader) = subscriber(5);
    let id = sub.id();
    registry.register(Member::Subscriber(sub));

    let snapshot = registry.snapshot_subscribers();
    registry.unregister(&id);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(registry.subscriber_count(), 0);
}

#[tokio::test]
async fn test_publish_reaches_every_subscriber() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(registry.clone(), Duration::from_secs(1));
    let (s1, mut r1) = subscriber(10);
    let (s2, mut r2) = subscriber(11);
    registry.register(Member::Subscriber(s1));
    registry.register(Member::Subscriber(s2));

    let delivered = broadcaster.publish(&Message::new("Hello").unwrap()).await;
    assert_eq!(delivered, 2);
    assert_eq!(next_line(&mut r1).await, "Hello\n");
    assert_eq!(next_line(&mut r2).await, "Hello\n");
}

#[tokio::test]
async fn test_publish_with_no_subscribers() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(registry, Duration::from_secs(1));
    assert_eq!(broadcaster.publish(&Message::new("nobody").unwrap()).await, 0);
}

#[tokio::test]
async fn test_publish_preserves_order_per_subscriber() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(registry.clone(), Duration::from_secs(1));
    let (sub, mut reader) = subscriber(12);
    registry.register(Member::Subscriber(sub));

    for text in ["One", "Two", "Three"] {
        broadcaster.publish(&Message::new(text).unwrap()).await;
    }
    assert_eq!(next_line(&mut reader).await, "One\n");
    assert_eq!(next_line(&mut reader).await, "Two\n");
    assert_eq!(next_line(&mut reader).await, "Three\n");
}

#[tokio::test]
async fn test_failed_subscriber_is_pruned_and_closed() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(registry.clone(), Duration::from_secs(1));
    let (dead, dead_reader) = subscriber(13);
    let (alive, mut alive_reader) = subscriber(14);
    let dead_handle = dead.clone();
    registry.register(Member::Subscriber(dead));
    registry.register(Member::Subscriber(alive));
    drop(dead_reader);

    let delivered = broadcaster.publish(&Message::new("Ping").unwrap()).await;
    assert_eq!(delivered, 1);
    assert_eq!(registry.subscriber_count(), 1);
    assert_eq!(next_line(&mut alive_reader).await, "Ping\n");

    tokio::time::timeout(Duration::from_secs(1), dead_handle.closed())
        .await
        .expect("dead subscriber was not told to close");

    // The pruned subscriber is not written to again.
    assert_eq!(broadcaster.publish(&Message::new("Again").unwrap()).await, 1);
    assert_eq!(next_line(&mut alive_reader).await, "Again\n");
}

#[tokio::test]
async fn test_stalled_subscriber_does_not_block_others() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(registry.clone(), Duration::from_millis(100));

    // A 4-byte pipe that nobody drains stalls on the first long write.
    let (stuck_writer, _stuck_reader) = tokio::io::duplex(4);
    let stuck = Subscriber::new(info(15), stuck_writer);
    let (alive, mut alive_reader) = subscriber(16);
    registry.register(Member::Subscriber(stuck));
    registry.register(Member::Subscriber(alive));

    let delivered = broadcaster
        .publish(&Message::new("a line longer than four bytes").unwrap())
        .await;
    assert_eq!(delivered, 1);
    assert_eq!(registry.subscriber_count(), 1);
    assert_eq!(
        next_line(&mut alive_reader).await,
        "a line longer than four bytes\n"
    );
}

#[test]
fn test_member_reports_its_role() {
    let (sub, _reader) = subscriber(20);
    assert_eq!(Member::Subscriber(sub).role(), Role::Subscriber);
    assert_eq!(Member::Publisher(info(21)).role(), Role::Publisher);
}

#[tokio::test]
async fn test_timed_out_line_is_not_followed_by_another_publisher() {
    let registry = Arc::new(Registry::new());
    let impatient = Broadcaster::new(registry.clone(), Duration::from_millis(50));
    let patient = Broadcaster::new(registry.clone(), Duration::from_secs(5));

    // Nobody drains this 4-byte pipe, so the first write stalls after "AAAA".
    let (writer, mut reader) = tokio::io::duplex(4);
    registry.register(Member::Subscriber(Subscriber::new(info(22), writer)));

    let long = Message::new("AAAAAAAA").unwrap();
    let short = Message::new("BB").unwrap();
    let (first, second) = tokio::join!(impatient.publish(&long), patient.publish(&short));
    assert_eq!(first, 0);
    assert_eq!(second, 0);
    assert_eq!(registry.subscriber_count(), 0);

    // Both snapshots are gone, so the writer is dropped once the fragment is read.
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(1), reader.read_to_end(&mut received))
        .await
        .expect("writer was not released")
        .unwrap();
    assert_eq!(received, b"AAAA");
}

#[tokio::test]
async fn test_concurrent_publishers_never_interleave_lines() {
    const LINES: usize = 100;
    let registry = Arc::new(Registry::new());
    let (writer, reader) = tokio::io::duplex(64 * 1024);
    registry.register(Member::Subscriber(Subscriber::new(info(23), writer)));

    let mut tasks = Vec::new();
    for prefix in ["a", "b"] {
        let broadcaster = Broadcaster::new(registry.clone(), Duration::from_secs(5));
        tasks.push(tokio::spawn(async move {
            for i in 0..LINES {
                let text = format!("{prefix}-{i}-{}", prefix.repeat(40));
                broadcaster.publish(&Message::new(&text).unwrap()).await;
            }
        }));
    }

    let mut reader = BufReader::new(reader);
    let mut next = [0usize; 2];
    for _ in 0..2 * LINES {
        let line = next_line(&mut reader).await;
        let line = line.strip_suffix('\n').expect("line was not terminated");
        let mut parts = line.splitn(3, '-');
        let prefix = parts.next().unwrap();
        let index: usize = parts.next().unwrap().parse().unwrap();
        assert_eq!(parts.next().unwrap(), prefix.repeat(40), "mangled line {line:?}");

        let slot = if prefix == "a" { 0 } else { 1 };
        assert_eq!(index, next[slot], "out of order for publisher {prefix}");
        next[slot] += 1;
    }
    assert_eq!(next, [LINES, LINES]);

    for task in tasks {
        task.await.unwrap();
    }
}
