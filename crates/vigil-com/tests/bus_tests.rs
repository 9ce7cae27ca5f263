use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::{Duration, sleep, timeout};
use vigil_com::{BusConfig, ComError, MAX_MESSAGE_LEN, MessageBus, Role};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct TestMessage {
    seq: u32,
    body: String,
}

async fn bound_publisher<T: Serialize + serde::de::DeserializeOwned>() -> MessageBus<T> {
    MessageBus::open(BusConfig::new("127.0.0.1:0", Role::Publish).with_bind(true))
        .await
        .expect("bind failed")
}

#[tokio::test]
async fn test_bound_publisher_to_connected_subscriber() {
    let mut publisher = bound_publisher::<TestMessage>().await;
    let addr = publisher.local_addr().unwrap();

    let mut subscriber =
        MessageBus::<TestMessage>::open(BusConfig::new(addr.to_string(), Role::Subscribe))
            .await
            .expect("connect failed");

    sleep(Duration::from_millis(50)).await;

    let msg = TestMessage {
        seq: 1,
        body: "hello".to_string(),
    };
    publisher.send(&msg).await.expect("send failed");

    let received = timeout(Duration::from_secs(5), subscriber.recv())
        .await
        .expect("recv timed out")
        .expect("recv failed");
    assert_eq!(received, msg);
}

#[tokio::test]
async fn test_connected_publisher_to_bound_subscriber() {
    // Default pipeline topology: the consumer binds, the producer connects.
    let mut subscriber = MessageBus::<TestMessage>::open(
        BusConfig::new("tcp://127.0.0.1:0", Role::Subscribe).with_bind(true),
    )
    .await
    .expect("bind failed");
    let addr = subscriber.local_addr().unwrap();

    let mut publisher =
        MessageBus::<TestMessage>::open(BusConfig::new(addr.to_string(), Role::Publish))
            .await
            .expect("connect failed");

    for seq in 0..5 {
        let msg = TestMessage {
            seq,
            body: format!("msg-{seq}"),
        };
        publisher.send(&msg).await.expect("send failed");
    }

    // Order is preserved per connection
    for seq in 0..5 {
        let received = timeout(Duration::from_secs(5), subscriber.recv())
            .await
            .expect("recv timed out")
            .expect("recv failed");
        assert_eq!(received.seq, seq);
    }
}

#[tokio::test]
async fn test_broadcast_reaches_all_subscribers() {
    let mut publisher = bound_publisher::<u32>().await;
    let addr = publisher.local_addr().unwrap();

    let mut sub1 = MessageBus::<u32>::open(BusConfig::new(addr.to_string(), Role::Subscribe))
        .await
        .unwrap();
    let mut sub2 = MessageBus::<u32>::open(BusConfig::new(addr.to_string(), Role::Subscribe))
        .await
        .unwrap();

    sleep(Duration::from_millis(50)).await;
    assert_eq!(publisher.peer_count().await, 2);

    publisher.send(&42u32).await.expect("send failed");

    for sub in [&mut sub1, &mut sub2] {
        let value = timeout(Duration::from_secs(5), sub.recv())
            .await
            .expect("recv timed out")
            .expect("recv failed");
        assert_eq!(value, 42);
    }
}

#[tokio::test]
async fn test_dead_peer_is_pruned_on_send() {
    let mut publisher = bound_publisher::<u32>().await;
    let addr = publisher.local_addr().unwrap();

    let mut sub1 = MessageBus::<u32>::open(BusConfig::new(addr.to_string(), Role::Subscribe))
        .await
        .unwrap();
    let sub2 = MessageBus::<u32>::open(BusConfig::new(addr.to_string(), Role::Subscribe))
        .await
        .unwrap();

    sleep(Duration::from_millis(50)).await;
    assert_eq!(publisher.peer_count().await, 2);

    drop(sub2);
    sleep(Duration::from_millis(50)).await;

    // First send detects the dead peer and prunes it
    publisher.send(&1u32).await.expect("send failed");
    publisher.send(&2u32).await.expect("send failed");

    assert_eq!(
        timeout(Duration::from_secs(5), sub1.recv()).await.unwrap().unwrap(),
        1
    );
    assert_eq!(
        timeout(Duration::from_secs(5), sub1.recv()).await.unwrap().unwrap(),
        2
    );
}

#[tokio::test]
async fn test_subscription_prefix_filter() {
    let mut publisher = bound_publisher::<String>().await;
    let addr = publisher.local_addr().unwrap();

    // JSON strings serialize with a leading quote, so "\"a" matches strings
    // starting with 'a'.
    let mut subscriber = MessageBus::<String>::open(
        BusConfig::new(addr.to_string(), Role::Subscribe).with_subscribe("\"a"),
    )
    .await
    .unwrap();

    sleep(Duration::from_millis(50)).await;

    publisher.send(&"banana".to_string()).await.unwrap();
    publisher.send(&"apple".to_string()).await.unwrap();

    let received = timeout(Duration::from_secs(5), subscriber.recv())
        .await
        .expect("recv timed out")
        .expect("recv failed");
    assert_eq!(received, "apple");
}

#[tokio::test]
async fn test_send_requires_publish_role() {
    let mut subscriber =
        MessageBus::<u32>::open(BusConfig::new("127.0.0.1:0", Role::Subscribe).with_bind(true))
            .await
            .unwrap();

    let result = subscriber.send(&1u32).await;
    assert!(matches!(result, Err(ComError::RoleMismatch(_))));
}

#[tokio::test]
async fn test_close_is_idempotent_and_final() {
    let mut publisher = bound_publisher::<u32>().await;

    publisher.close().await;
    publisher.close().await;

    let result = publisher.send(&1u32).await;
    assert!(matches!(result, Err(ComError::Closed)));
}

#[tokio::test]
async fn test_recv_reports_connection_closed() {
    let mut publisher = bound_publisher::<u32>().await;
    let addr = publisher.local_addr().unwrap();

    let mut subscriber = MessageBus::<u32>::open(BusConfig::new(addr.to_string(), Role::Subscribe))
        .await
        .unwrap();

    sleep(Duration::from_millis(50)).await;
    publisher.close().await;

    let result = timeout(Duration::from_secs(5), subscriber.recv())
        .await
        .expect("recv timed out");
    assert!(matches!(result, Err(ComError::ConnectionClosed)));
}

#[tokio::test]
async fn test_oversized_line_is_rejected_while_reading() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // One endless line, never a newline: the reader must cut it off at the
    // limit instead of buffering it all.
    let writer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let payload = vec![b'a'; MAX_MESSAGE_LEN + 3];
        stream.write_all(&payload).await.unwrap();
    });

    let mut subscriber =
        MessageBus::<String>::open(BusConfig::new(addr.to_string(), Role::Subscribe))
            .await
            .unwrap();

    let result = timeout(Duration::from_secs(10), subscriber.recv())
        .await
        .expect("recv timed out");
    assert!(matches!(result, Err(ComError::MessageTooLarge(_))));

    writer.await.unwrap();
}

#[tokio::test]
async fn test_open_rejects_unsupported_scheme() {
    let result = MessageBus::<u32>::open(BusConfig::new("ipc:///tmp/pipe", Role::Publish)).await;
    assert!(matches!(result, Err(ComError::Endpoint(_))));
}
