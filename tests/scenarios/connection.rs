//! Connection scenario tests

use crate::harness::{Clients, TestIrcd};
use ircprobe::unique_name;

/// Test: JOIN is echoed back and matched case-insensitively
#[tokio::test]
async fn test_join_channel() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let mut clients = Clients::new();
    let c = clients.track(ircd.connect_as("testuser3").await.expect("connect"));
    let client = clients.get(c);

    client.join("#test");

    let join_msg = client.wait_for_raw("(?i)join.*#test").await.expect("no JOIN");
    assert!(join_msg.contains("#test"));
    assert!(join_msg.starts_with(":testuser3!"));

    clients.cleanup().await;
}

/// Test: NICK change is confirmed and tracked
#[tokio::test]
async fn test_change_nick() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("oldnick1").await.expect("connect");

    client.change_nick("newnick1");

    let nick_msg = client
        .wait_for_raw("(?i)NICK.*newnick1")
        .await
        .expect("no NICK confirmation");
    assert!(nick_msg.contains("newnick1"));
    assert_eq!(client.nick(), "newnick1");

    client.disconnect("done").await;
}

/// Test: nick collision surfaces as a 433 reply, nick unchanged
#[tokio::test]
async fn test_nick_in_use() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let first = ircd.connect_as("taken").await.expect("connect first");
    let second = ircd.connect_as("other").await.expect("connect second");

    second.change_nick("taken");
    let reply = second.wait_for_raw(" 433 ").await.expect("no 433");
    assert!(reply.contains("Nickname is already in use"));
    assert_eq!(second.nick(), "other");

    first.disconnect("done").await;
    second.disconnect("done").await;
}

/// Test: server PING is answered automatically
#[tokio::test]
async fn test_ping_answered() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("pinged").await.expect("connect");

    let token = unique_name("tok");
    ircd.broadcast(&format!("PING :{}", token));

    let ack = client
        .wait_for_raw(format!("PONG received {}", token))
        .await
        .expect("server never saw PONG");
    assert!(ack.contains(&token));

    client.disconnect("done").await;
}

/// Test: registration and named events are visible to wait_for_event
#[tokio::test]
async fn test_join_event() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("evented").await.expect("connect");
    let channel = unique_name("#ev");

    let (event, _) = tokio::join!(client.wait_for_event("join"), async {
        client.join(&channel)
    });
    let event = event.expect("no join event");

    match event {
        ircprobe::Event::Message(msg) => {
            assert_eq!(msg.command, "JOIN");
            assert_eq!(msg.params, vec![channel]);
            assert_eq!(msg.source_nick(), Some("evented"));
        }
        other => panic!("unexpected event {:?}", other),
    }

    client.disconnect("done").await;
}
