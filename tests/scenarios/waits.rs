//! Wait engine scenario tests
//!
//! Ordering, history vs live matches, timeouts and per-client isolation

use std::time::{Duration, Instant};

use crate::harness::TestIrcd;
use ircprobe::{unique_name, Error};

/// Test: the first matching line wins, whether buffered or live
#[tokio::test]
async fn test_first_match_in_arrival_order() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("orderly").await.expect("connect");

    for i in 1..=3 {
        ircd.broadcast(&format!(":irc.test NOTICE orderly :seq {}", i));
    }

    let first = client.wait_for_raw(r"seq \d").await.expect("no seq line");
    assert!(first.ends_with("seq 1"), "got {}", first);

    // All three arrive, in order, and the wait did not consume anything
    client.wait_for_raw("seq 3").await.expect("no seq 3");
    let seqs: Vec<String> = client
        .raw_messages()
        .into_iter()
        .filter(|l| l.contains("seq "))
        .collect();
    assert_eq!(seqs.len(), 3);
    assert!(seqs[0].ends_with("seq 1") && seqs[2].ends_with("seq 3"));

    client.disconnect("done").await;
}

/// Test: a line that arrived before the wait and one that arrives after are
/// both valid matches
#[tokio::test]
async fn test_history_and_live_matches() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("histlive").await.expect("connect");

    let early = unique_name("early");
    ircd.broadcast(&format!(":irc.test NOTICE histlive :{}", early));
    // Give the line time to land in the buffer before waiting
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.raw_messages().iter().any(|l| l.contains(&early)));
    let from_history = client.wait_for_raw(early.as_str()).await.expect("history miss");
    assert!(from_history.contains(&early));

    let late = unique_name("late");
    let (from_live, _) = tokio::join!(client.wait_for_raw(late.as_str()), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        ircd.broadcast(&format!(":irc.test NOTICE histlive :{}", late));
    });
    assert!(from_live.expect("live miss").contains(&late));

    client.disconnect("done").await;
}

/// Test: unmatched pattern fails after the given timeout, not before and not
/// much later, with recent traffic in the message
#[tokio::test]
async fn test_raw_timeout() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("timeouter").await.expect("connect");
    // Let the rest of the welcome burst land first
    client.wait_for_raw(" 376 ").await.expect("no end of MOTD");
    let before = client.raw_messages();

    let timeout = Duration::from_millis(300);
    let started = Instant::now();
    let err = client
        .wait_for_raw_timeout("nonexistent-pattern", timeout)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(elapsed >= timeout, "failed early: {:?}", elapsed);
    assert!(elapsed < timeout + Duration::from_secs(1), "failed late: {:?}", elapsed);

    match &err {
        Error::RawTimeout { pattern, recent, .. } => {
            assert_eq!(pattern, "nonexistent-pattern");
            assert!(recent.iter().any(|l| l.contains(" 001 ")));
        }
        other => panic!("expected RawTimeout, got {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("nonexistent-pattern"));
    assert!(message.contains("Received:"));

    // The failed wait left the buffer alone and the client usable
    assert_eq!(client.raw_messages(), before);
    client.join("#after-timeout");
    client
        .wait_for_raw("JOIN :#after-timeout")
        .await
        .expect("client unusable after timeout");

    client.disconnect("done").await;
}

/// Test: event wait timeout names the event
#[tokio::test]
async fn test_event_timeout() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("evtimeout").await.expect("connect");

    // Registration happened already; event waits do not look back
    let err = client
        .wait_for_event_timeout("registered", Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EventTimeout { ref event, .. } if event == "registered"));
    assert!(err.to_string().contains("registered"));

    client.disconnect("done").await;
}

/// Test: clients never see each other's traffic
#[tokio::test]
async fn test_clients_are_isolated() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let a = ircd.connect_as("isoa").await.expect("connect a");
    let b = ircd.connect_as("isob").await.expect("connect b");
    let c = ircd.connect_as("isoc").await.expect("connect c");

    let secret = unique_name("only-for-a-");
    c.say("isoa", &secret);

    let got = a.wait_for_raw(secret.as_str()).await.expect("a missed it");
    assert!(got.contains(&secret));

    let err = b
        .wait_for_raw_timeout(secret.as_str(), Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RawTimeout { .. }));
    assert!(!b.raw_messages().iter().any(|l| l.contains(&secret)));

    for client in [a, b, c] {
        client.disconnect("done").await;
    }
}

/// Test: two concurrent waits with overlapping patterns both get the line
#[tokio::test]
async fn test_overlapping_waits_share_a_line() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("overlap").await.expect("connect");
    let marker = unique_name("hello-");

    let (first, second, _) = tokio::join!(
        client.wait_for_raw("hello-"),
        client.wait_for_raw(marker.as_str()),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ircd.broadcast(&format!(":irc.test NOTICE overlap :{}", marker));
        }
    );
    let (first, second) = (first.expect("first"), second.expect("second"));
    assert_eq!(first, second);
    assert!(first.contains(&marker));

    client.disconnect("done").await;
}

/// Test: clearing the buffer forgets history but the client keeps working
#[tokio::test]
async fn test_clear_raw_buffer() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("clearer").await.expect("connect");
    assert!(!client.raw_messages().is_empty());

    client.clear_raw_buffer();
    assert!(client.raw_messages().is_empty());

    let err = client
        .wait_for_raw_timeout(" 001 ", Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    client.join("#fresh");
    client.wait_for_raw("#fresh").await.expect("no JOIN after clear");
    assert_eq!(client.history()[0].text, client.raw_messages()[0]);
    assert!(client.history()[0].index > 0);

    client.disconnect("done").await;
}
