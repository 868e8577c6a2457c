//! Service bot scenario tests

use std::time::Duration;

use crate::harness::TestIrcd;
use ircprobe::unique_name;

const SERVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// Test: AuthServ answers HELP with a NOTICE
#[tokio::test]
async fn test_authserv_help() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("authtest1").await.expect("connect");

    client.say("AuthServ", "HELP");

    let response = client
        .wait_for_raw_timeout("(?i)AuthServ.*NOTICE", SERVICE_TIMEOUT)
        .await
        .expect("no AuthServ response");
    assert!(response.contains("HELP"));

    client.disconnect("done").await;
}

/// Test: ChanServ REGISTER after joining a fresh channel
#[tokio::test]
async fn test_chanserv_register() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("chanreg1").await.expect("connect");

    let channel = unique_name("#testchan");
    client.join(&channel);
    client
        .wait_for_raw(format!("(?i)JOIN.*{}", regex::escape(&channel)))
        .await
        .expect("no JOIN");

    client.say("ChanServ", &format!("REGISTER {}", channel));
    let response = client
        .wait_for_raw_timeout("(?i)ChanServ", SERVICE_TIMEOUT)
        .await
        .expect("no ChanServ response");
    assert!(response.contains(&channel));

    client.disconnect("done").await;
}

/// Test: OpServ answers even without oper status
#[tokio::test]
async fn test_opserv_help() {
    let ircd = TestIrcd::start().await.expect("Failed to start ircd");
    let client = ircd.connect_as("optest1").await.expect("connect");

    client.say("OpServ", "HELP");
    let response = client
        .wait_for_raw_timeout("(?i)OpServ.*NOTICE", SERVICE_TIMEOUT)
        .await
        .expect("no OpServ response");
    assert!(response.starts_with(":OpServ!"));

    client.disconnect("done").await;
}
