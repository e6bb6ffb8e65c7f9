//! Integration tests for OPER, WALLOPS and CHGHOST.

mod common;

use common::TestServer;

#[tokio::test]
async fn oper_without_params() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();

    alice.send_raw("OPER").await.unwrap();
    let reply = alice.expect("461").await.expect("No 461 for a bare OPER");
    assert_eq!(reply.arg(1), Some("OPER"));
}

#[tokio::test]
async fn oper_with_wrong_password() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();

    alice.send_raw("OPER testop nope").await.unwrap();
    alice.expect("464").await.expect("No 464 for a bad oper password");
}

#[tokio::test]
async fn oper_grants_mode_and_privileges() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();
    let mut bob = server.registered("bob").await.unwrap();

    // Not an operator yet.
    alice.send_raw("WALLOPS :too early").await.unwrap();
    alice.expect("481").await.expect("No 481 before OPER");

    alice.send_raw("OPER testop testpass").await.unwrap();
    alice.expect("381").await.expect("No 381 for a good OPER");
    let mode = alice.expect("MODE").await.unwrap();
    assert_eq!(mode.trailing_param(), Some("+o"));

    bob.send_raw("MODE bob +w").await.unwrap();
    bob.expect("MODE").await.unwrap();
    alice.send_raw("WALLOPS :maintenance at noon").await.unwrap();
    let wallops = bob.expect("WALLOPS").await.expect("Bob (+w) missed WALLOPS");
    assert_eq!(wallops.trailing_param(), Some("maintenance at noon"));
}

#[tokio::test]
async fn chghost_without_cap_looks_like_rejoin() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();
    let mut bob = server.registered("bob").await.unwrap();

    alice.send_raw("OPER testop testpass").await.unwrap();
    alice.expect("381").await.unwrap();
    alice.join("#lobby").await.unwrap();
    alice.expect("366").await.unwrap();
    bob.join("#lobby").await.unwrap();
    bob.expect("366").await.unwrap();

    alice.send_raw("CHGHOST alice staff gossip.example").await.unwrap();

    let quit = bob.expect("QUIT").await.unwrap();
    assert_eq!(quit.trailing_param(), Some("Changing host"));
    let join = bob.expect("JOIN").await.unwrap();
    let source = join.source.expect("JOIN without a source");
    assert_eq!(source.user.as_deref(), Some("staff"));
    assert_eq!(source.host.as_deref(), Some("gossip.example"));
    let mode = bob.expect("MODE").await.unwrap();
    assert_eq!(mode.arg(1), Some("+q"));
    assert_eq!(mode.arg(2), Some("alice"));
}
