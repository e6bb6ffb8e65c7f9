//! Integration tests for capability negotiation and cap-gated output.

mod common;

use common::TestServer;

#[tokio::test]
async fn cap_negotiation_holds_registration() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.connect("alice").await.unwrap();

    alice.send_raw("CAP LS 302").await.unwrap();
    let ls = alice.expect("CAP").await.unwrap();
    assert_eq!(ls.arg(1), Some("LS"));
    let offered = ls.trailing_param().unwrap_or_default();
    assert!(offered.split(' ').any(|c| c == "message-tags"));

    alice.send_raw("NICK alice").await.unwrap();
    alice.send_raw("USER alice 0 * :Alice").await.unwrap();
    alice.send_raw("CAP REQ :message-tags echo-message").await.unwrap();
    let ack = alice.expect("CAP").await.unwrap();
    assert_eq!(ack.arg(1), Some("ACK"));

    // Nothing but the ACK until CAP END.
    assert!(alice.drain().await.is_empty());
    alice.send_raw("CAP END").await.unwrap();
    alice.expect("001").await.expect("No 001 after CAP END");
}

#[tokio::test]
async fn unknown_cap_is_nakked_whole() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();

    alice.send_raw("CAP REQ :message-tags bogus-cap").await.unwrap();
    let nak = alice.expect("CAP").await.unwrap();
    assert_eq!(nak.arg(1), Some("NAK"));
    assert_eq!(nak.trailing_param(), Some("message-tags bogus-cap"));
}

#[tokio::test]
async fn client_tags_only_reach_capable_clients() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();
    let mut bob = server.registered("bob").await.unwrap();
    let mut carol = server.registered("carol").await.unwrap();

    carol.send_raw("CAP REQ :message-tags").await.unwrap();
    carol.expect("CAP").await.unwrap();

    alice
        .send_raw("@+draft/react=lol PRIVMSG bob,carol :hello")
        .await
        .unwrap();

    let to_bob = bob.expect("PRIVMSG").await.unwrap();
    assert!(to_bob.tags.is_empty(), "bob got tags: {to_bob}");

    let to_carol = carol.expect("PRIVMSG").await.unwrap();
    assert_eq!(to_carol.tag_value("draft/react").as_deref(), Some("lol"));
    assert!(to_carol.has_tag("msgid"));
}

#[tokio::test]
async fn echo_message_returns_own_privmsg() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();
    let _bob = server.registered("bob").await.unwrap();

    alice.send_raw("CAP REQ :echo-message").await.unwrap();
    alice.expect("CAP").await.unwrap();
    alice.privmsg("bob", "ping?").await.unwrap();

    let echo = alice.expect("PRIVMSG").await.expect("No echo");
    assert_eq!(echo.arg(0), Some("bob"));
    assert_eq!(echo.trailing_param(), Some("ping?"));
}

#[tokio::test]
async fn labeled_response_tags_the_reply() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();

    alice
        .send_raw("CAP REQ :labeled-response message-tags")
        .await
        .unwrap();
    alice.expect("CAP").await.unwrap();

    alice.send_raw("@label=abc PING :hello").await.unwrap();
    let pong = alice.expect("PONG").await.unwrap();
    assert_eq!(pong.tag_value("label").as_deref(), Some("abc"));
}

#[tokio::test]
async fn away_notify_reaches_co_members() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();
    let mut bob = server.registered("bob").await.unwrap();

    bob.send_raw("CAP REQ :away-notify").await.unwrap();
    bob.expect("CAP").await.unwrap();
    alice.join("#away").await.unwrap();
    alice.expect("366").await.unwrap();
    bob.join("#away").await.unwrap();
    bob.expect("366").await.unwrap();

    alice.send_raw("AWAY :lunch").await.unwrap();
    alice.expect("306").await.unwrap();
    let away = bob.expect("AWAY").await.unwrap();
    assert_eq!(away.trailing_param(), Some("lunch"));

    bob.privmsg("alice", "you there?").await.unwrap();
    let auto = bob.expect("301").await.unwrap();
    assert_eq!(auto.trailing_param(), Some("lunch"));
}

#[tokio::test]
async fn monitor_reports_online_and_offline() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.unwrap();

    alice.send_raw("MONITOR + bob").await.unwrap();
    let offline = alice.expect("731").await.unwrap();
    assert_eq!(offline.trailing_param(), Some("bob"));

    let mut bob = server.registered("bob").await.unwrap();
    let online = alice.expect("730").await.unwrap();
    assert!(online.trailing_param().unwrap_or_default().starts_with("bob!"));

    bob.send_raw("QUIT").await.unwrap();
    let gone = alice.expect("731").await.unwrap();
    assert_eq!(gone.trailing_param(), Some("bob"));
}
