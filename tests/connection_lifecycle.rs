//! Integration tests for registration, connection passwords and QUIT.

mod common;

use common::TestServer;

#[tokio::test]
async fn registration_sends_welcome_and_motd() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.connect("alice").await.expect("Failed to connect alice");

    alice.register().await.expect("Alice registration failed");
    let burst = alice
        .recv_until(|m| m.command == "376")
        .await
        .expect("MOTD never ended");

    let codes: Vec<&str> = burst.iter().map(|m| m.command.as_str()).collect();
    assert!(codes.starts_with(&["002", "003", "004", "005"]));
    assert!(codes.contains(&"372"));
}

#[tokio::test]
async fn quit_sends_error_then_closes() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.expect("Alice registration failed");

    alice.send_raw("QUIT :done").await.expect("Alice quit failed");
    let error = alice.expect("ERROR").await.expect("No ERROR after QUIT");
    assert_eq!(error.trailing_param(), Some("alice quit"));
    assert!(alice.closed().await);
}

#[tokio::test]
async fn quit_is_seen_by_channel_peers() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.expect("Alice registration failed");
    let mut bob = server.registered("bob").await.expect("Bob registration failed");

    alice.join("#room").await.unwrap();
    alice.expect("366").await.unwrap();
    bob.join("#room").await.unwrap();
    bob.expect("366").await.unwrap();

    alice.send_raw("QUIT :gone fishing").await.unwrap();
    let quit = bob.expect("QUIT").await.expect("Bob never saw the QUIT");
    assert_eq!(quit.source.as_ref().map(|s| s.nick.as_str()), Some("alice"));
    assert_eq!(quit.trailing_param(), Some("gone fishing"));
}

#[tokio::test]
async fn nick_collision_is_rejected() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let _alice = server.registered("alice").await.expect("Alice registration failed");

    let mut imposter = server.connect("ALICE").await.unwrap();
    imposter.send_raw("NICK ALICE").await.unwrap();
    let reply = imposter.expect("433").await.expect("No 433 for a taken nick");
    assert_eq!(reply.arg(1), Some("ALICE"));
}

#[tokio::test]
async fn wrong_password_is_refused() {
    let server = TestServer::spawn_with(r#"password = "letmein""#)
        .await
        .expect("Failed to spawn test server");
    let mut alice = server.connect("alice").await.unwrap();

    alice.send_raw("PASS hunter2").await.unwrap();
    alice.send_raw("NICK alice").await.unwrap();
    alice.send_raw("USER alice 0 * :Alice").await.unwrap();

    alice.expect("464").await.expect("No 464 for a bad password");
    let error = alice.expect("ERROR").await.expect("No ERROR for a bad password");
    assert_eq!(
        error.trailing_param(),
        Some("Closing Link: test.server (Bad Password)")
    );
    assert!(alice.closed().await);
}

#[tokio::test]
async fn correct_password_registers() {
    let server = TestServer::spawn_with(r#"password = "letmein""#)
        .await
        .expect("Failed to spawn test server");
    let mut alice = server.connect("alice").await.unwrap();

    alice.send_raw("PASS letmein").await.unwrap();
    alice.register().await.expect("Registration with the right password failed");
}

#[tokio::test]
async fn server_shutdown_closes_clients() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let mut alice = server.registered("alice").await.expect("Alice registration failed");

    server.stop().await.expect("Server did not stop cleanly");
    assert!(alice.closed().await);
}
