//! Test server management.
//!
//! Runs a gossipd instance in-process on an ephemeral port.

use std::net::SocketAddr;

use gossipd::Server;
use gossipd::config::Config;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const BASE_CONFIG: &str = r#"
[server]
name = "test.server"
network = "TestNet"
description = "Test IRC Server"
motd = ["Test Server"]

[listen]
address = "127.0.0.1:0"

[timeouts]
registration = 5

[[oper]]
name = "testop"
password = "testpass"
"#;

/// A test server instance.
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
    _dir: TempDir,
}

impl TestServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with("").await
    }

    /// Spawn a server with `extra` appended to the `[server]` table.
    pub async fn spawn_with(extra: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("config.toml");
        let content = BASE_CONFIG.replacen(
            "motd = [\"Test Server\"]",
            &format!("motd = [\"Test Server\"]\n{extra}"),
            1,
        );
        std::fs::write(&config_path, content)?;

        let config = Config::load(&config_path)?;
        let server = Server::build(config, Some(config_path)).await?;
        let addr = server.local_addr()?;
        let shutdown = server.shutdown_token();
        let handle = tokio::spawn(server.run());

        Ok(Self {
            addr,
            shutdown,
            handle: Some(handle),
            _dir: dir,
        })
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self, nick: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address(), nick).await
    }

    /// Connect and register in one step.
    #[allow(dead_code)]
    pub async fn registered(&self, nick: &str) -> anyhow::Result<super::client::TestClient> {
        let mut client = self.connect(nick).await?;
        client.register().await?;
        client.drain().await;
        Ok(client)
    }

    /// Shut down and wait for the server task to finish.
    #[allow(dead_code)]
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
