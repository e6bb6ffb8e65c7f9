//! Server assembly: credential store, engine and gateway.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, SharedConfig};
use crate::db;
use crate::engine::Engine;
use crate::handlers::Registry;
use crate::network::Gateway;
use crate::state::{ServerState, Stats};

/// A bound, ready-to-run server.
pub struct Server {
    engine: Engine,
    gateway: Gateway,
    shutdown: CancellationToken,
}

impl Server {
    /// Open the credential store, build the engine and bind the listener.
    ///
    /// `config_path` is remembered for REHASH.
    pub async fn build(config: Config, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let store = db::open(config.database.as_ref()).await?;
        let shared = SharedConfig::new(config);
        let config = shared.current();

        let (events, queue) = mpsc::channel(config.limits.queue);
        let state = ServerState::new(shared.clone(), config_path, store, Arc::new(Stats::default()));
        let engine = Engine::new(state, Registry::new(), queue);

        let shutdown = CancellationToken::new();
        let gateway = Gateway::bind(config.listen.address, events, shared, shutdown.clone()).await?;

        Ok(Self {
            engine,
            gateway,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.gateway.local_addr()
    }

    /// Cancelling this token shuts the server down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until the shutdown token is cancelled.
    ///
    /// Connections are closed first; the engine stops once the last of
    /// them has handed in its disconnect.
    pub async fn run(self) -> anyhow::Result<()> {
        let engine = tokio::spawn(self.engine.run());
        self.gateway.run().await;
        engine.await?;
        info!("Server stopped");
        Ok(())
    }
}
