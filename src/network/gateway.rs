//! Gateway - TCP listener that accepts incoming connections.
//!
//! Every accepted socket gets a [`Connection`] supervisor with its own
//! child of the server's cancellation token, tracked so that shutdown can
//! wait for all of them.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, instrument};

use crate::config::SharedConfig;
use crate::engine::EngineEvent;
use crate::network::Connection;
use crate::state::ClientIdGenerator;

/// The Gateway accepts incoming TCP connections and spawns supervisors.
pub struct Gateway {
    listener: TcpListener,
    events: mpsc::Sender<EngineEvent>,
    config: SharedConfig,
    ids: Arc<ClientIdGenerator>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(
        addr: SocketAddr,
        events: mpsc::Sender<EngineEvent>,
        config: SharedConfig,
        shutdown: CancellationToken,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "Plaintext listener bound");
        Ok(Self {
            listener,
            events,
            config,
            ids: Arc::new(ClientIdGenerator::default()),
            shutdown,
            tracker: TaskTracker::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until shutdown, then wait for every connection to finish.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let id = self.ids.next();
                        info!(client = %id, %addr, "Connection accepted");
                        if let Err(e) = stream.set_nodelay(true) {
                            error!(%addr, error = %e, "Failed to set TCP_NODELAY");
                        }
                        let connection = Connection::new(
                            id,
                            stream,
                            addr,
                            self.events.clone(),
                            self.config.clone(),
                            self.shutdown.child_token(),
                        );
                        self.tracker.spawn(connection.run());
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
            }
        }

        info!(open = self.tracker.len(), "Listener closed, waiting for connections");
        self.tracker.close();
        self.tracker.wait().await;
        info!("All connections closed");
    }
}
