//! Connection supervisor.
//!
//! One task per accepted socket. The read half is decoded into lines,
//! parsed, and forwarded to the engine as [`EngineEvent::Line`]. A separate
//! writer task drains the client's outbound queue until the engine drops
//! the sending side, so anything queued before removal (an `ERROR` for
//! instance) still reaches the socket. A timer drives the PING watchdog.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use gossip_proto::{Frame, LineCodec, Message};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::{SharedConfig, TimeoutsConfig};
use crate::engine::EngineEvent;
use crate::state::ClientId;

/// Upper bound between watchdog checks.
const PING_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// How long to wait for queued output after the engine let go of a client.
const WRITER_GRACE: Duration = Duration::from_secs(5);

/// What the watchdog wants done after a check.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchdogAction {
    Idle,
    SendPing,
    Timeout(String),
}

/// Idle and registration timing for one connection.
#[derive(Debug)]
struct Watchdog {
    accepted: Instant,
    last_activity: Instant,
    ping_sent_at: Option<Instant>,
    registered: bool,
}

impl Watchdog {
    fn new(now: Instant) -> Self {
        Self {
            accepted: now,
            last_activity: now,
            ping_sent_at: None,
            registered: false,
        }
    }

    /// Any input counts as a PONG.
    fn activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.ping_sent_at = None;
    }

    fn check(&mut self, now: Instant, timeouts: &TimeoutsConfig) -> WatchdogAction {
        if !self.registered {
            if now.duration_since(self.accepted) >= timeouts.registration() {
                return WatchdogAction::Timeout("Registration timed out".to_owned());
            }
            return WatchdogAction::Idle;
        }

        let idle = now.duration_since(self.last_activity);
        match self.ping_sent_at {
            Some(sent_at) if now.duration_since(sent_at) >= timeouts.timeout() => {
                WatchdogAction::Timeout(format!("Ping timeout: {} seconds", idle.as_secs()))
            }
            Some(_) => WatchdogAction::Idle,
            None if idle >= timeouts.ping() => {
                self.ping_sent_at = Some(now);
                WatchdogAction::SendPing
            }
            None => WatchdogAction::Idle,
        }
    }
}

/// A single client connection.
pub struct Connection {
    stream: TcpStream,
    session: Session,
}

/// Everything the read loop needs once the socket has been split.
struct Session {
    id: ClientId,
    addr: SocketAddr,
    events: mpsc::Sender<EngineEvent>,
    config: SharedConfig,
    cancel: CancellationToken,
}

impl Connection {
    pub fn new(
        id: ClientId,
        stream: TcpStream,
        addr: SocketAddr,
        events: mpsc::Sender<EngineEvent>,
        config: SharedConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            stream,
            session: Session {
                id,
                addr,
                events,
                config,
                cancel,
            },
        }
    }

    /// Run until the client leaves, is dropped by the engine, or the
    /// server shuts down.
    #[instrument(skip(self), name = "connection", fields(client = %self.session.id, addr = %self.session.addr))]
    pub async fn run(self) {
        let Connection { stream, session } = self;
        session.run(stream).await;
    }
}

impl Session {
    async fn run(self, stream: TcpStream) {
        let config = self.config.current();
        let (reader, writer) = stream.into_split();
        let mut lines = FramedRead::new(reader, LineCodec::new());
        let sink = FramedWrite::new(writer, LineCodec::new());

        let (outbox, queue) = mpsc::channel(config.limits.sendq);
        let pinger = outbox.downgrade();
        let (registered_tx, registered_rx) = oneshot::channel();
        let mut writer = tokio::spawn(write_loop(sink, queue, self.cancel.clone()));

        let attach = EngineEvent::Connect {
            id: self.id,
            host: host_for(self.addr),
            cert_fp: None,
            outbox,
            cancel: self.cancel.clone(),
            registered: registered_tx,
        };
        if self.events.send(attach).await.is_err() {
            writer.abort();
            return;
        }

        let reason = self.read_loop(&mut lines, &pinger, registered_rx).await;
        info!(reason = %reason, "Connection closing");
        let _ = self
            .events
            .send(EngineEvent::Disconnect {
                id: self.id,
                reason,
            })
            .await;

        if tokio::time::timeout(WRITER_GRACE, &mut writer).await.is_err() {
            debug!("Writer still busy, aborting");
            writer.abort();
        }
    }

    async fn read_loop(
        &self,
        lines: &mut FramedRead<tokio::net::tcp::OwnedReadHalf, LineCodec>,
        pinger: &mpsc::WeakSender<Message>,
        mut registered_rx: oneshot::Receiver<()>,
    ) -> String {
        let timeouts = self.config.current().timeouts.clone();
        let mut watchdog = Watchdog::new(Instant::now());
        let mut ticker = tokio::time::interval(PING_CHECK_INTERVAL.min(timeouts.ping()));
        // First tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return "Connection closed".to_owned();
                }
                frame = lines.next() => {
                    let event = match frame {
                        Some(Ok(Frame::Line(bytes))) => {
                            watchdog.activity(Instant::now());
                            match self.parse(&bytes) {
                                Some(msg) => EngineEvent::Line { id: self.id, msg },
                                None => continue,
                            }
                        }
                        Some(Ok(Frame::Overflow)) => {
                            watchdog.activity(Instant::now());
                            EngineEvent::Overflow { id: self.id }
                        }
                        Some(Err(e)) => return format!("Read error: {e}"),
                        None => return "Connection closed".to_owned(),
                    };
                    if self.events.send(event).await.is_err() {
                        return "Server shutting down".to_owned();
                    }
                }
                res = &mut registered_rx, if !watchdog.registered => {
                    watchdog.registered = true;
                    if res.is_ok() {
                        debug!("Registered, watchdog armed");
                    }
                }
                _ = ticker.tick() => {
                    let timeouts = self.config.current().timeouts.clone();
                    match watchdog.check(Instant::now(), &timeouts) {
                        WatchdogAction::Idle => {}
                        WatchdogAction::SendPing => {
                            let server = self.config.current().server.name.clone();
                            let ping = Message::new("PING").trailing(server);
                            if let Some(tx) = pinger.upgrade() {
                                let _ = tx.try_send(ping);
                            }
                        }
                        WatchdogAction::Timeout(reason) => {
                            warn!(reason = %reason, "Disconnecting idle client");
                            let error = Message::new("ERROR")
                                .trailing(format!("Closing Link: {} ({reason})", host_for(self.addr)));
                            if let Some(tx) = pinger.upgrade() {
                                let _ = tx.try_send(error);
                            }
                            return reason;
                        }
                    }
                }
            }
        }
    }

    fn parse(&self, bytes: &[u8]) -> Option<Message> {
        let opts = self.config.current().parse_options();
        match Message::parse_with(bytes, &opts) {
            Ok(parsed) => {
                if !parsed.rejected_tags.is_empty() {
                    debug!(tags = ?parsed.rejected_tags, "Dropped ill-formed tags");
                }
                Some(parsed.message)
            }
            Err(e) => {
                debug!(error = %e, line = %String::from_utf8_lossy(bytes).trim_end(), "Dropping unparseable line");
                None
            }
        }
    }
}

/// Drain the outbound queue onto the socket.
async fn write_loop(
    mut sink: FramedWrite<OwnedWriteHalf, LineCodec>,
    mut queue: mpsc::Receiver<Message>,
    cancel: CancellationToken,
) {
    while let Some(msg) = queue.recv().await {
        let result = if queue.is_empty() {
            sink.send(msg).await
        } else {
            sink.feed(msg).await
        };
        if let Err(e) = result {
            debug!(error = %e, "Write failed");
            cancel.cancel();
            return;
        }
    }
    let _ = sink.flush().await;
    let _ = sink.get_mut().shutdown().await;
}

/// Hostname shown for a peer address.
///
/// IPv6 literals starting with `:` would be read as a trailing parameter.
fn host_for(addr: SocketAddr) -> String {
    let ip = addr.ip().to_string();
    if ip.starts_with(':') { format!("0{ip}") } else { ip }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeouts() -> TimeoutsConfig {
        toml::from_str("ping = 90\ntimeout = 120\nregistration = 60\n").unwrap()
    }

    #[test]
    fn unregistered_clients_time_out() {
        let start = Instant::now();
        let mut dog = Watchdog::new(start);
        assert_eq!(dog.check(start + Duration::from_secs(59), &timeouts()), WatchdogAction::Idle);
        assert_eq!(
            dog.check(start + Duration::from_secs(60), &timeouts()),
            WatchdogAction::Timeout("Registration timed out".into())
        );
    }

    #[test]
    fn idle_client_is_pinged_then_dropped() {
        let start = Instant::now();
        let mut dog = Watchdog::new(start);
        dog.registered = true;

        assert_eq!(dog.check(start + Duration::from_secs(30), &timeouts()), WatchdogAction::Idle);
        let pinged = start + Duration::from_secs(90);
        assert_eq!(dog.check(pinged, &timeouts()), WatchdogAction::SendPing);
        assert_eq!(dog.check(pinged + Duration::from_secs(60), &timeouts()), WatchdogAction::Idle);
        assert_eq!(
            dog.check(pinged + Duration::from_secs(120), &timeouts()),
            WatchdogAction::Timeout("Ping timeout: 210 seconds".into())
        );
    }

    #[test]
    fn activity_resets_ping() {
        let start = Instant::now();
        let mut dog = Watchdog::new(start);
        dog.registered = true;
        let pinged = start + Duration::from_secs(90);
        assert_eq!(dog.check(pinged, &timeouts()), WatchdogAction::SendPing);
        dog.activity(pinged + Duration::from_secs(1));
        assert_eq!(dog.check(pinged + Duration::from_secs(60), &timeouts()), WatchdogAction::Idle);
    }

    #[test]
    fn ipv6_hosts_never_start_with_colon() {
        assert_eq!(host_for("[::1]:6667".parse().unwrap()), "0::1");
        assert_eq!(host_for("127.0.0.1:6667".parse().unwrap()), "127.0.0.1");
    }
}
