//! Command execution engine.
//!
//! Connection supervisors never touch [`ServerState`]. They push
//! [`EngineEvent`]s onto one bounded queue, and a single task drains it,
//! running each command to completion before looking at the next. Every
//! check-then-act sequence inside a handler is therefore atomic with
//! respect to every other client. Events from one connection are applied
//! in the order the connection read them.

use gossip_proto::{Capability, Message, Response};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::HandlerError;
use crate::handlers::{Context, Registry};
use crate::state::{Client, ClientId, ServerState};

/// Work for the engine.
#[derive(Debug)]
pub enum EngineEvent {
    /// A connection was accepted.
    Connect {
        id: ClientId,
        host: String,
        cert_fp: Option<String>,
        outbox: mpsc::Sender<Message>,
        cancel: CancellationToken,
        registered: oneshot::Sender<()>,
    },
    /// A parsed line from the client.
    Line { id: ClientId, msg: Message },
    /// The client sent a line over the length limit.
    Overflow { id: ClientId },
    /// The connection is gone (EOF, I/O error, timeout).
    Disconnect { id: ClientId, reason: String },
}

impl EngineEvent {
    pub fn client(&self) -> ClientId {
        match self {
            Self::Connect { id, .. }
            | Self::Line { id, .. }
            | Self::Overflow { id }
            | Self::Disconnect { id, .. } => *id,
        }
    }
}

/// The single writer.
pub struct Engine {
    state: ServerState,
    registry: Registry,
    events: mpsc::Receiver<EngineEvent>,
}

impl Engine {
    pub fn new(state: ServerState, registry: Registry, events: mpsc::Receiver<EngineEvent>) -> Self {
        Self {
            state,
            registry,
            events,
        }
    }

    /// Process events until every sender is gone.
    pub async fn run(mut self) {
        info!("Engine started");
        while let Some(event) = self.events.recv().await {
            self.handle(event).await;
        }
        info!(clients = self.state.clients.len(), "Engine stopped");
    }

    /// Apply one event, then drop any clients it condemned.
    pub async fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Connect {
                id,
                host,
                cert_fp,
                outbox,
                cancel,
                registered,
            } => {
                self.state.stats.connection_opened();
                let client = Client::new(id, host, cert_fp, outbox, cancel, registered);
                self.state.clients.insert(id, client);
                debug!(client = %id, "Client attached");
            }
            EngineEvent::Line { id, msg } => self.command(id, msg).await,
            EngineEvent::Overflow { id } => {
                self.state.reply(id, Response::ERR_INPUTTOOLONG, &[]);
            }
            EngineEvent::Disconnect { id, reason } => {
                if self.state.client(id).is_some() {
                    info!(client = %id, reason = %reason, "Client disconnected");
                    self.state.quit_client(id, &reason);
                }
            }
        }

        while let Some((id, reason)) = self.state.take_kill() {
            info!(client = %id, reason = %reason, "Dropping client");
            self.state.quit_client(id, &reason);
        }
    }

    async fn command(&mut self, id: ClientId, msg: Message) {
        let Some(client) = self.state.client(id) else {
            debug!(client = %id, command = %msg.command, "Line from departed client");
            return;
        };
        let nick = client.nick_or_star().to_owned();
        let label = msg
            .tag_value("label")
            .filter(|l| !l.is_empty() && client.has_cap(Capability::LabeledResponse));

        if let Some(label) = label {
            self.state.begin_label(id, label);
        }
        let result = {
            let mut ctx = Context::new(id, &mut self.state);
            self.registry.dispatch(&mut ctx, &msg).await
        };
        self.state.finish_label();

        match result {
            Ok(()) => {}
            Err(HandlerError::Quit(reason)) => {
                let nick = self
                    .state
                    .client(id)
                    .map(|c| c.nick_or_star().to_owned())
                    .unwrap_or(nick);
                let farewell = format!("{nick} quit");
                self.state.send(id, Message::new("ERROR").trailing(farewell.as_str()));
                let reason = reason.unwrap_or(farewell);
                self.state.quit_client(id, &reason);
            }
            Err(HandlerError::AccessDenied) => {
                warn!(client = %id, "Closing connection after access denial");
                self.state.quit_client(id, "Access denied");
            }
            Err(e) => error!(client = %id, command = %msg.command, error = %e, "Unhandled command error"),
        }
    }

    /// Engine-owned state, for tests and diagnostics.
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, SharedConfig};
    use crate::db::MemoryStore;
    use crate::state::Stats;

    struct Peer {
        id: ClientId,
        rx: mpsc::Receiver<Message>,
        _registered: oneshot::Receiver<()>,
    }

    impl Peer {
        fn drain(&mut self) -> Vec<Message> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    fn engine() -> Engine {
        let config: Config = toml::from_str(
            "[server]\nname = \"irc.test\"\nnetwork = \"TestNet\"\n[listen]\naddress = \"127.0.0.1:0\"\n",
        )
        .unwrap();
        let state = ServerState::new(
            SharedConfig::new(config),
            None,
            Arc::new(MemoryStore::default()),
            Arc::new(Stats::default()),
        );
        let (_tx, rx) = mpsc::channel(16);
        Engine::new(state, Registry::new(), rx)
    }

    async fn connect(engine: &mut Engine, id: u64) -> Peer {
        let (tx, rx) = mpsc::channel(256);
        let (reg_tx, reg_rx) = oneshot::channel();
        let id = ClientId(id);
        engine
            .handle(EngineEvent::Connect {
                id,
                host: "127.0.0.1".into(),
                cert_fp: None,
                outbox: tx,
                cancel: CancellationToken::new(),
                registered: reg_tx,
            })
            .await;
        Peer {
            id,
            rx,
            _registered: reg_rx,
        }
    }

    async fn line(engine: &mut Engine, peer: &Peer, raw: &str) {
        let msg: Message = raw.parse().unwrap();
        engine.handle(EngineEvent::Line { id: peer.id, msg }).await;
    }

    async fn register(engine: &mut Engine, id: u64, nick: &str) -> Peer {
        let mut peer = connect(engine, id).await;
        line(engine, &peer, &format!("NICK {nick}")).await;
        line(engine, &peer, &format!("USER {nick} 0 * :{nick}")).await;
        let burst = peer.drain();
        assert_eq!(burst[0].command, "001");
        peer
    }

    #[tokio::test]
    async fn registration_sends_welcome_burst() {
        let mut engine = engine();
        let mut peer = connect(&mut engine, 1).await;
        line(&mut engine, &peer, "NICK alice").await;
        assert!(peer.drain().is_empty());
        line(&mut engine, &peer, "USER alice 0 * :Alice").await;

        let burst = peer.drain();
        let codes: Vec<&str> = burst.iter().map(|m| m.command.as_str()).collect();
        assert_eq!(&codes[..5], ["001", "002", "003", "004", "005"]);
        assert!(codes.contains(&"422"));
        assert!(engine.state().client(peer.id).unwrap().registered);
    }

    #[tokio::test]
    async fn commands_before_registration_are_ignored() {
        let mut engine = engine();
        let mut peer = connect(&mut engine, 1).await;
        line(&mut engine, &peer, "JOIN #chan").await;
        assert!(peer.drain().is_empty());
        assert!(engine.state().channel("#chan").is_none());
    }

    #[tokio::test]
    async fn racing_joins_create_one_founder() {
        let mut engine = engine();
        let mut alice = register(&mut engine, 1, "alice").await;
        let mut bob = register(&mut engine, 2, "bob").await;

        line(&mut engine, &alice, "JOIN #race").await;
        line(&mut engine, &bob, "JOIN #race").await;

        let chan = engine.state().channel("#race").unwrap();
        assert_eq!(chan.member_count(), 2);
        let founders = chan
            .members()
            .filter(|(_, p)| p.contains(crate::state::MemberPrefixes::FOUNDER))
            .count();
        assert_eq!(founders, 1);
        assert!(alice.drain().iter().any(|m| m.command == "JOIN"));
        assert!(bob.drain().iter().any(|m| m.command == "353"));
    }

    #[tokio::test]
    async fn last_part_destroys_channel() {
        let mut engine = engine();
        let alice = register(&mut engine, 1, "alice").await;
        line(&mut engine, &alice, "JOIN #tmp").await;
        assert!(engine.state().channel("#tmp").is_some());
        line(&mut engine, &alice, "PART #tmp :bye").await;
        assert!(engine.state().channel("#tmp").is_none());
    }

    #[tokio::test]
    async fn disconnect_destroys_channel_and_frees_nick() {
        let mut engine = engine();
        let alice = register(&mut engine, 1, "alice").await;
        line(&mut engine, &alice, "JOIN #tmp").await;
        engine
            .handle(EngineEvent::Disconnect {
                id: alice.id,
                reason: "Connection closed".into(),
            })
            .await;
        assert!(engine.state().channel("#tmp").is_none());
        assert!(engine.state().find_nick("alice").is_none());
        assert!(engine.state().whowas.find("alice", None).len() == 1);
    }

    #[tokio::test]
    async fn quit_sends_error_and_removes_client() {
        let mut engine = engine();
        let mut alice = register(&mut engine, 1, "alice").await;
        line(&mut engine, &alice, "QUIT :done").await;
        let out = alice.drain();
        let error = out.iter().find(|m| m.command == "ERROR").unwrap();
        assert_eq!(error.trailing_param(), Some("alice quit"));
        assert!(engine.state().client(alice.id).is_none());
    }

    #[tokio::test]
    async fn client_tags_follow_recipient_caps() {
        let mut engine = engine();
        let mut alice = register(&mut engine, 1, "alice").await;
        let mut bob = register(&mut engine, 2, "bob").await;
        let mut carol = register(&mut engine, 3, "carol").await;
        line(&mut engine, &carol, "CAP REQ :message-tags").await;
        carol.drain();

        line(&mut engine, &alice, "@+draft/react=x PRIVMSG bob,carol :hi").await;
        let to_bob = bob.drain();
        assert_eq!(to_bob.len(), 1);
        assert!(to_bob[0].tags.is_empty());

        let to_carol = carol.drain();
        assert!(to_carol[0].has_tag("draft/react"));
        assert!(to_carol[0].has_tag("msgid"));
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn labeled_command_without_output_is_acked() {
        let mut engine = engine();
        let mut alice = register(&mut engine, 1, "alice").await;
        line(&mut engine, &alice, "CAP REQ :labeled-response").await;
        alice.drain();
        line(&mut engine, &alice, "@label=x1 PONG :irc.test").await;
        let out = alice.drain();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].command, "ACK");
        assert_eq!(out[0].tag_value("label").as_deref(), Some("x1"));
    }

    async fn shared_channel(engine: &mut Engine) -> (Peer, Peer) {
        let mut alice = register(engine, 1, "alice").await;
        let mut bob = register(engine, 2, "bob").await;
        line(engine, &alice, "JOIN #m").await;
        line(engine, &bob, "JOIN #m").await;
        alice.drain();
        bob.drain();
        (alice, bob)
    }

    #[tokio::test]
    async fn channel_mode_params_follow_letter_table() {
        let mut engine = engine();
        let (mut alice, mut bob) = shared_channel(&mut engine).await;

        line(&mut engine, &alice, "MODE #m +kl-t sekrit 5").await;
        let seen = bob.drain();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].command, "MODE");
        assert_eq!(seen[0].params, ["#m", "+kl-t", "sekrit", "5"]);
        assert_eq!(alice.drain(), seen);

        let chan = engine.state().channel("#m").unwrap();
        assert_eq!(chan.key.as_deref(), Some("sekrit"));
        assert_eq!(chan.limit, Some(5));

        line(&mut engine, &alice, "MODE #m +o BOB").await;
        let seen = bob.drain();
        assert_eq!(seen[0].params, ["#m", "+o", "bob"]);
        let prefixes = engine.state().channel("#m").unwrap().prefixes(bob.id).unwrap();
        assert!(prefixes.contains(crate::state::MemberPrefixes::OPERATOR));
    }

    #[tokio::test]
    async fn unknown_channel_modes_get_one_472_each() {
        let mut engine = engine();
        let (mut alice, mut bob) = shared_channel(&mut engine).await;

        line(&mut engine, &alice, "MODE #m +XmY").await;
        let out = alice.drain();
        let unknown: Vec<_> = out.iter().filter(|m| m.command == "472").map(|m| m.arg(1)).collect();
        assert_eq!(unknown, [Some("X"), Some("Y")]);
        let mode = out.iter().find(|m| m.command == "MODE").unwrap();
        assert_eq!(mode.params, ["#m", "+m"]);
        assert_eq!(bob.drain().len(), 1);
    }

    #[tokio::test]
    async fn non_op_mode_change_gets_one_482() {
        let mut engine = engine();
        let (mut alice, mut bob) = shared_channel(&mut engine).await;

        line(&mut engine, &bob, "MODE #m +mi").await;
        let out = bob.drain();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].command, "482");
        assert!(alice.drain().is_empty());
    }

    #[tokio::test]
    async fn ban_lists_are_queryable_with_and_without_sign() {
        let mut engine = engine();
        let (mut alice, mut bob) = shared_channel(&mut engine).await;

        line(&mut engine, &alice, "MODE #m +b carol!*@*").await;
        alice.drain();
        bob.drain();

        for query in ["MODE #m b", "MODE #m +b"] {
            line(&mut engine, &bob, query).await;
            let out = bob.drain();
            let codes: Vec<&str> = out.iter().map(|m| m.command.as_str()).collect();
            assert_eq!(codes, ["367", "368"], "{query}");
            assert_eq!(out[0].arg(1), Some("#m"));
            assert_eq!(out[0].arg(2), Some("carol!*@*"));
            assert_eq!(out[0].arg(3), Some("alice!alice@127.0.0.1"));
        }

        line(&mut engine, &bob, "MODE #m eI").await;
        let codes: Vec<String> = bob.drain().into_iter().map(|m| m.command).collect();
        assert_eq!(codes, ["349", "347"]);
    }

    #[tokio::test]
    async fn ban_mask_with_spaces_is_dropped() {
        let mut engine = engine();
        let (mut alice, mut bob) = shared_channel(&mut engine).await;

        line(&mut engine, &alice, "MODE #m +b :evil!*@* extra words").await;
        assert!(alice.drain().is_empty());
        assert!(bob.drain().is_empty());
        assert!(
            engine
                .state()
                .channel("#m")
                .unwrap()
                .list(crate::state::ListMode::Ban)
                .is_empty()
        );
    }

    #[tokio::test]
    async fn unknown_user_modes_get_one_501_each() {
        let mut engine = engine();
        let mut alice = register(&mut engine, 1, "alice").await;

        line(&mut engine, &alice, "MODE alice +iXY").await;
        let out = alice.drain();
        assert_eq!(out.iter().filter(|m| m.command == "501").count(), 2);
        assert!(out.iter().any(|m| m.command == "MODE"));
    }

    #[tokio::test]
    async fn overflow_gets_417() {
        let mut engine = engine();
        let mut alice = register(&mut engine, 1, "alice").await;
        engine.handle(EngineEvent::Overflow { id: alice.id }).await;
        assert_eq!(alice.drain()[0].command, "417");
    }
}
