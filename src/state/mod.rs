//! Server state.
//!
//! [`ServerState`] is owned by the engine task: every handler gets `&mut`
//! access while it runs, so compound check-then-act sequences such as
//! "nick is free, claim it" need no locking. The monitor registry, WHOWAS
//! history and statistics are shared with the connection layer through
//! `Arc`s and carry their own synchronisation.

mod channel;
mod client;
mod modes;
mod monitor;
mod stats;
mod uid;
mod whowas;

pub use channel::{
    AppliedMode, CHANNEL_LEN, CHANTYPES, Channel, LetterKind, ListEntry, ListMode, Topic,
    is_channel_name, is_valid_mask,
};
pub use client::{Client, Delivery, SASL_BUFFER_LIMIT};
pub use modes::{ChannelModes, MemberPrefixes, UserModes};
pub use monitor::{MonitorListFull, MonitorRegistry};
pub use stats::Stats;
pub use uid::{ClientId, ClientIdGenerator};
pub use whowas::{WhowasEntry, WhowasHistory};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gossip_proto::{Capability, Message, Response, Tag, casemap};
use tracing::{debug, warn};

use crate::config::{Config, SharedConfig};
use crate::db::CredentialStore;
use crate::error::HandlerError;

/// Server version string for 002/004.
pub const VERSION: &str = concat!("gossipd-", env!("CARGO_PKG_VERSION"));

/// Responses being collected for one labeled command.
#[derive(Debug)]
struct Capture {
    client: ClientId,
    label: String,
    messages: Vec<Message>,
}

/// Everything the engine mutates.
pub struct ServerState {
    pub config: Arc<Config>,
    pub shared_config: SharedConfig,
    /// Where REHASH re-reads configuration from.
    pub config_path: Option<PathBuf>,
    pub created: DateTime<Utc>,

    pub clients: HashMap<ClientId, Client>,
    /// Folded nick to owner.
    nicks: HashMap<String, ClientId>,
    /// Folded channel name to channel.
    pub channels: HashMap<String, Channel>,

    pub monitors: Arc<MonitorRegistry>,
    pub whowas: Arc<WhowasHistory>,
    pub stats: Arc<Stats>,
    pub store: Arc<dyn CredentialStore>,

    capture: Option<Capture>,
    /// Clients to drop once the current command finishes.
    kills: Vec<(ClientId, String)>,
}

impl ServerState {
    pub fn new(
        shared_config: SharedConfig,
        config_path: Option<PathBuf>,
        store: Arc<dyn CredentialStore>,
        stats: Arc<Stats>,
    ) -> Self {
        let config = shared_config.current();
        Self {
            whowas: Arc::new(WhowasHistory::new(config.limits.whowas)),
            config,
            shared_config,
            config_path,
            created: Utc::now(),
            clients: HashMap::new(),
            nicks: HashMap::new(),
            channels: HashMap::new(),
            monitors: Arc::new(MonitorRegistry::default()),
            stats,
            store,
            capture: None,
            kills: Vec::new(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.config.server.name
    }

    // === Lookup ===

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    /// Owner of `nick`, registered or not.
    pub fn find_nick(&self, nick: &str) -> Option<ClientId> {
        self.nicks.get(&casemap::fold(nick)).copied()
    }

    /// The registered client using `nick`.
    pub fn registered_by_nick(&self, nick: &str) -> Option<&Client> {
        self.find_nick(nick)
            .and_then(|id| self.clients.get(&id))
            .filter(|c| c.registered)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&casemap::fold(name))
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&casemap::fold(name))
    }

    // === Nicknames ===

    /// Point `nick` at `id`, releasing the client's previous nick.
    ///
    /// Returns the previous nick. A case-only change of one's own nick is
    /// allowed.
    pub fn claim_nick(&mut self, id: ClientId, nick: &str) -> Result<Option<String>, HandlerError> {
        let folded = casemap::fold(nick);
        if let Some(owner) = self.nicks.get(&folded)
            && *owner != id
        {
            return Err(HandlerError::NicknameInUse(nick.to_owned()));
        }
        let Some(client) = self.clients.get_mut(&id) else {
            return Err(HandlerError::Internal(format!("unknown client {id}")));
        };
        let old = client.nick.replace(nick.to_owned());
        if let Some(old) = &old {
            self.nicks.remove(&casemap::fold(old));
        }
        self.nicks.insert(folded, id);
        Ok(old)
    }

    // === Delivery ===

    /// Send `msg` to one client, adapting tags to its capabilities.
    ///
    /// While a labeled command from that client is running, the message is
    /// held back for the labeled response instead.
    pub fn send(&mut self, to: ClientId, mut msg: Message) {
        let Some(client) = self.clients.get(&to) else {
            return;
        };
        filter_tags(client, &mut msg);

        if let Some(capture) = &mut self.capture
            && capture.client == to
        {
            capture.messages.push(msg);
            return;
        }
        self.deliver(to, msg);
    }

    fn deliver(&mut self, to: ClientId, msg: Message) {
        let Some(client) = self.clients.get(&to) else {
            return;
        };
        match client.deliver(msg) {
            Delivery::Queued | Delivery::Closed => {}
            Delivery::Full => {
                if !self.kills.iter().any(|(id, _)| *id == to) {
                    warn!(client = %to, "SendQ exceeded");
                    self.kills.push((to, "SendQ exceeded".to_owned()));
                }
            }
        }
    }

    /// Send a numeric reply addressed to the client's nick.
    pub fn reply(&mut self, to: ClientId, response: Response, args: &[&dyn std::fmt::Display]) {
        let Some(client) = self.clients.get(&to) else {
            return;
        };
        let msg = response.reply(&self.config.server.name, client.nick_or_star(), args);
        self.send(to, msg);
    }

    /// Send a message from the server itself.
    pub fn notice(&mut self, to: ClientId, text: &str) {
        let Some(client) = self.clients.get(&to) else {
            return;
        };
        let msg = Message::new("NOTICE")
            .from_server(&self.config.server.name)
            .param(client.nick_or_star())
            .trailing(text);
        self.send(to, msg);
    }

    /// IRCv3 standard reply (`FAIL`, `WARN`, `NOTE`).
    pub fn standard_reply(&mut self, to: ClientId, kind: &str, command: &str, code: &str, context: &[&str], text: &str) {
        let mut msg = Message::new(kind)
            .from_server(&self.config.server.name)
            .param(command)
            .param(code);
        for c in context {
            msg.push_param(*c);
        }
        self.send(to, msg.trailing(text));
    }

    /// Add the tags a user-originated message carries before fan-out.
    ///
    /// Each recipient's capabilities later decide which survive.
    pub fn prepare(&self, from: ClientId, msg: &mut Message) {
        let Some(sender) = self.clients.get(&from) else {
            return;
        };
        if !msg.has_tag("time") {
            msg.add_tag("time", Some(&server_time()));
        }
        if let Some(account) = &sender.account {
            msg.add_tag("account", Some(account));
        }
        if sender.modes.contains(UserModes::BOT) {
            msg.add_tag("bot", None);
        }
    }

    /// Send to every member of a channel, optionally skipping one.
    pub fn broadcast_channel(&mut self, channel: &str, msg: &Message, except: Option<ClientId>) {
        let Some(chan) = self.channel(channel) else {
            return;
        };
        let targets: Vec<ClientId> = chan.member_ids().filter(|id| Some(*id) != except).collect();
        for id in targets {
            self.send(id, msg.clone());
        }
    }

    /// Everyone sharing at least one channel with `id`, excluding `id`.
    pub fn co_members(&self, id: ClientId) -> Vec<ClientId> {
        let Some(client) = self.clients.get(&id) else {
            return Vec::new();
        };
        let mut peers: Vec<ClientId> = client
            .channels
            .iter()
            .filter_map(|name| self.channels.get(name))
            .flat_map(Channel::member_ids)
            .filter(|peer| *peer != id)
            .collect();
        peers.sort_unstable();
        peers.dedup();
        peers
    }

    /// Send to co-members holding `cap` (any co-member when `None`).
    pub fn broadcast_co_members(&mut self, id: ClientId, msg: &Message, cap: Option<Capability>) {
        for peer in self.co_members(id) {
            let wants = match cap {
                Some(cap) => self.clients.get(&peer).is_some_and(|c| c.has_cap(cap)),
                None => true,
            };
            if wants {
                self.send(peer, msg.clone());
            }
        }
    }

    /// True if the two clients share a channel.
    pub fn shares_channel(&self, a: ClientId, b: ClientId) -> bool {
        match (self.clients.get(&a), self.clients.get(&b)) {
            (Some(a), Some(b)) => a.channels.iter().any(|c| b.channels.contains(c)),
            _ => false,
        }
    }

    // === Labeled responses ===

    /// Start holding replies to `client` for `label`.
    pub fn begin_label(&mut self, client: ClientId, label: String) {
        self.capture = Some(Capture {
            client,
            label,
            messages: Vec::new(),
        });
    }

    /// Release held replies with the label attached.
    ///
    /// No replies become an `ACK`, one reply carries the label itself, and
    /// more are wrapped in a `labeled-response` batch.
    pub fn finish_label(&mut self) {
        let Some(Capture {
            client,
            label,
            mut messages,
        }) = self.capture.take()
        else {
            return;
        };
        let Some(batch_ok) = self.clients.get(&client).map(|c| c.has_cap(Capability::Batch)) else {
            return;
        };
        let server = self.config.server.name.clone();

        match messages.len() {
            0 => {
                let ack = Message::new("ACK")
                    .from_server(&server)
                    .with_tag(Tag::new("label", Some(&label)));
                self.deliver(client, ack);
            }
            1 => {
                let mut msg = messages.remove(0);
                msg.tags.insert(0, Tag::new("label", Some(&label)));
                self.deliver(client, msg);
            }
            _ if batch_ok => {
                let reference = uuid::Uuid::new_v4().simple().to_string();
                let start = Message::new("BATCH")
                    .from_server(&server)
                    .param(format!("+{reference}"))
                    .param("labeled-response")
                    .with_tag(Tag::new("label", Some(&label)));
                self.deliver(client, start);
                for mut msg in messages {
                    msg.tags.insert(0, Tag::new("batch", Some(&reference)));
                    self.deliver(client, msg);
                }
                let end = Message::new("BATCH")
                    .from_server(&server)
                    .param(format!("-{reference}"));
                self.deliver(client, end);
            }
            _ => {
                for msg in messages {
                    self.deliver(client, msg);
                }
            }
        }
    }

    // === Teardown ===

    /// Queue `id` for removal after the current command.
    pub fn kill(&mut self, id: ClientId, reason: &str) {
        if !self.kills.iter().any(|(k, _)| *k == id) {
            self.kills.push((id, reason.to_owned()));
        }
    }

    pub fn take_kill(&mut self) -> Option<(ClientId, String)> {
        if self.kills.is_empty() {
            None
        } else {
            Some(self.kills.remove(0))
        }
    }

    /// Remove a client everywhere and tell whoever needs to know.
    ///
    /// Co-members see `QUIT :reason`; channels left empty are destroyed;
    /// the nick goes to WHOWAS and MONITOR watchers are told it is offline.
    pub fn quit_client(&mut self, id: ClientId, reason: &str) {
        if self.capture.as_ref().is_some_and(|c| c.client == id) {
            self.capture = None;
        }
        let peers = self.co_members(id);
        let Some(client) = self.clients.remove(&id) else {
            return;
        };
        client.disconnect();
        self.monitors.clear(id);
        self.stats.connection_closed(client.registered);
        if client.registered {
            if client.is_invisible() {
                self.stats.invisible_changed(false);
            }
            if client.is_oper() {
                self.stats.oper_changed(false);
            }
        }

        if let Some(nick) = &client.nick {
            self.nicks.remove(&casemap::fold(nick));
        }

        for name in &client.channels {
            let now_empty = match self.channels.get_mut(name) {
                Some(chan) => {
                    chan.remove_member(id);
                    chan.is_empty()
                }
                None => false,
            };
            if now_empty {
                debug!(channel = %name, "Channel destroyed");
                self.channels.remove(name);
            }
        }
        for chan in self.channels.values_mut() {
            chan.invited.remove(&id);
        }

        if !client.registered {
            return;
        }

        let mut quit = Message::new("QUIT").with_source(client.source()).trailing(reason);
        quit.add_tag("time", Some(&server_time()));
        for peer in peers {
            self.send(peer, quit.clone());
        }

        if let Some(nick) = &client.nick {
            self.whowas.push(WhowasEntry {
                nick: nick.clone(),
                user: client.user_or_star().to_owned(),
                host: client.host.clone(),
                realname: client.realname.clone(),
                left_at: Utc::now(),
            });
            self.notify_monitors(nick, false, None);
        }
    }

    /// Tell MONITOR watchers that `nick` came online (730) or went offline (731).
    pub fn notify_monitors(&mut self, nick: &str, online: bool, nuh: Option<&str>) {
        let watchers = self.monitors.watchers(nick);
        for watcher in watchers {
            if online {
                let target = nuh.unwrap_or(nick);
                self.reply(watcher, Response::RPL_MONONLINE, &[&target]);
            } else {
                self.reply(watcher, Response::RPL_MONOFFLINE, &[&nick]);
            }
        }
    }

    /// Swap in a new configuration for future commands and connections.
    pub fn install_config(&mut self, config: Config) {
        self.shared_config.replace(config);
        self.config = self.shared_config.current();
    }
}

/// IRCv3 `server-time` timestamp.
pub fn server_time() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Drop the tags `client` has not negotiated; add `time` if it wants one.
fn filter_tags(client: &Client, msg: &mut Message) {
    let message_tags = client.has_cap(Capability::MessageTags);
    let server_time_cap = client.has_cap(Capability::ServerTime);
    let account_tag = client.has_cap(Capability::AccountTag);

    msg.tags.retain(|tag| {
        if tag.client_prefix {
            return message_tags;
        }
        match tag.name().as_str() {
            "time" => server_time_cap,
            "account" => account_tag,
            "label" | "batch" => false,
            _ => message_tags,
        }
    });
    if server_time_cap && !msg.has_tag("time") {
        msg.add_tag("time", Some(&server_time()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SharedConfig;
    use crate::db::MemoryStore;
    use tokio::sync::{mpsc, oneshot};
    use tokio_util::sync::CancellationToken;

    fn test_state() -> ServerState {
        let config: Config = toml::from_str(
            "[server]\nname = \"irc.test\"\nnetwork = \"TestNet\"\n[listen]\naddress = \"127.0.0.1:0\"\n",
        )
        .unwrap();
        ServerState::new(
            SharedConfig::new(config),
            None,
            Arc::new(MemoryStore::default()),
            Arc::new(Stats::default()),
        )
    }

    fn connect(state: &mut ServerState, id: u64, nick: &str, queue: usize) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(queue);
        let (reg_tx, _reg_rx) = oneshot::channel();
        let id = ClientId(id);
        let mut client = Client::new(id, "host".into(), None, tx, CancellationToken::new(), reg_tx);
        client.user = Some("u".into());
        client.registered = true;
        state.clients.insert(id, client);
        state.claim_nick(id, nick).unwrap();
        rx
    }

    #[test]
    fn nick_claims_are_exclusive() {
        let mut state = test_state();
        let _a = connect(&mut state, 1, "alice", 8);
        let _b = connect(&mut state, 2, "bob", 8);
        assert!(matches!(
            state.claim_nick(ClientId(2), "ALICE"),
            Err(HandlerError::NicknameInUse(_))
        ));
        // Case change of one's own nick.
        assert_eq!(state.claim_nick(ClientId(1), "Alice").unwrap().as_deref(), Some("alice"));
        assert_eq!(state.find_nick("alice"), Some(ClientId(1)));
    }

    #[test]
    fn tags_follow_recipient_caps() {
        let mut state = test_state();
        let mut rx = connect(&mut state, 1, "alice", 8);
        let msg = Message::new("PRIVMSG")
            .param("alice")
            .trailing("hi")
            .with_tag(Tag::client("draft/react", Some("x")))
            .with_tag(Tag::new("account", Some("bob")));

        state.send(ClientId(1), msg.clone());
        assert!(rx.try_recv().unwrap().tags.is_empty());

        let client = state.client_mut(ClientId(1)).unwrap();
        client.caps.insert(Capability::MessageTags);
        client.caps.insert(Capability::AccountTag);
        state.send(ClientId(1), msg);
        let got = rx.try_recv().unwrap();
        assert!(got.has_tag("draft/react"));
        assert!(got.has_tag("account"));
        assert!(!got.has_tag("time"));
    }

    #[test]
    fn full_sendq_schedules_kill() {
        let mut state = test_state();
        let _rx = connect(&mut state, 1, "alice", 1);
        state.send(ClientId(1), Message::new("PING"));
        state.send(ClientId(1), Message::new("PING"));
        state.send(ClientId(1), Message::new("PING"));
        assert_eq!(state.take_kill(), Some((ClientId(1), "SendQ exceeded".into())));
        assert_eq!(state.take_kill(), None);
    }

    #[test]
    fn label_with_no_output_acks() {
        let mut state = test_state();
        let mut rx = connect(&mut state, 1, "alice", 8);
        state.begin_label(ClientId(1), "abc".into());
        state.finish_label();
        let ack = rx.try_recv().unwrap();
        assert_eq!(ack.command, "ACK");
        assert_eq!(ack.tag_value("label").as_deref(), Some("abc"));
    }

    #[test]
    fn label_with_many_replies_is_batched() {
        let mut state = test_state();
        let mut rx = connect(&mut state, 1, "alice", 8);
        state.client_mut(ClientId(1)).unwrap().caps.insert(Capability::Batch);
        state.begin_label(ClientId(1), "L1".into());
        state.notice(ClientId(1), "one");
        state.notice(ClientId(1), "two");
        assert!(rx.try_recv().is_err());
        state.finish_label();

        let start = rx.try_recv().unwrap();
        assert_eq!(start.command, "BATCH");
        assert_eq!(start.arg(1), Some("labeled-response"));
        let reference = start.arg(0).unwrap().trim_start_matches('+').to_owned();
        for _ in 0..2 {
            let inner = rx.try_recv().unwrap();
            assert_eq!(inner.tag_value("batch"), Some(reference.clone()));
        }
        assert_eq!(rx.try_recv().unwrap().arg(0), Some(format!("-{reference}").as_str()));
    }

    #[test]
    fn quit_destroys_empty_channels_and_records_whowas() {
        let mut state = test_state();
        let _a = connect(&mut state, 1, "alice", 8);
        let mut b = connect(&mut state, 2, "bob", 8);

        for (id, name) in [(1, "#solo"), (1, "#shared"), (2, "#shared")] {
            let chan = state
                .channels
                .entry(name.to_owned())
                .or_insert_with(|| Channel::new(name));
            chan.add_member(ClientId(id), MemberPrefixes::empty());
            state.clients.get_mut(&ClientId(id)).unwrap().channels.insert(name.to_owned());
        }

        state.quit_client(ClientId(1), "bye");
        assert!(state.channel("#solo").is_none());
        assert_eq!(state.channel("#shared").unwrap().member_count(), 1);
        assert!(state.find_nick("alice").is_none());
        assert_eq!(state.whowas.find("alice", None).len(), 1);

        let quit = b.try_recv().unwrap();
        assert_eq!(quit.command, "QUIT");
        assert_eq!(quit.trailing_param(), Some("bye"));
    }
}
