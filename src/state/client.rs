//! Per-connection client state, owned by the engine.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use gossip_proto::{Capability, Message, ModeChange, ModeOp, Source};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use super::{ClientId, UserModes};
use crate::sasl::SaslSession;

/// Upper bound on buffered AUTHENTICATE payload before decoding.
pub const SASL_BUFFER_LIMIT: usize = 8192;

/// Outcome of pushing a message into a client's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue is full; the client must be dropped.
    Full,
    /// The writer is gone; the client is already on its way out.
    Closed,
}

/// A connected client, registered or not.
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub nick: Option<String>,
    pub user: Option<String>,
    pub realname: String,
    pub host: String,
    pub modes: UserModes,

    pub caps: HashSet<Capability>,
    /// Highest `CAP LS` version seen (0 before any LS).
    pub cap_version: u32,
    /// Registration is held while CAP negotiation is open.
    pub cap_negotiating: bool,

    pub registered: bool,
    /// Candidate connection password from PASS.
    pub pass_attempt: Option<Zeroizing<String>>,

    pub account: Option<String>,
    pub away: Option<String>,
    pub sasl: Option<SaslSession>,
    /// Base64 AUTHENTICATE chunks awaiting the final one.
    pub sasl_buffer: String,
    /// Fingerprint of the client certificate, when the transport had one.
    pub cert_fp: Option<String>,

    /// Folded names of joined channels.
    pub channels: HashSet<String>,
    pub signon: DateTime<Utc>,
    /// Last PRIVMSG/NOTICE, for WHOIS idle time.
    pub last_active: Instant,

    outbox: mpsc::Sender<Message>,
    cancel: CancellationToken,
    registered_tx: Option<oneshot::Sender<()>>,
}

impl Client {
    pub fn new(
        id: ClientId,
        host: String,
        cert_fp: Option<String>,
        outbox: mpsc::Sender<Message>,
        cancel: CancellationToken,
        registered_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            nick: None,
            user: None,
            realname: String::new(),
            host,
            modes: UserModes::empty(),
            caps: HashSet::new(),
            cap_version: 0,
            cap_negotiating: false,
            registered: false,
            pass_attempt: None,
            account: None,
            away: None,
            sasl: None,
            sasl_buffer: String::new(),
            cert_fp,
            channels: HashSet::new(),
            signon: Utc::now(),
            last_active: Instant::now(),
            outbox,
            cancel,
            registered_tx: Some(registered_tx),
        }
    }

    /// Nickname, or `*` before one is set.
    pub fn nick_or_star(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    pub fn user_or_star(&self) -> &str {
        self.user.as_deref().unwrap_or("*")
    }

    /// `nick!user@host` message source.
    pub fn source(&self) -> Source {
        Source::user(self.nick_or_star(), self.user_or_star(), self.host.as_str())
    }

    pub fn nuh(&self) -> String {
        format!("{}!{}@{}", self.nick_or_star(), self.user_or_star(), self.host)
    }

    pub fn has_cap(&self, cap: Capability) -> bool {
        self.caps.contains(&cap)
    }

    pub fn is_oper(&self) -> bool {
        self.modes.contains(UserModes::OPER)
    }

    pub fn is_invisible(&self) -> bool {
        self.modes.contains(UserModes::INVISIBLE)
    }

    /// NICK and USER are in and CAP negotiation is not holding registration.
    pub fn ready_to_register(&self) -> bool {
        !self.registered && !self.cap_negotiating && self.nick.is_some() && self.user.is_some()
    }

    /// Flip to registered and tell the supervisor to start its watchdog.
    pub fn mark_registered(&mut self) {
        self.registered = true;
        self.pass_attempt = None;
        if let Some(tx) = self.registered_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Queue a message without waiting.
    pub fn deliver(&self, msg: Message) -> Delivery {
        match self.outbox.try_send(msg) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Stop the connection's reader and writer.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    /// Apply a user MODE string to this client.
    ///
    /// `+o` cannot be self-granted, `r` and `a` are read-only; those changes
    /// are skipped silently. Returns the applied changes and any letters that
    /// are not user modes at all.
    pub fn apply_modes(&mut self, changes: &[ModeChange]) -> (Vec<ModeChange>, Vec<char>) {
        let mut applied = Vec::new();
        let mut unknown = Vec::new();
        for change in changes {
            let Some(flag) = UserModes::from_letter(change.letter) else {
                unknown.push(change.letter);
                continue;
            };
            let adding = change.op == ModeOp::Add;
            let read_only = flag.intersects(UserModes::REGISTERED | UserModes::AWAY);
            if read_only || (adding && flag == UserModes::OPER) {
                continue;
            }
            if self.modes.contains(flag) == adding {
                continue;
            }
            self.modes.set(flag, adding);
            applied.push(*change);
        }
        (applied, unknown)
    }
}
