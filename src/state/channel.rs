//! Channel state, owned by the engine.

use std::collections::{BTreeMap, HashSet};

use gossip_proto::{ModeChange, ModeOp, casemap, wild};

use super::{ChannelModes, ClientId, MemberPrefixes};
use crate::error::ChannelError;

/// Channel name prefixes served here.
pub const CHANTYPES: &str = "#&";

/// Longest channel name accepted.
pub const CHANNEL_LEN: usize = 64;

/// True for a syntactically valid channel name.
pub fn is_channel_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if CHANTYPES.contains(c))
        && name.len() > 1
        && name.len() <= CHANNEL_LEN
        && !name.contains([' ', ',', '\x07', '\r', '\n', '\0'])
}

/// A list mask must be a single non-empty word not starting with `:`.
pub fn is_valid_mask(mask: &str) -> bool {
    !mask.is_empty() && !mask.starts_with(':') && !mask.contains([' ', '\r', '\n', '\0'])
}

/// An entry in a list (bans, excepts, invex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Channel topic with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Which list a list-mode letter addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Ban,
    Except,
    Invex,
}

impl ListMode {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'b' => Some(Self::Ban),
            'e' => Some(Self::Except),
            'I' => Some(Self::Invex),
            _ => None,
        }
    }
}

/// How a channel mode letter consumes parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterKind {
    /// b e I: parameter on add and remove, query without one.
    List(ListMode),
    /// q a o h v: always a nickname parameter.
    Prefix(MemberPrefixes),
    /// k: parameter on add and remove.
    Key,
    /// l: parameter on add only.
    Limit,
    /// i m n s t
    Flag(ChannelModes),
}

impl LetterKind {
    pub fn from_letter(letter: char) -> Option<Self> {
        if let Some(list) = ListMode::from_letter(letter) {
            return Some(Self::List(list));
        }
        if let Some(prefix) = MemberPrefixes::from_letter(letter) {
            return Some(Self::Prefix(prefix));
        }
        match letter {
            'k' => Some(Self::Key),
            'l' => Some(Self::Limit),
            _ => ChannelModes::from_letter(letter).map(Self::Flag),
        }
    }

    /// Whether this change consumes the next argument.
    pub fn takes_param(self, op: ModeOp) -> bool {
        match self {
            Self::List(_) | Self::Prefix(_) | Self::Key => true,
            Self::Limit => op == ModeOp::Add,
            Self::Flag(_) => false,
        }
    }
}

/// One mode change that took effect, ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMode {
    pub change: ModeChange,
    pub param: Option<String>,
}

/// A channel.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub topic: Option<Topic>,
    pub key: Option<String>,
    pub limit: Option<usize>,
    pub modes: ChannelModes,
    pub bans: Vec<ListEntry>,
    pub excepts: Vec<ListEntry>,
    pub invex: Vec<ListEntry>,
    /// Clients invited while the channel was +i.
    pub invited: HashSet<ClientId>,
    /// Members keyed by id; ids increase, so iteration is join order.
    members: BTreeMap<ClientId, MemberPrefixes>,
    pub created: i64,
}

impl Channel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            topic: None,
            key: None,
            limit: None,
            modes: ChannelModes::NO_EXTERNAL | ChannelModes::PROTECTED_TOPIC,
            bans: Vec::new(),
            excepts: Vec::new(),
            invex: Vec::new(),
            invited: HashSet::new(),
            members: BTreeMap::new(),
            created: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, id: ClientId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn prefixes(&self, id: ClientId) -> Option<MemberPrefixes> {
        self.members.get(&id).copied()
    }

    pub fn members(&self) -> impl Iterator<Item = (ClientId, MemberPrefixes)> + '_ {
        self.members.iter().map(|(id, p)| (*id, *p))
    }

    pub fn member_ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.members.keys().copied()
    }

    pub fn add_member(&mut self, id: ClientId, prefixes: MemberPrefixes) {
        self.members.insert(id, prefixes);
        self.invited.remove(&id);
    }

    /// Returns false if `id` was not a member.
    pub fn remove_member(&mut self, id: ClientId) -> bool {
        self.members.remove(&id).is_some()
    }

    /// Check JOIN admission for a non-member.
    ///
    /// Order: key, limit, invite-only, ban. `nuh` must be case-folded.
    pub fn admit(&self, id: ClientId, nuh: &str, key: Option<&str>) -> Result<(), ChannelError> {
        if let Some(expected) = &self.key
            && key != Some(expected.as_str())
        {
            return Err(ChannelError::BadChannelKey);
        }
        if let Some(limit) = self.limit
            && self.members.len() >= limit
        {
            return Err(ChannelError::ChannelIsFull);
        }
        if self.modes.contains(ChannelModes::INVITE_ONLY)
            && !self.invited.contains(&id)
            && !matches_any(&self.invex, nuh)
        {
            return Err(ChannelError::InviteOnlyChan);
        }
        if self.is_banned(nuh) {
            return Err(ChannelError::BannedFromChan);
        }
        Ok(())
    }

    /// Banned and not excepted. `nuh` must be case-folded.
    pub fn is_banned(&self, nuh: &str) -> bool {
        matches_any(&self.bans, nuh) && !matches_any(&self.excepts, nuh)
    }

    /// Whether `id` may send to the channel (+n and +m rules).
    pub fn can_send(&self, id: ClientId) -> bool {
        match self.members.get(&id) {
            None => !self.modes.contains(ChannelModes::NO_EXTERNAL),
            Some(p) => !self.modes.contains(ChannelModes::MODERATED) || !p.is_empty(),
        }
    }

    /// Whether `id` may change the topic.
    pub fn can_set_topic(&self, id: ClientId) -> bool {
        match self.members.get(&id) {
            None => false,
            Some(p) => {
                !self.modes.contains(ChannelModes::PROTECTED_TOPIC)
                    || p.intersects(
                        MemberPrefixes::FOUNDER
                            | MemberPrefixes::PROTECTED
                            | MemberPrefixes::OPERATOR
                            | MemberPrefixes::HALFOP,
                    )
            }
        }
    }

    pub fn list(&self, list: ListMode) -> &[ListEntry] {
        match list {
            ListMode::Ban => &self.bans,
            ListMode::Except => &self.excepts,
            ListMode::Invex => &self.invex,
        }
    }

    fn list_mut(&mut self, list: ListMode) -> &mut Vec<ListEntry> {
        match list {
            ListMode::Ban => &mut self.bans,
            ListMode::Except => &mut self.excepts,
            ListMode::Invex => &mut self.invex,
        }
    }

    /// Add or remove a list entry; false when nothing changed.
    ///
    /// Masks that could not be sent back as a middle parameter are refused.
    pub fn edit_list(&mut self, list: ListMode, op: ModeOp, mask: &str, set_by: &str) -> bool {
        if !is_valid_mask(mask) {
            return false;
        }
        let entries = self.list_mut(list);
        let existing = entries.iter().position(|e| casemap::eq(&e.mask, mask));
        match (op, existing) {
            (ModeOp::Add, None) => {
                entries.push(ListEntry {
                    mask: mask.to_owned(),
                    set_by: set_by.to_owned(),
                    set_at: chrono::Utc::now().timestamp(),
                });
                true
            }
            (ModeOp::Remove, Some(idx)) => {
                entries.remove(idx);
                true
            }
            _ => false,
        }
    }

    /// Set or clear a prefix on a member; false when nothing changed.
    pub fn set_prefix(&mut self, id: ClientId, prefix: MemberPrefixes, op: ModeOp) -> Result<bool, ChannelError> {
        let Some(current) = self.members.get_mut(&id) else {
            return Err(ChannelError::NotOnChannel);
        };
        let adding = op == ModeOp::Add;
        if current.contains(prefix) == adding {
            return Ok(false);
        }
        current.set(prefix, adding);
        Ok(true)
    }

    /// Apply a flag, key or limit change; false when nothing changed.
    pub fn apply_simple(&mut self, kind: LetterKind, op: ModeOp, param: Option<&str>) -> Result<bool, ChannelError> {
        let adding = op == ModeOp::Add;
        match kind {
            LetterKind::Flag(flag) => {
                if self.modes.contains(flag) == adding {
                    return Ok(false);
                }
                self.modes.set(flag, adding);
                Ok(true)
            }
            LetterKind::Key if adding => {
                let key = param.unwrap_or_default();
                if key.is_empty() || key.contains([' ', ',', ':']) {
                    return Err(ChannelError::InvalidKey);
                }
                self.key = Some(key.to_owned());
                Ok(true)
            }
            LetterKind::Key => Ok(self.key.take().is_some()),
            LetterKind::Limit if adding => match param.and_then(|p| p.parse::<usize>().ok()) {
                Some(limit) if limit > 0 => {
                    self.limit = Some(limit);
                    Ok(true)
                }
                _ => Ok(false),
            },
            LetterKind::Limit => Ok(self.limit.take().is_some()),
            LetterKind::List(_) | LetterKind::Prefix(_) => Ok(false),
        }
    }

    /// Letters and parameters for RPL_CHANNELMODEIS.
    ///
    /// The key is only shown to members.
    pub fn mode_string(&self, show_key: bool) -> (String, Vec<String>) {
        let mut letters = format!("+{}", self.modes.letters());
        let mut params = Vec::new();
        if let Some(key) = &self.key {
            letters.push('k');
            params.push(if show_key { key.clone() } else { "*".to_owned() });
        }
        if let Some(limit) = self.limit {
            letters.push('l');
            params.push(limit.to_string());
        }
        (letters, params)
    }

    pub fn is_secret(&self) -> bool {
        self.modes.contains(ChannelModes::SECRET)
    }
}

fn matches_any(entries: &[ListEntry], nuh: &str) -> bool {
    entries
        .iter()
        .any(|e| wild::matches(&casemap::fold(&e.mask), nuh))
}
