//! MONITOR registry.
//!
//! Forward map (client to watched nicknames) and reverse map (nickname to
//! watchers). Quit and nick-change paths read the reverse map while
//! MONITOR commands edit both, so each side sits in its own `DashMap`.

use std::collections::{BTreeMap, HashSet};

use dashmap::DashMap;
use gossip_proto::casemap;

use super::ClientId;

/// Why a MONITOR + was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorListFull;

#[derive(Debug, Default)]
pub struct MonitorRegistry {
    /// Client to folded nick to nick as given.
    targets: DashMap<ClientId, BTreeMap<String, String>>,
    /// Folded nick to watching clients.
    watchers: DashMap<String, HashSet<ClientId>>,
}

impl MonitorRegistry {
    /// Watch `nick` for `client`. Adding a nick already watched is a no-op.
    pub fn add(&self, client: ClientId, nick: &str, limit: usize) -> Result<(), MonitorListFull> {
        let folded = casemap::fold(nick);
        let mut targets = self.targets.entry(client).or_default();
        if targets.contains_key(&folded) {
            return Ok(());
        }
        if targets.len() >= limit {
            return Err(MonitorListFull);
        }
        targets.insert(folded.clone(), nick.to_owned());
        drop(targets);
        self.watchers.entry(folded).or_default().insert(client);
        Ok(())
    }

    pub fn remove(&self, client: ClientId, nick: &str) {
        let folded = casemap::fold(nick);
        if let Some(mut targets) = self.targets.get_mut(&client) {
            targets.remove(&folded);
        }
        self.unwatch(client, &folded);
    }

    /// Drop every entry for `client` (MONITOR C, or disconnect).
    pub fn clear(&self, client: ClientId) {
        if let Some((_, targets)) = self.targets.remove(&client) {
            for folded in targets.keys() {
                self.unwatch(client, folded);
            }
        }
    }

    /// Watched nicknames as given, sorted by folded name.
    pub fn list(&self, client: ClientId) -> Vec<String> {
        self.targets
            .get(&client)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Clients watching `nick`.
    pub fn watchers(&self, nick: &str) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self
            .watchers
            .get(&casemap::fold(nick))
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    fn unwatch(&self, client: ClientId, folded: &str) {
        let now_empty = match self.watchers.get_mut(folded) {
            Some(mut set) => {
                set.remove(&client);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.watchers.remove_if(folded, |_, set| set.is_empty());
        }
    }
}
