//! WHOWAS history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use gossip_proto::casemap;
use parking_lot::RwLock;

/// A departed (or renamed) client's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhowasEntry {
    pub nick: String,
    pub user: String,
    pub host: String,
    pub realname: String,
    pub left_at: DateTime<Utc>,
}

/// Bounded newest-first history of nicknames that left.
#[derive(Debug)]
pub struct WhowasHistory {
    entries: RwLock<VecDeque<WhowasEntry>>,
    capacity: usize,
}

impl WhowasHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Record an entry, evicting the oldest when full.
    pub fn push(&self, entry: WhowasEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Up to `count` entries for `nick`, newest first. `None` means all.
    pub fn find(&self, nick: &str, count: Option<usize>) -> Vec<WhowasEntry> {
        let folded = casemap::fold(nick);
        self.entries
            .read()
            .iter()
            .filter(|e| casemap::fold(&e.nick) == folded)
            .take(count.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(nick: &str, user: &str) -> WhowasEntry {
        WhowasEntry {
            nick: nick.into(),
            user: user.into(),
            host: "127.0.0.1".into(),
            realname: "Real".into(),
            left_at: Utc::now(),
        }
    }

    #[test]
    fn newest_first_and_bounded() {
        let history = WhowasHistory::new(3);
        history.push(entry("alice", "one"));
        history.push(entry("bob", "two"));
        history.push(entry("Alice", "three"));
        history.push(entry("carol", "four"));
        assert_eq!(history.len(), 3);

        // "one" was evicted.
        let found = history.find("ALICE", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user, "three");
    }

    #[test]
    fn count_limits_results() {
        let history = WhowasHistory::new(10);
        for user in ["a", "b", "c"] {
            history.push(entry("dave", user));
        }
        let found = history.find("dave", Some(2));
        let users: Vec<_> = found.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, ["c", "b"]);
        assert!(history.find("nobody", None).is_empty());
    }
}
