//! Runtime statistics.
//!
//! Atomic counters for LUSERS and INFO. Shared behind an `Arc` so the
//! server can read them without going through the engine queue.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Server runtime counters.
///
/// Relaxed ordering throughout; exact consistency is not required.
#[derive(Debug, Default)]
pub struct Stats {
    /// Registered users.
    users: AtomicUsize,
    /// Registered users with +i.
    invisible: AtomicUsize,
    /// Users with +o.
    opers: AtomicUsize,
    /// Accepted connections that have not registered.
    unregistered: AtomicUsize,
    /// Highest `users` seen.
    peak_users: AtomicUsize,
    /// Connections accepted since startup.
    connections_total: AtomicUsize,
}

impl Stats {
    pub fn connection_opened(&self) {
        self.unregistered.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection finished registration. Returns the new user count.
    pub fn user_registered(&self) -> usize {
        saturating_dec(&self.unregistered);
        let users = self.users.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_users.fetch_max(users, Ordering::Relaxed);
        users
    }

    /// A connection went away, registered or not.
    pub fn connection_closed(&self, registered: bool) {
        if registered {
            saturating_dec(&self.users);
        } else {
            saturating_dec(&self.unregistered);
        }
    }

    pub fn invisible_changed(&self, set: bool) {
        if set {
            self.invisible.fetch_add(1, Ordering::Relaxed);
        } else {
            saturating_dec(&self.invisible);
        }
    }

    pub fn oper_changed(&self, set: bool) {
        if set {
            self.opers.fetch_add(1, Ordering::Relaxed);
        } else {
            saturating_dec(&self.opers);
        }
    }

    pub fn users(&self) -> usize {
        self.users.load(Ordering::Relaxed)
    }

    pub fn invisible(&self) -> usize {
        self.invisible.load(Ordering::Relaxed)
    }

    pub fn opers(&self) -> usize {
        self.opers.load(Ordering::Relaxed)
    }

    pub fn unregistered(&self) -> usize {
        self.unregistered.load(Ordering::Relaxed)
    }

    pub fn peak_users(&self) -> usize {
        self.peak_users.load(Ordering::Relaxed)
    }

    pub fn connections_total(&self) -> usize {
        self.connections_total.load(Ordering::Relaxed)
    }
}

fn saturating_dec(counter: &AtomicUsize) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_moves_between_counters() {
        let stats = Stats::default();
        stats.connection_opened();
        stats.connection_opened();
        assert_eq!(stats.unregistered(), 2);

        assert_eq!(stats.user_registered(), 1);
        assert_eq!(stats.unregistered(), 1);
        assert_eq!(stats.users(), 1);

        stats.connection_closed(true);
        stats.connection_closed(false);
        assert_eq!(stats.users(), 0);
        assert_eq!(stats.unregistered(), 0);
        assert_eq!(stats.peak_users(), 1);
        assert_eq!(stats.connections_total(), 2);
    }

    #[test]
    fn counters_never_underflow() {
        let stats = Stats::default();
        stats.connection_closed(true);
        stats.oper_changed(false);
        assert_eq!(stats.users(), 0);
        assert_eq!(stats.opers(), 0);
    }
}
