//! Connection identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one accepted connection for its whole lifetime.
///
/// Nicknames change; the id does not, so the engine keys every registry
/// by it and maps nicknames onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Hands out increasing [`ClientId`]s.
#[derive(Debug)]
pub struct ClientIdGenerator {
    counter: AtomicU64,
}

impl Default for ClientIdGenerator {
    fn default() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }
}

impl ClientIdGenerator {
    /// Generate the next id.
    pub fn next(&self) -> ClientId {
        ClientId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase() {
        let generator = ClientIdGenerator::default();
        assert_eq!(generator.next(), ClientId(1));
        assert_eq!(generator.next(), ClientId(2));
        assert_eq!(ClientId(7).to_string(), "c7");
    }
}
