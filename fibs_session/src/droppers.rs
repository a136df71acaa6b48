//! Record of players who abandoned a running match, keyed by server and
//! player pair so a later resume or finished match can settle the score.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DropperSet {
    keys: HashSet<String>,
}

fn key(host: &str, port: u16, dropper: &str, victim: &str) -> String {
    format!("{host}:{port}:{dropper}:{victim}")
}

impl DropperSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the key was already present.
    pub fn insert(&mut self, host: &str, port: u16, dropper: &str, victim: &str) -> bool {
        self.keys.insert(key(host, port, dropper, victim))
    }

    pub fn remove(&mut self, host: &str, port: u16, dropper: &str, victim: &str) -> bool {
        self.keys.remove(&key(host, port, dropper, victim))
    }

    /// Look for a recorded drop between the two players in either
    /// direction; remove it and return `(dropper, victim)` as stored.
    pub fn take_pair(
        &mut self,
        host: &str,
        port: u16,
        p1: &str,
        p2: &str,
    ) -> Option<(String, String)> {
        if self.remove(host, port, p1, p2) {
            return Some((p1.to_string(), p2.to_string()));
        }
        if self.remove(host, port, p2, p1) {
            return Some((p2.to_string(), p1.to_string()));
        }
        None
    }

    /// Forget both directions, as on a normally finished match.
    pub fn remove_pair(&mut self, host: &str, port: u16, p1: &str, p2: &str) {
        self.remove(host, port, p1, p2);
        self.remove(host, port, p2, p1);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_take_either_direction() {
        let mut set = DropperSet::new();
        assert!(set.insert("example.com", 4321, "alice", "bob"));
        assert!(!set.insert("example.com", 4321, "alice", "bob"));
        // Different server, different key.
        assert!(set.insert("other.example.com", 4321, "alice", "bob"));

        let taken = set.take_pair("example.com", 4321, "bob", "alice");
        assert_eq!(taken, Some(("alice".to_string(), "bob".to_string())));
        assert!(set.take_pair("example.com", 4321, "alice", "bob").is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_pair_clears_both_directions() {
        let mut set = DropperSet::new();
        set.insert("example.com", 4321, "alice", "bob");
        set.insert("example.com", 4321, "bob", "alice");
        set.remove_pair("example.com", 4321, "alice", "bob");
        assert!(set.is_empty());
    }
}
