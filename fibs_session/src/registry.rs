//! Player and inviter registries, keyed by player name.

use std::collections::{hash_map, HashMap};

/// Mean of the archive's per-session activity votes (+1 completed, -1
/// dropped, +1.5 resumed) with the count of non-void votes.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Reliability {
    pub value: f64,
    pub confidence: u32,
}

/// One row of the roster. `opponent` and `watching` are empty when there
/// is no such edge; at most one of them is non-empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Player {
    pub name: String,
    pub opponent: String,
    pub watching: String,
    pub available: bool,
    pub away: bool,
    pub rating: f64,
    pub experience: u64,
    pub reliability: Reliability,
    pub client: String,
    pub hostname: String,
    pub country: String,
    pub email: String,
    pub has_saved: bool,
}

#[derive(Debug, Default)]
pub struct PlayerList {
    players: HashMap<String, Player>,
}

impl PlayerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.get_mut(name)
    }

    /// Insert or update, preserving fields the roster line does not carry
    /// (reliability, country, saved flag).
    pub fn upsert(&mut self, player: Player) -> &Player {
        match self.players.entry(player.name.clone()) {
            hash_map::Entry::Occupied(e) => {
                let existing = e.into_mut();
                let keep = (
                    existing.reliability,
                    existing.country.clone(),
                    existing.has_saved,
                );
                *existing = player;
                (existing.reliability, existing.country, existing.has_saved) = keep;
                existing
            }
            hash_map::Entry::Vacant(e) => e.insert(player),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Player> {
        self.players.remove(name)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }
}

/// An invitation row: the inviting player plus the proposed match length
/// (0 = unlimited, -1 = resume a saved match).
#[derive(Debug, Clone, PartialEq)]
pub struct Inviter {
    pub player: Player,
    pub length: i64,
}

#[derive(Debug, Default)]
pub struct InviterList {
    inviters: HashMap<String, Inviter>,
}

impl InviterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Inviter> {
        self.inviters.get(name)
    }

    pub fn upsert(&mut self, inviter: Inviter) -> &Inviter {
        self.inviters
            .entry(inviter.player.name.clone())
            .and_modify(|e| *e = inviter.clone())
            .or_insert(inviter)
    }

    /// Refresh the embedded player data, keeping the invitation length.
    pub fn refresh(&mut self, player: &Player) -> Option<&Inviter> {
        let entry = self.inviters.get_mut(&player.name)?;
        entry.player = player.clone();
        Some(entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<Inviter> {
        self.inviters.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.inviters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Inviter> {
        self.inviters.values()
    }
}

/// A server-side saved match as reported by `show saved`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SavedInfo {
    pub opponent: String,
    pub match_length: u64,
    pub scores: [u8; 2],
}
