//! The persistence contract the session drives.
//!
//! The session records activity votes, ratings, and finished matches
//! through this trait; it never depends on a concrete store. The activity
//! votes are implied by the save operations: `save_drop` posts -1 for the
//! dropper, `save_resume` +1.5 (or voids the earlier -1 when the resumed
//! opponent is a known bot), `save_win` +1 for both players.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gammon_core::Match;

use crate::error::ArchiveError;
use crate::registry::{Reliability, SavedInfo};

#[async_trait]
pub trait Archive: Send + Sync {
    async fn save_win(&self, host: &str, port: u16, winner: &str, loser: &str);
    async fn save_drop(&self, host: &str, port: u16, dropper: &str, victim: &str);
    async fn save_resume(&self, host: &str, port: u16, p1: &str, p2: &str);

    async fn update_user(&self, host: &str, port: u16, user: &str, rating: f64, experience: u64);
    async fn update_rank(
        &self,
        host: &str,
        port: u16,
        user: &str,
        rating: f64,
        experience: u64,
        when: DateTime<Utc>,
    ) -> Result<(), ArchiveError>;
    /// Unknown players rank at 1500.0 with no experience.
    async fn get_rank(&self, host: &str, port: u16, user: &str) -> (f64, u64);
    async fn get_reliability(&self, host: &str, port: u16, user: &str) -> Reliability;

    /// Resolve a hostname to a country code. May take arbitrarily long;
    /// callers go through [`CountryCache`] so that concurrent lookups for
    /// one hostname are not duplicated.
    async fn get_country(&self, host: &str, hostname: &str) -> String;

    async fn get_accounts(&self, host: &str, port: u16) -> Vec<String>;
    async fn get_saved(&self, host: &str, port: u16, login: &str)
        -> HashMap<String, SavedInfo>;

    async fn save_match(
        &self,
        host: &str,
        port: u16,
        login: &str,
        m: &Match,
    ) -> Result<(), ArchiveError>;
    /// Move a serialized match file into the dated archive hierarchy.
    async fn archive_match_file(&self, m: &Match, path: &Path) -> Result<(), ArchiveError>;

    async fn create_group(&self, host: &str, port: u16, login: &str, group: &str);
    async fn create_relation(
        &self,
        host: &str,
        port: u16,
        login: &str,
        group: &str,
        peer: &str,
    );
}

/// Memoized country lookups keyed by hostname.
///
/// The first query for a hostname stores a pessimistic empty entry right
/// away and reports that the caller should start the real resolution;
/// later queries see the cached value (possibly still the fallback) and
/// never start a second lookup.
#[derive(Debug, Default)]
pub struct CountryCache {
    entries: Mutex<HashMap<String, String>>,
}

pub enum CountryLookup {
    Cached(String),
    /// The caller owns the resolution and should call
    /// [`CountryCache::resolve`] when it completes.
    Start,
}

impl CountryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self, hostname: &str) -> CountryLookup {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        match entries.get(hostname) {
            Some(country) => CountryLookup::Cached(country.clone()),
            None => {
                entries.insert(hostname.to_string(), String::new());
                CountryLookup::Start
            }
        }
    }

    pub fn resolve(&self, hostname: &str, country: String) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(hostname.to_string(), country);
    }
}
