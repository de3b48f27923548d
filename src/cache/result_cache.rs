//! TTL cache for upstream query results.
//!
//! Entries are stored as JSON values under namespaced keys
//! (`geocode:{category}:{identifier}`), so any serde type can be cached and
//! the transport could be swapped for a remote key-value store without
//! touching callers.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;
use xxhash_rust::xxh64::xxh64;

use crate::models::Direction;

/// Identifiers longer than this are hashed to keep keys short.
const MAX_IDENTIFIER_LEN: usize = 100;

/// Kind of cached query. Each category has its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    /// `search_places_fuzzy` results
    Fuzzy,
    /// `find_places_in_direction` results
    Directional,
    /// External geocoder coordinates
    External,
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Fuzzy => "fuzzy",
            CacheCategory::Directional => "directional",
            CacheCategory::External => "external",
        }
    }
}

/// Time-to-live per cache category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub fuzzy: Duration,
    pub directional: Duration,
    pub external: Duration,
}

impl CacheTtls {
    pub fn for_category(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Fuzzy => self.fuzzy,
            CacheCategory::Directional => self.directional,
            CacheCategory::External => self.external,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            fuzzy: Duration::hours(1),
            directional: Duration::hours(24),
            external: Duration::days(30),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: serde_json::Value,
    inserted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Bounded, TTL-expiring result cache shared by all requests.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
    ttls: CacheTtls,
}

impl ResultCache {
    pub fn new(capacity: usize, ttls: CacheTtls) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttls,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, category: CacheCategory, identifier: &str) -> Option<T> {
        self.get_at(category, identifier, Utc::now())
    }

    pub fn set<T: Serialize>(&self, category: CacheCategory, identifier: &str, value: &T) {
        self.set_at(category, identifier, value, Utc::now())
    }

    pub(crate) fn get_at<T: DeserializeOwned>(
        &self,
        category: CacheCategory,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let key = make_key(category, identifier);
        let payload = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                Some(entry) if entry.expires_at > now => entry.payload.clone(),
                Some(_) => {
                    entries.remove(&key);
                    debug!("Cache EXPIRED: {}", key);
                    return None;
                }
                None => {
                    debug!("Cache MISS: {}", key);
                    return None;
                }
            }
        };

        match serde_json::from_value(payload) {
            Ok(value) => {
                debug!("Cache HIT: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                self.remove(category, identifier);
                None
            }
        }
    }

    pub(crate) fn set_at<T: Serialize>(
        &self,
        category: CacheCategory,
        identifier: &str,
        value: &T,
        now: DateTime<Utc>,
    ) {
        let payload = match serde_json::to_value(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("Cache SET skipped for {}: {}", category.as_str(), e);
                return;
            }
        };

        let key = make_key(category, identifier);
        let ttl = self.ttls.for_category(category);
        let Some(expires_at) = now.checked_add_signed(ttl) else {
            warn!(
                "Cache SET skipped for {}: TTL of {}s overflows the clock",
                key,
                ttl.num_seconds()
            );
            return;
        };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            purge(&mut entries, self.capacity, now);
        }

        debug!("Cache SET: {} (TTL={}s)", key, ttl.num_seconds());
        entries.insert(
            key,
            CacheEntry {
                payload,
                inserted_at: now,
                expires_at,
            },
        );
    }

    pub fn remove(&self, category: CacheCategory, identifier: &str) -> bool {
        let key = make_key(category, identifier);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    /// Drop every entry of one category, returning how many were removed.
    pub fn clear_category(&self, category: CacheCategory) -> usize {
        let prefix = format!("geocode:{}:", category.as_str());
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(&prefix));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Make room for one more entry: expired entries go first, then the oldest.
fn purge(entries: &mut HashMap<String, CacheEntry>, capacity: usize, now: DateTime<Utc>) {
    entries.retain(|_, e| e.expires_at > now);

    if entries.len() < capacity {
        return;
    }

    let mut by_age: Vec<(String, DateTime<Utc>)> = entries
        .iter()
        .map(|(k, e)| (k.clone(), e.inserted_at))
        .collect();
    by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

    let excess = entries.len() + 1 - capacity;
    for (key, _) in by_age.into_iter().take(excess) {
        entries.remove(&key);
    }
}

fn make_key(category: CacheCategory, identifier: &str) -> String {
    if identifier.len() > MAX_IDENTIFIER_LEN {
        format!("geocode:{}:{:016x}", category.as_str(), xxh64(identifier.as_bytes(), 0))
    } else {
        format!("geocode:{}:{}", category.as_str(), identifier)
    }
}

/// Identifier for a fuzzy search: normalized name plus threshold.
pub fn fuzzy_identifier(name: &str, threshold: f64) -> String {
    format!("{}:{}", normalize(name), threshold)
}

/// Identifier for a region query: base ids in sorted order plus direction.
pub fn directional_identifier(base_ids: &[Uuid], direction: Direction) -> String {
    let mut ids: Vec<String> = base_ids.iter().map(Uuid::to_string).collect();
    ids.sort();
    ids.dedup();
    format!("{}:{}", ids.join(","), direction.as_str())
}

/// Identifier for an external geocode: normalized name plus country filter.
pub fn external_identifier(name: &str, country: &str) -> String {
    format!("{}:{}", normalize(name), country.to_lowercase())
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
