// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory cache with TTL, tag index and pattern invalidation.
//!
//! Sits in front of the store on hot read paths. Every key carries a tag
//! set; mutations expire dependent reads by invalidating tags rather
//! than enumerating keys. The cache is a derivative: any entry may be
//! discarded at any time and readers fall back to the store.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

use warden_core::Clock;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Hit/miss counters. `hit_rate` is derived at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub invalidations: u64,
    pub size: usize,
    pub tag_count: usize,
    pub hit_rate: f64,
}

struct Entry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
    tags: HashSet<String>,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    sets: u64,
    deletes: u64,
    invalidations: u64,
}

struct CacheState {
    entries: HashMap<String, Entry>,
    /// tag → keys carrying it. Kept in lockstep with the forward map:
    /// every key appears in the reverse index of each of its tags and
    /// vice versa.
    tags: HashMap<String, HashSet<String>>,
    counters: Counters,
}

/// Tag-indexed TTL cache. One lock, held per operation; values are never
/// computed while holding it.
pub struct Cache<C: Clock> {
    state: Mutex<CacheState>,
    default_ttl: Duration,
    clock: C,
}

impl<C: Clock> Cache<C> {
    pub fn new(clock: C, default_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                tags: HashMap::new(),
                counters: Counters::default(),
            }),
            default_ttl,
            clock,
        }
    }

    pub fn with_default_ttl(clock: C) -> Self {
        Self::new(clock, DEFAULT_TTL)
    }

    /// Fetch a live entry. Expired entries are removed lazily here.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            None => {
                state.counters.misses += 1;
                return None;
            }
            Some(entry) => now.duration_since(entry.inserted_at) >= entry.ttl,
        };

        if expired {
            remove_entry(&mut state, key);
            state.counters.misses += 1;
            return None;
        }

        state.counters.hits += 1;
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: Value, tags: &[&str]) {
        self.set_with_ttl(key, value, tags, self.default_ttl)
    }

    pub fn set_with_ttl(&self, key: &str, value: Value, tags: &[&str], ttl: Duration) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        // Replacing a key first unlinks its old tags.
        remove_entry(&mut state, key);

        let tag_set: HashSet<String> = tags.iter().map(|t| t.to_string()).collect();
        for tag in &tag_set {
            state.tags.entry(tag.clone()).or_default().insert(key.to_string());
        }
        state
            .entries
            .insert(key.to_string(), Entry { value, inserted_at: now, ttl, tags: tag_set });
        state.counters.sets += 1;
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = remove_entry(&mut state, key);
        if removed {
            state.counters.deletes += 1;
        }
        removed
    }

    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        state.tags.clear();
        state.counters.invalidations += count as u64;
        count
    }

    /// Delete every key carrying `tag`; returns the count removed.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut state = self.state.lock();
        let keys: Vec<String> =
            state.tags.get(tag).map(|keys| keys.iter().cloned().collect()).unwrap_or_default();
        for key in &keys {
            remove_entry(&mut state, key);
        }
        state.counters.invalidations += keys.len() as u64;
        keys.len()
    }

    pub fn invalidate_tags(&self, tags: &[&str]) -> usize {
        tags.iter().map(|tag| self.invalidate_by_tag(tag)).sum()
    }

    /// Delete every key matching the regex; returns the count removed.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize, regex::Error> {
        let re = regex::Regex::new(pattern)?;
        let mut state = self.state.lock();
        let keys: Vec<String> =
            state.entries.keys().filter(|k| re.is_match(k)).cloned().collect();
        for key in &keys {
            remove_entry(&mut state, key);
        }
        state.counters.invalidations += keys.len() as u64;
        Ok(keys.len())
    }

    /// Evict entries older than `age`, regardless of TTL. Used by the
    /// memory-pressure controller.
    pub fn evict_older_than(&self, age: Duration) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.inserted_at) > age)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            remove_entry(&mut state, key);
        }
        state.counters.invalidations += keys.len() as u64;
        keys.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let c = &state.counters;
        let lookups = c.hits + c.misses;
        CacheStats {
            hits: c.hits,
            misses: c.misses,
            sets: c.sets,
            deletes: c.deletes,
            invalidations: c.invalidations,
            size: state.entries.len(),
            tag_count: state.tags.len(),
            hit_rate: if lookups == 0 { 0.0 } else { c.hits as f64 / lookups as f64 },
        }
    }

    pub fn reset_stats(&self) {
        self.state.lock().counters = Counters::default();
    }
}

/// Remove `key` and repair the reverse index. Both sides change under
/// the caller's lock, so they can never diverge.
fn remove_entry(state: &mut CacheState, key: &str) -> bool {
    match state.entries.remove(key) {
        None => false,
        Some(entry) => {
            for tag in &entry.tags {
                if let Some(keys) = state.tags.get_mut(tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        state.tags.remove(tag);
                    }
                }
            }
            true
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
