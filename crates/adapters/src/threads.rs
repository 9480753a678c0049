// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted program → remote-thread-id bindings.
//!
//! A small JSON file in the data directory maps program names to the
//! conversation thread the destination created for them, so repeated
//! notifications about one program land in the same thread.

use std::collections::BTreeMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::warn;

/// Thread-binding file, `webhook_threads.json`.
pub struct ThreadBindings {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ThreadBindings {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    pub fn get(&self, program_name: &str) -> Option<String> {
        let _guard = self.lock.lock();
        self.load().get(program_name).cloned()
    }

    pub fn set(&self, program_name: &str, thread_id: &str) {
        let _guard = self.lock.lock();
        let mut map = self.load();
        map.insert(program_name.to_string(), thread_id.to_string());
        self.save(&map);
    }

    pub fn remove(&self, program_name: &str) {
        let _guard = self.lock.lock();
        let mut map = self.load();
        if map.remove(program_name).is_some() {
            self.save(&map);
        }
    }

    fn load(&self) -> BTreeMap<String, String> {
        match std::fs::read(&self.path) {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "thread bindings unreadable");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        }
    }

    /// Write-temp-then-rename so a crash mid-write never truncates the
    /// bindings file.
    fn save(&self, map: &BTreeMap<String, String>) {
        let tmp = self.path.with_extension("json.tmp");
        let payload = match serde_json::to_vec_pretty(map) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "thread bindings serialize failed");
                return;
            }
        };
        if let Err(e) =
            std::fs::write(&tmp, payload).and_then(|()| std::fs::rename(&tmp, &self.path))
        {
            warn!(path = %self.path.display(), error = %e, "thread bindings write failed");
        }
    }
}

#[cfg(test)]
#[path = "threads_tests.rs"]
mod tests;
