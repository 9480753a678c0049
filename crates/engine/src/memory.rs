// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative memory-pressure controller.
//!
//! Samples host RSS utilisation on a 1 Hz cadence and relieves pressure
//! by shedding cache: a full clear at the critical threshold, age-based
//! eviction at the warning threshold, with a cool-down so consecutive
//! ticks do not thrash.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use warden_adapters::ProcessAdapter;
use warden_core::{Clock, EpochMs};

use crate::cache::Cache;

const CRITICAL_PCT: f32 = 90.0;
const WARNING_PCT: f32 = 80.0;
const CAUTION_PCT: f32 = 70.0;

/// Minimum time between cleanups.
const CLEANUP_COOLDOWN: Duration = Duration::from_secs(60);

/// Entries older than this are shed at the warning threshold.
const STALE_AGE: Duration = Duration::from_secs(60);

/// Reported pressure level, for the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    Normal,
    Caution,
    Warning,
    Critical,
}

/// Memory controller task state.
pub struct MemoryController<C: Clock> {
    cache: Arc<Cache<C>>,
    adapter: Arc<dyn ProcessAdapter>,
    clock: C,
    last_cleanup_ms: Mutex<Option<EpochMs>>,
    level: Mutex<PressureLevel>,
}

impl<C: Clock> MemoryController<C> {
    pub fn new(cache: Arc<Cache<C>>, adapter: Arc<dyn ProcessAdapter>, clock: C) -> Self {
        Self {
            cache,
            adapter,
            clock,
            last_cleanup_ms: Mutex::new(None),
            level: Mutex::new(PressureLevel::Normal),
        }
    }

    /// Current level as of the last check.
    pub fn level(&self) -> PressureLevel {
        *self.level.lock()
    }

    /// One pressure check. Split out from the loop so tests drive it
    /// directly.
    pub fn check(&self) -> PressureLevel {
        let memory = self.adapter.host_memory();
        let pct = memory.used_pct;

        let level = if pct >= CRITICAL_PCT {
            if self.cooldown_elapsed() {
                let cleared = self.cache.clear();
                self.mark_cleanup();
                warn!(used_pct = pct, cleared, "critical memory pressure, cache cleared");
            }
            PressureLevel::Critical
        } else if pct >= WARNING_PCT {
            if self.cooldown_elapsed() {
                let evicted = self.cache.evict_older_than(STALE_AGE);
                self.mark_cleanup();
                info!(used_pct = pct, evicted, "high memory pressure, stale cache evicted");
            }
            PressureLevel::Warning
        } else if pct >= CAUTION_PCT {
            PressureLevel::Caution
        } else {
            PressureLevel::Normal
        };

        *self.level.lock() = level;
        level
    }

    fn cooldown_elapsed(&self) -> bool {
        match *self.last_cleanup_ms.lock() {
            None => true,
            Some(last) => {
                self.clock.epoch_ms() - last >= CLEANUP_COOLDOWN.as_millis() as EpochMs
            }
        }
    }

    fn mark_cleanup(&self) {
        *self.last_cleanup_ms.lock() = Some(self.clock.epoch_ms());
    }

    /// Run the 1 Hz check loop until cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.check();
                    }
                }
            }
            info!("memory controller stopped");
        })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
