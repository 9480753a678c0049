// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric buffer: batches resource samples into single store inserts.
//!
//! Samples arrive once per program per sweep; writing each row
//! individually would dominate disk I/O. The buffer flushes on a timer
//! and immediately at capacity, so a sample is never dropped silently.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use warden_core::{Clock, ProgramId, ResourceSample};
use warden_store::Store;

/// Default buffer capacity before a forced flush.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default periodic flush interval.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Thread-safe sample buffer with batched persistence.
pub struct MetricBuffer<C: Clock> {
    samples: Mutex<Vec<ResourceSample>>,
    capacity: usize,
    store: Store,
    clock: C,
}

impl<C: Clock> MetricBuffer<C> {
    pub fn new(store: Store, clock: C, capacity: usize) -> Self {
        Self { samples: Mutex::new(Vec::new()), capacity: capacity.max(1), store, clock }
    }

    /// Append one sample. When the buffer reaches capacity the flush runs
    /// under the same lock, so the capacity can never be overrun.
    pub fn add(&self, program_id: ProgramId, cpu_percent: f32, memory_mb: f64) {
        let mut samples = self.samples.lock();
        samples.push(ResourceSample {
            program_id,
            cpu_percent,
            memory_mb,
            ts_ms: self.clock.epoch_ms(),
        });
        if samples.len() >= self.capacity {
            flush_locked(&self.store, &mut samples);
        }
    }

    /// Drain and persist everything buffered.
    pub fn flush(&self) {
        let mut samples = self.samples.lock();
        flush_locked(&self.store, &mut samples);
    }

    /// Buffered sample count.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Run the periodic flusher until cancelled, then flush one final
    /// time so the last window of samples lands before the store closes.
    pub fn spawn_flusher(
        self: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => self.flush(),
                }
            }
            self.flush();
            info!("metric buffer flusher stopped");
        })
    }
}

fn flush_locked(store: &Store, samples: &mut Vec<ResourceSample>) {
    if samples.is_empty() {
        return;
    }
    let batch = std::mem::take(samples);
    match store.insert_samples_batch(&batch) {
        Ok(()) => debug!(count = batch.len(), "metric batch persisted"),
        // The failed batch is lost; say so instead of requeueing and
        // compounding the pressure that likely caused the failure.
        Err(e) => error!(count = batch.len(), error = %e, "metric batch dropped"),
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
