// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size connection pool with acquire/release accounting

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, warn};

use crate::StoreError;

/// Acquire budget. Callers block up to this long when the pool is empty.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Acquires slower than this are individually logged.
const SLOW_ACQUIRE: Duration = Duration::from_millis(250);

/// Aggregate acquire/release counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquires: u64,
    pub releases: u64,
    pub max_wait_ms: u64,
    pub in_use: u32,
    pub idle: u32,
}

#[derive(Default)]
struct Counters {
    acquires: AtomicU64,
    releases: AtomicU64,
    max_wait_ms: AtomicU64,
}

/// Pool of SQLite connections, each configured for WAL operation.
#[derive(Clone)]
pub(crate) struct Pool {
    inner: r2d2::Pool<SqliteConnectionManager>,
    counters: Arc<Counters>,
}

impl Pool {
    pub(crate) fn open(path: &Path, size: u32) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            // WAL journaling, normal sync, 10 MiB page cache, in-memory
            // temp tables, FK enforcement. cache_size is negative KiB.
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA cache_size = -10240;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA wal_autocheckpoint = 1000;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
        });

        let inner = r2d2::Pool::builder()
            .max_size(size)
            .connection_timeout(ACQUIRE_TIMEOUT)
            .build(manager)
            .map_err(StoreError::from)?;

        Ok(Self { inner, counters: Arc::new(Counters::default()) })
    }

    /// Borrow a connection, blocking while the pool is empty. The guard
    /// returns the connection and bumps the release counter on drop, so
    /// error paths release too.
    pub(crate) fn acquire(&self) -> Result<ConnGuard, StoreError> {
        let started = Instant::now();
        let conn = self.inner.get()?;
        let waited = started.elapsed();

        self.counters.acquires.fetch_add(1, Ordering::Relaxed);
        self.counters.max_wait_ms.fetch_max(waited.as_millis() as u64, Ordering::Relaxed);
        if waited >= SLOW_ACQUIRE {
            warn!(wait_ms = waited.as_millis() as u64, "slow store connection acquire");
        } else {
            debug!(wait_us = waited.as_micros() as u64, "store connection acquired");
        }

        Ok(ConnGuard { conn: Some(conn), counters: Arc::clone(&self.counters) })
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let state = self.inner.state();
        PoolStats {
            acquires: self.counters.acquires.load(Ordering::Relaxed),
            releases: self.counters.releases.load(Ordering::Relaxed),
            max_wait_ms: self.counters.max_wait_ms.load(Ordering::Relaxed),
            in_use: state.connections - state.idle_connections,
            idle: state.idle_connections,
        }
    }
}

/// Borrowed connection. Derefs to `rusqlite::Connection`; counted back
/// into the pool when dropped.
pub(crate) struct ConnGuard {
    conn: Option<PooledConnection<SqliteConnectionManager>>,
    counters: Arc<Counters>,
}

impl Drop for ConnGuard {
    fn drop(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::Relaxed);
        drop(self.conn.take());
    }
}

impl std::ops::Deref for ConnGuard {
    type Target = rusqlite::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.conn {
            Some(conn) => conn,
            // Only None after drop; unreachable while borrowed.
            None => unreachable!("connection guard used after drop"),
        }
    }
}

impl std::ops::DerefMut for ConnGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection guard used after drop"),
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
