// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded SQLite store for the warden daemon.
//!
//! A single database file accessed through a fixed-size connection pool.
//! Every connection runs in write-ahead mode with normal synchronous
//! commits, a 10 MiB page cache and in-memory temp tables. Schema changes
//! go through versioned migrations applied at open.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backup;
mod error;
mod events;
mod maintenance;
mod plugins;
mod pool;
mod programs;
mod samples;
mod schema;
mod users;

pub use backup::BackupReport;
pub use error::StoreError;
pub use maintenance::ArchiveSummary;
pub use plugins::PluginBinding;
pub use pool::PoolStats;
pub use samples::SampleStream;

use std::path::{Path, PathBuf};

use pool::Pool;

/// Handle to the embedded store. Cheap to clone; all clones share the
/// same connection pool.
#[derive(Clone)]
pub struct Store {
    pool: Pool,
    db_path: PathBuf,
}

impl Store {
    /// Open (or create) the database at `path`, apply migrations, and
    /// build the connection pool.
    pub fn open(path: &Path, pool_size: u32) -> Result<Self, StoreError> {
        let pool = Pool::open(path, pool_size)?;
        let store = Self { pool, db_path: path.to_path_buf() };
        store.with_conn(|conn| schema::migrate(conn))?;
        Ok(store)
    }

    /// Path of the database file, for backups and byte accounting.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Pool acquire/release aggregates.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Run `f` with a pooled connection. The connection returns to the
    /// pool when the closure exits, on success and on error alike.
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut rusqlite::Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.pool.acquire()?;
        f(&mut conn)
    }

    /// Like [`with_conn`], retrying a bounded number of times when the
    /// database reports `BUSY` under write contention.
    fn with_conn_retry<T>(
        &self,
        mut f: impl FnMut(&mut rusqlite::Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        const BACKOFF_MS: [u64; 3] = [50, 100, 200];
        let mut attempt = 0;
        loop {
            match self.with_conn(&mut f) {
                Err(StoreError::Busy) if attempt < BACKOFF_MS.len() => {
                    std::thread::sleep(std::time::Duration::from_millis(BACKOFF_MS[attempt]));
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_store() -> (Store, tempfile::TempDir) {
    #[allow(clippy::unwrap_used)]
    {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("warden.db"), 2).unwrap();
        (store, dir)
    }
}
