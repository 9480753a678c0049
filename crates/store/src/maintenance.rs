// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention purges, vacuum and byte accounting

use warden_core::{EpochMs, RetentionPolicy};

use crate::{Store, StoreError};

/// Tables callers may ask byte accounting for. Interpolated into the
/// dbstat query, so the set is closed.
const KNOWN_TABLES: &[&str] =
    &["users", "programs", "webhook_urls", "program_events", "resource_usage", "plugin_configs"];

/// Outcome of one archiving pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub samples_purged: usize,
    pub events_purged: usize,
    pub db_bytes_before: u64,
    pub db_bytes_after: u64,
}

impl Store {
    /// Delete events older than `days`, returning the row count removed.
    pub fn purge_events_older_than(
        &self,
        days: u32,
        now_ms: EpochMs,
    ) -> Result<usize, StoreError> {
        let cutoff_ms = now_ms - i64::from(days) * 86_400_000;
        self.with_conn_retry(|conn| {
            let purged =
                conn.execute("DELETE FROM program_events WHERE ts_ms < ?1", [cutoff_ms])?;
            Ok(purged)
        })
    }

    /// Reclaim free pages and refresh planner statistics.
    pub fn vacuum_and_analyze(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch("VACUUM; ANALYZE;")?;
            Ok(())
        })
    }

    /// On-disk bytes attributed to one table (dbstat virtual table).
    pub fn table_bytes(&self, table: &str) -> Result<u64, StoreError> {
        if !KNOWN_TABLES.contains(&table) {
            return Err(StoreError::NotFound(format!("table {table}")));
        }
        self.with_conn(|conn| {
            let bytes: i64 = conn.query_row(
                "SELECT COALESCE(SUM(pgsize), 0) FROM dbstat WHERE name = ?1",
                [table],
                |row| row.get(0),
            )?;
            Ok(bytes as u64)
        })
    }

    /// Total database size from the page counters.
    pub fn db_bytes(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let pages: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
            Ok((pages * page_size) as u64)
        })
    }

    /// One archiving pass: purge past-retention rows, then vacuum.
    pub fn archive(
        &self,
        retention: RetentionPolicy,
        now_ms: EpochMs,
    ) -> Result<ArchiveSummary, StoreError> {
        let db_bytes_before = self.db_bytes()?;
        let samples_purged = self.purge_samples_older_than(retention.metric_days, now_ms)?;
        let events_purged = self.purge_events_older_than(retention.event_days, now_ms)?;
        self.vacuum_and_analyze()?;
        let db_bytes_after = self.db_bytes()?;

        tracing::info!(
            samples_purged,
            events_purged,
            db_bytes_before,
            db_bytes_after,
            "archiving pass complete"
        );

        Ok(ArchiveSummary { samples_purged, events_purged, db_bytes_before, db_bytes_after })
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
