// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource sample persistence

use rusqlite::params;

use warden_core::{EpochMs, ProgramId, ResourceSample};

use crate::{Store, StoreError};

impl Store {
    /// Insert a batch of samples in one transaction. The batch is the
    /// unit of durability: all rows land or none do.
    pub fn insert_samples_batch(&self, rows: &[ResourceSample]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        self.with_conn_retry(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO resource_usage (program_id, cpu_percent, memory_mb, ts_ms)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for sample in rows {
                    stmt.execute(params![
                        sample.program_id,
                        sample.cpu_percent,
                        sample.memory_mb,
                        sample.ts_ms
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Samples for one program since `since_ms`, oldest first.
    pub fn list_samples(
        &self,
        program_id: ProgramId,
        since_ms: EpochMs,
    ) -> Result<Vec<ResourceSample>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT program_id, cpu_percent, memory_mb, ts_ms
                 FROM resource_usage
                 WHERE program_id = ?1 AND ts_ms >= ?2
                 ORDER BY ts_ms, id",
            )?;
            let samples = stmt
                .query_map(params![program_id, since_ms], sample_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(samples)
        })
    }

    /// Paged reader over one program's samples. Each page acquires its
    /// own connection, so no connection is held between pages.
    pub fn stream_samples(
        &self,
        program_id: ProgramId,
        since_ms: EpochMs,
        batch_size: u32,
    ) -> SampleStream {
        SampleStream {
            store: self.clone(),
            program_id,
            since_ms,
            batch_size: batch_size.max(1),
            last_id: 0,
            done: false,
        }
    }

    /// Delete samples older than `days`, returning the row count removed.
    pub fn purge_samples_older_than(
        &self,
        days: u32,
        now_ms: EpochMs,
    ) -> Result<usize, StoreError> {
        let cutoff_ms = now_ms - i64::from(days) * 86_400_000;
        self.with_conn_retry(|conn| {
            let purged =
                conn.execute("DELETE FROM resource_usage WHERE ts_ms < ?1", [cutoff_ms])?;
            Ok(purged)
        })
    }
}

fn sample_from_row(row: &rusqlite::Row<'_>) -> Result<ResourceSample, rusqlite::Error> {
    Ok(ResourceSample {
        program_id: row.get(0)?,
        cpu_percent: row.get(1)?,
        memory_mb: row.get(2)?,
        ts_ms: row.get(3)?,
    })
}

/// Keyset-paginated sample reader. Yields batches oldest-first until the
/// table is exhausted; never holds a connection across yields.
pub struct SampleStream {
    store: Store,
    program_id: ProgramId,
    since_ms: EpochMs,
    batch_size: u32,
    last_id: i64,
    done: bool,
}

impl Iterator for SampleStream {
    type Item = Result<Vec<ResourceSample>, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let page = self.store.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT program_id, cpu_percent, memory_mb, ts_ms, id
                 FROM resource_usage
                 WHERE program_id = ?1 AND ts_ms >= ?2 AND id > ?3
                 ORDER BY id
                 LIMIT ?4",
            )?;
            let rows = stmt
                .query_map(
                    params![self.program_id, self.since_ms, self.last_id, self.batch_size],
                    |row| Ok((sample_from_row(row)?, row.get::<_, i64>(4)?)),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        });

        match page {
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
            Ok(rows) if rows.is_empty() => {
                self.done = true;
                None
            }
            Ok(rows) => {
                if rows.len() < self.batch_size as usize {
                    self.done = true;
                }
                if let Some((_, id)) = rows.last() {
                    self.last_id = *id;
                }
                Some(Ok(rows.into_iter().map(|(sample, _)| sample).collect()))
            }
        }
    }
}

#[cfg(test)]
#[path = "samples_tests.rs"]
mod tests;
