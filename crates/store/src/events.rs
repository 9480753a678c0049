// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only program event history

use rusqlite::params;

use warden_core::{EpochMs, EventKind, ProgramEvent, ProgramId};

use crate::{Store, StoreError};

impl Store {
    /// Append one history entry. Rows are never updated; retention is the
    /// only deleter.
    pub fn append_event(
        &self,
        program_id: ProgramId,
        kind: EventKind,
        details: &str,
        ts_ms: EpochMs,
    ) -> Result<i64, StoreError> {
        self.with_conn_retry(|conn| {
            conn.execute(
                "INSERT INTO program_events (program_id, kind, details, ts_ms)
                 VALUES (?1, ?2, ?3, ?4)",
                params![program_id, kind.as_str(), details, ts_ms],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Most recent events first, capped at `limit`.
    pub fn list_events(
        &self,
        program_id: ProgramId,
        limit: u32,
    ) -> Result<Vec<ProgramEvent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, program_id, kind, details, ts_ms
                 FROM program_events
                 WHERE program_id = ?1
                 ORDER BY ts_ms DESC, id DESC
                 LIMIT ?2",
            )?;
            let events = stmt
                .query_map(params![program_id, limit], |row| {
                    Ok(ProgramEvent {
                        id: row.get(0)?,
                        program_id: row.get(1)?,
                        kind: EventKind::parse(&row.get::<_, String>(2)?),
                        details: row.get(3)?,
                        ts_ms: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(events)
        })
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
