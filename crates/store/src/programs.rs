// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Program registry operations

use std::path::PathBuf;

use rusqlite::{params, Connection, OptionalExtension, Row};

use warden_core::{EpochMs, GracefulWindow, Program, ProgramDraft, ProgramId};

use crate::{Store, StoreError};

impl Store {
    /// All registered programs with their webhook URL sets, in one
    /// round-trip (LEFT JOIN folded in memory, no per-program query).
    pub fn list_programs(&self) -> Result<Vec<Program>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT p.id, p.name, p.path, p.args, p.child_pid,
                        p.shutdown_start_ms, p.shutdown_end_ms,
                        p.created_at_ms, p.updated_at_ms, w.url
                 FROM programs p
                 LEFT JOIN webhook_urls w ON w.program_id = p.id
                 ORDER BY p.id, w.id",
            )?;

            let mut programs: Vec<Program> = Vec::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let id: ProgramId = row.get(0)?;
                if programs.last().map(|p| p.id) != Some(id) {
                    programs.push(program_from_row(row)?);
                }
                if let Some(url) = row.get::<_, Option<String>>(9)? {
                    if let Some(program) = programs.last_mut() {
                        program.webhook_urls.push(url);
                    }
                }
            }
            Ok(programs)
        })
    }

    pub fn get_program(&self, id: ProgramId) -> Result<Option<Program>, StoreError> {
        self.with_conn(|conn| {
            let program = conn
                .query_row(
                    "SELECT id, name, path, args, child_pid,
                            shutdown_start_ms, shutdown_end_ms,
                            created_at_ms, updated_at_ms, NULL
                     FROM programs WHERE id = ?1",
                    [id],
                    program_from_row,
                )
                .optional()?;

            match program {
                None => Ok(None),
                Some(mut program) => {
                    program.webhook_urls = load_urls(conn, id)?;
                    Ok(Some(program))
                }
            }
        })
    }

    /// Register a program. The path must already be normalized by the
    /// caller (`warden_core::normalize_path`).
    pub fn create_program(
        &self,
        draft: &ProgramDraft,
        now_ms: EpochMs,
    ) -> Result<Program, StoreError> {
        self.with_conn_retry(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO programs (name, path, args, created_at_ms, updated_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![draft.name, draft.path.to_string_lossy(), draft.args, now_ms],
            )?;
            let id = tx.last_insert_rowid();
            replace_urls(&tx, id, &draft.webhook_urls, now_ms)?;
            tx.commit()?;

            Ok(Program {
                id,
                name: draft.name.clone(),
                path: draft.path.clone(),
                args: draft.args.clone(),
                webhook_urls: draft.webhook_urls.clone(),
                child_pid: None,
                graceful: None,
                created_at_ms: now_ms,
                updated_at_ms: now_ms,
            })
        })
    }

    /// Update name/path/args and replace the webhook URL set.
    pub fn update_program(
        &self,
        id: ProgramId,
        draft: &ProgramDraft,
        now_ms: EpochMs,
    ) -> Result<(), StoreError> {
        self.with_conn_retry(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE programs SET name = ?1, path = ?2, args = ?3, updated_at_ms = ?4
                 WHERE id = ?5",
                params![draft.name, draft.path.to_string_lossy(), draft.args, now_ms, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("program {id}")));
            }
            tx.execute("DELETE FROM webhook_urls WHERE program_id = ?1", [id])?;
            replace_urls(&tx, id, &draft.webhook_urls, now_ms)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Delete a program; events, samples, URLs and plugin bindings cascade.
    pub fn delete_program(&self, id: ProgramId) -> Result<bool, StoreError> {
        self.with_conn_retry(|conn| {
            let changed = conn.execute("DELETE FROM programs WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn set_child_pid(&self, id: ProgramId, pid: u32) -> Result<(), StoreError> {
        self.with_conn_retry(|conn| {
            conn.execute("UPDATE programs SET child_pid = ?1 WHERE id = ?2", params![pid, id])?;
            Ok(())
        })
    }

    pub fn clear_child_pid(&self, id: ProgramId) -> Result<(), StoreError> {
        self.with_conn_retry(|conn| {
            conn.execute("UPDATE programs SET child_pid = NULL WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Record a graceful-shutdown window: start = now, end = now + secs.
    pub fn set_graceful_shutdown(
        &self,
        id: ProgramId,
        secs: u32,
        now_ms: EpochMs,
    ) -> Result<GracefulWindow, StoreError> {
        let window = GracefulWindow { start_ms: now_ms, end_ms: now_ms + i64::from(secs) * 1000 };
        self.with_conn_retry(|conn| {
            let changed = conn.execute(
                "UPDATE programs SET shutdown_start_ms = ?1, shutdown_end_ms = ?2 WHERE id = ?3",
                params![window.start_ms, window.end_ms, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("program {id}")));
            }
            Ok(window)
        })
    }

    pub fn clear_graceful_shutdown(&self, id: ProgramId) -> Result<(), StoreError> {
        self.with_conn_retry(|conn| {
            conn.execute(
                "UPDATE programs SET shutdown_start_ms = NULL, shutdown_end_ms = NULL
                 WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }
}

fn program_from_row(row: &Row<'_>) -> Result<Program, rusqlite::Error> {
    let graceful = match (
        row.get::<_, Option<EpochMs>>(5)?,
        row.get::<_, Option<EpochMs>>(6)?,
    ) {
        (Some(start_ms), Some(end_ms)) => Some(GracefulWindow { start_ms, end_ms }),
        _ => None,
    };

    Ok(Program {
        id: row.get(0)?,
        name: row.get(1)?,
        path: PathBuf::from(row.get::<_, String>(2)?),
        args: row.get(3)?,
        webhook_urls: Vec::new(),
        child_pid: row.get(4)?,
        graceful,
        created_at_ms: row.get(7)?,
        updated_at_ms: row.get(8)?,
    })
}

fn load_urls(conn: &Connection, id: ProgramId) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn
        .prepare_cached("SELECT url FROM webhook_urls WHERE program_id = ?1 ORDER BY id")?;
    let urls = stmt.query_map([id], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
    Ok(urls)
}

fn replace_urls(
    tx: &rusqlite::Transaction<'_>,
    id: ProgramId,
    urls: &[String],
    now_ms: EpochMs,
) -> Result<(), StoreError> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO webhook_urls (program_id, url, created_at_ms) VALUES (?1, ?2, ?3)",
    )?;
    for url in urls {
        stmt.execute(params![id, url, now_ms])?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "programs_tests.rs"]
mod tests;
