// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned schema migrations

use rusqlite::Connection;

use crate::StoreError;

/// Migration steps, one entry per schema version. `user_version` records
/// how many have been applied; new steps are appended, never edited.
const MIGRATIONS: &[&str] = &[
    // v1: initial schema
    "CREATE TABLE users (
         id            INTEGER PRIMARY KEY AUTOINCREMENT,
         username      TEXT NOT NULL UNIQUE,
         password_hash TEXT NOT NULL,
         role          TEXT NOT NULL DEFAULT 'admin',
         created_at_ms INTEGER NOT NULL
     );
     CREATE INDEX idx_users_username ON users(username);

     CREATE TABLE programs (
         id                INTEGER PRIMARY KEY AUTOINCREMENT,
         name              TEXT NOT NULL,
         path              TEXT NOT NULL,
         args              TEXT,
         child_pid         INTEGER,
         shutdown_start_ms INTEGER,
         shutdown_end_ms   INTEGER,
         created_at_ms     INTEGER NOT NULL,
         updated_at_ms     INTEGER NOT NULL
     );
     CREATE INDEX idx_programs_name ON programs(name);

     CREATE TABLE webhook_urls (
         id            INTEGER PRIMARY KEY AUTOINCREMENT,
         program_id    INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
         url           TEXT NOT NULL,
         created_at_ms INTEGER NOT NULL
     );
     CREATE INDEX idx_webhook_urls_program_id ON webhook_urls(program_id);

     CREATE TABLE program_events (
         id         INTEGER PRIMARY KEY AUTOINCREMENT,
         program_id INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
         kind       TEXT NOT NULL,
         details    TEXT NOT NULL DEFAULT '',
         ts_ms      INTEGER NOT NULL
     );
     CREATE INDEX idx_program_events_program_ts
         ON program_events(program_id, ts_ms DESC);

     CREATE TABLE resource_usage (
         id          INTEGER PRIMARY KEY AUTOINCREMENT,
         program_id  INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
         cpu_percent REAL NOT NULL,
         memory_mb   REAL NOT NULL,
         ts_ms       INTEGER NOT NULL
     );
     CREATE INDEX idx_resource_usage_program_ts
         ON resource_usage(program_id, ts_ms DESC);

     CREATE TABLE plugin_configs (
         id            INTEGER PRIMARY KEY AUTOINCREMENT,
         program_id    INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
         plugin_id     TEXT NOT NULL,
         config_json   TEXT NOT NULL DEFAULT '{}',
         enabled       INTEGER NOT NULL DEFAULT 1,
         created_at_ms INTEGER NOT NULL,
         updated_at_ms INTEGER NOT NULL,
         UNIQUE(program_id, plugin_id)
     );
     CREATE INDEX idx_plugin_configs_program_id ON plugin_configs(program_id);",
];

/// Apply any migrations past the database's recorded version.
pub(crate) fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let version: usize =
        conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))? as usize;

    if version >= MIGRATIONS.len() {
        return Ok(());
    }

    for (idx, step) in MIGRATIONS.iter().enumerate().skip(version) {
        let tx = conn.transaction()?;
        tx.execute_batch(step)?;
        // PRAGMA does not support bound parameters.
        tx.execute_batch(&format!("PRAGMA user_version = {}", idx + 1))?;
        tx.commit()?;
        tracing::info!(version = idx + 1, "applied schema migration");
    }

    Ok(())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
