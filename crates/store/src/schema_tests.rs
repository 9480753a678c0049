// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn memory_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
    conn
}

#[test]
fn migrate_creates_all_tables() {
    let mut conn = memory_conn();
    migrate(&mut conn).unwrap();

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
             AND name IN ('users', 'programs', 'webhook_urls',
                          'program_events', 'resource_usage', 'plugin_configs')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 6);
}

#[test]
fn migrate_is_idempotent() {
    let mut conn = memory_conn();
    migrate(&mut conn).unwrap();
    migrate(&mut conn).unwrap();

    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
    assert_eq!(version as usize, MIGRATIONS.len());
}

#[test]
fn composite_indexes_exist() {
    let mut conn = memory_conn();
    migrate(&mut conn).unwrap();

    for index in ["idx_program_events_program_ts", "idx_resource_usage_program_ts"] {
        let found: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
                [index],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(found, 1, "missing index {index}");
    }
}

#[test]
fn deleting_program_cascades() {
    let mut conn = memory_conn();
    migrate(&mut conn).unwrap();

    conn.execute(
        "INSERT INTO programs (name, path, created_at_ms, updated_at_ms) VALUES ('p', '/bin/p', 0, 0)",
        [],
    )
    .unwrap();
    let id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO program_events (program_id, kind, ts_ms) VALUES (?1, 'start', 1)",
        [id],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO webhook_urls (program_id, url, created_at_ms) VALUES (?1, 'http://x', 1)",
        [id],
    )
    .unwrap();

    conn.execute("DELETE FROM programs WHERE id = ?1", [id]).unwrap();

    let events: i64 =
        conn.query_row("SELECT COUNT(*) FROM program_events", [], |row| row.get(0)).unwrap();
    let urls: i64 =
        conn.query_row("SELECT COUNT(*) FROM webhook_urls", [], |row| row.get(0)).unwrap();
    assert_eq!(events, 0);
    assert_eq!(urls, 0);
}
