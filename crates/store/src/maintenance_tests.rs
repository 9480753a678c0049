// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use warden_core::{EventKind, ProgramDraft, ResourceSample, RetentionPolicy};

use crate::test_store;

const DAY_MS: i64 = 86_400_000;

fn seeded() -> (crate::Store, tempfile::TempDir, i64) {
    let (store, dir) = test_store();
    let program = store
        .create_program(
            &ProgramDraft { name: "p".into(), path: PathBuf::from("/bin/p"), ..Default::default() },
            0,
        )
        .unwrap();
    (store, dir, program.id)
}

#[test]
fn event_purge_respects_retention() {
    let (store, _dir, id) = seeded();
    let now = 200 * DAY_MS;
    store.append_event(id, EventKind::Start, "", now - 100 * DAY_MS).unwrap();
    store.append_event(id, EventKind::Stop, "", now - 10 * DAY_MS).unwrap();

    let purged = store.purge_events_older_than(90, now).unwrap();
    assert_eq!(purged, 1);
    assert_eq!(store.list_events(id, 10).unwrap().len(), 1);
}

#[test]
fn archive_purges_both_tables_and_reports() {
    let (store, _dir, id) = seeded();
    let now = 200 * DAY_MS;
    store.append_event(id, EventKind::Start, "", now - 100 * DAY_MS).unwrap();
    store
        .insert_samples_batch(&[ResourceSample {
            program_id: id,
            cpu_percent: 1.0,
            memory_mb: 1.0,
            ts_ms: now - 40 * DAY_MS,
        }])
        .unwrap();

    let summary = store.archive(RetentionPolicy::default(), now).unwrap();
    assert_eq!(summary.samples_purged, 1);
    assert_eq!(summary.events_purged, 1);
    assert!(summary.db_bytes_after > 0);
}

#[test]
fn table_bytes_rejects_unknown_table() {
    let (store, _dir) = test_store();
    let err = store.table_bytes("sqlite_master").unwrap_err();
    assert!(matches!(err, crate::StoreError::NotFound(_)));
}

#[test]
fn db_bytes_is_positive() {
    let (store, _dir) = test_store();
    assert!(store.db_bytes().unwrap() > 0);
}

#[test]
fn vacuum_runs() {
    let (store, _dir) = test_store();
    store.vacuum_and_analyze().unwrap();
}
