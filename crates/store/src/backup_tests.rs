// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;

use flate2::read::GzDecoder;

use crate::test_store;

#[test]
fn backup_writes_gzip_db_copy() {
    let (store, dir) = test_store();
    let dest = dir.path().join("backups");

    let report = store.backup_to(&dest, &[]).unwrap();
    assert!(report.db_backup.exists());
    assert!(report
        .db_backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with(".db.gz"));

    // The decompressed copy starts with the SQLite magic.
    let mut decoder = GzDecoder::new(std::fs::File::open(&report.db_backup).unwrap());
    let mut magic = [0u8; 16];
    decoder.read_exact(&mut magic).unwrap();
    assert_eq!(&magic[..15], b"SQLite format 3");
}

#[test]
fn backup_includes_existing_aux_files() {
    let (store, dir) = test_store();
    let aux = dir.path().join("webhook_threads.json");
    std::fs::write(&aux, "{}").unwrap();
    let missing = dir.path().join("nope.json");

    let report =
        store.backup_to(&dir.path().join("backups"), &[aux.as_path(), missing.as_path()]).unwrap();
    assert_eq!(report.aux_backups.len(), 1);
    assert!(report.aux_backups[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .contains("webhook_threads.json"));
}
