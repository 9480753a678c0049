// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rusqlite::ffi;

fn sqlite_failure(code: ffi::ErrorCode, extended: std::os::raw::c_int) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        ffi::Error { code, extended_code: extended },
        Some("detail".to_string()),
    )
}

#[test]
fn constraint_maps_to_conflict() {
    let err: StoreError =
        sqlite_failure(ffi::ErrorCode::ConstraintViolation, ffi::SQLITE_CONSTRAINT_UNIQUE).into();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[test]
fn busy_maps_to_busy() {
    let err: StoreError = sqlite_failure(ffi::ErrorCode::DatabaseBusy, ffi::SQLITE_BUSY).into();
    assert!(matches!(err, StoreError::Busy));
}

#[test]
fn no_rows_maps_to_not_found() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn other_sqlite_errors_are_fatal() {
    let err: StoreError = sqlite_failure(ffi::ErrorCode::NotADatabase, ffi::SQLITE_NOTADB).into();
    assert!(matches!(err, StoreError::Fatal(_)));
}
