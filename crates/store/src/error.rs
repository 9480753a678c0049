// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy

use thiserror::Error;

/// Errors surfaced by store operations.
///
/// `Conflict` and `Busy` are recoverable by the caller (reject the request
/// or retry with back-off); `Fatal` marks the store unhealthy for this
/// request but never takes down the supervisor.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint or foreign-key violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transient locking; retry with back-off.
    #[error("database busy")]
    Busy,

    /// Row addressed by id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Schema, connectivity or pool fault.
    #[error("store fault: {0}")]
    Fatal(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match &e {
            rusqlite::Error::SqliteFailure(f, msg) => match f.code {
                ErrorCode::ConstraintViolation => {
                    StoreError::Conflict(msg.clone().unwrap_or_else(|| f.to_string()))
                }
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => StoreError::Busy,
                _ => StoreError::Fatal(e.to_string()),
            },
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound("no rows".to_string()),
            _ => StoreError::Fatal(e.to_string()),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        // Pool exhaustion past the acquire deadline is a fault, not a retry.
        StoreError::Fatal(format!("connection pool: {e}"))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
