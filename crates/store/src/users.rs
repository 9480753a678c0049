// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User rows. Authentication itself lives in the external transport
//! layer; the store only owns the table and the first-boot seed.

use rusqlite::params;

use warden_core::EpochMs;

use crate::{Store, StoreError};

impl Store {
    /// Seed the default admin account if no user exists yet. The hash is
    /// produced by the external auth layer; the store treats it as opaque.
    pub fn seed_default_admin(
        &self,
        username: &str,
        password_hash: &str,
        now_ms: EpochMs,
    ) -> Result<bool, StoreError> {
        self.with_conn_retry(|conn| {
            let existing: i64 =
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO users (username, password_hash, role, created_at_ms)
                 VALUES (?1, ?2, 'admin', ?3)",
                params![username, password_hash, now_ms],
            )?;
            Ok(true)
        })
    }

    pub fn count_users(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }
}

#[cfg(test)]
#[path = "users_tests.rs"]
mod tests;
