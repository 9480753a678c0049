// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gzip-compressed backups of the database and auxiliary files

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{Store, StoreError};

/// Paths written by one backup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub db_backup: PathBuf,
    pub aux_backups: Vec<PathBuf>,
}

impl Store {
    /// Write gzip-compressed copies of the database file and any auxiliary
    /// files (e.g. the webhook thread-binding JSON) into `dest_dir`,
    /// named with an ISO-like timestamp.
    ///
    /// The WAL is checkpointed first so the copied file is complete.
    pub fn backup_to(&self, dest_dir: &Path, aux: &[&Path]) -> Result<BackupReport, StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
            Ok(())
        })?;

        std::fs::create_dir_all(dest_dir)
            .map_err(|e| StoreError::Fatal(format!("backup dir: {e}")))?;

        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let db_backup = dest_dir.join(format!("warden_backup_{stamp}.db.gz"));
        gzip_copy(self.db_path(), &db_backup)
            .map_err(|e| StoreError::Fatal(format!("backup {}: {e}", self.db_path().display())))?;

        let mut aux_backups = Vec::new();
        for path in aux {
            if !path.exists() {
                continue;
            }
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            let Some(name) = name else { continue };
            let dest = dest_dir.join(format!("warden_backup_{stamp}.{name}.gz"));
            gzip_copy(path, &dest)
                .map_err(|e| StoreError::Fatal(format!("backup {}: {e}", path.display())))?;
            aux_backups.push(dest);
        }

        tracing::info!(db = %db_backup.display(), aux = aux_backups.len(), "backup written");
        Ok(BackupReport { db_backup, aux_backups })
    }
}

fn gzip_copy(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(src)?);
    let writer = BufWriter::new(File::create(dest)?);
    let mut encoder = GzEncoder::new(writer, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
