// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plug-in binding persistence

use rusqlite::{params, OptionalExtension};

use warden_core::{EpochMs, ProgramId};

use crate::{Store, StoreError};

/// Persisted association of a plug-in with a program.
///
/// The config document is an opaque JSON blob validated by the plug-in
/// itself against its published schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginBinding {
    pub id: i64,
    pub program_id: ProgramId,
    pub plugin_id: String,
    pub config: serde_json::Value,
    pub enabled: bool,
}

impl Store {
    /// Insert or update the binding for `(program_id, plugin_id)`.
    pub fn upsert_plugin_binding(
        &self,
        program_id: ProgramId,
        plugin_id: &str,
        config: &serde_json::Value,
        enabled: bool,
        now_ms: EpochMs,
    ) -> Result<PluginBinding, StoreError> {
        let config_json = config.to_string();
        self.with_conn_retry(|conn| {
            conn.execute(
                "INSERT INTO plugin_configs
                     (program_id, plugin_id, config_json, enabled, created_at_ms, updated_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(program_id, plugin_id) DO UPDATE SET
                     config_json = excluded.config_json,
                     enabled = excluded.enabled,
                     updated_at_ms = excluded.updated_at_ms",
                params![program_id, plugin_id, config_json, enabled, now_ms],
            )?;
            let id: i64 = conn.query_row(
                "SELECT id FROM plugin_configs WHERE program_id = ?1 AND plugin_id = ?2",
                params![program_id, plugin_id],
                |row| row.get(0),
            )?;
            Ok(PluginBinding {
                id,
                program_id,
                plugin_id: plugin_id.to_string(),
                config: config.clone(),
                enabled,
            })
        })
    }

    /// Bindings for one program, or every binding when `program_id` is None
    /// (boot-time rehydration).
    pub fn list_plugin_bindings(
        &self,
        program_id: Option<ProgramId>,
    ) -> Result<Vec<PluginBinding>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, program_id, plugin_id, config_json, enabled
                 FROM plugin_configs
                 WHERE ?1 IS NULL OR program_id = ?1
                 ORDER BY id",
            )?;
            let bindings = stmt
                .query_map([program_id], |row| {
                    let raw: String = row.get(3)?;
                    Ok(PluginBinding {
                        id: row.get(0)?,
                        program_id: row.get(1)?,
                        plugin_id: row.get(2)?,
                        config: serde_json::from_str(&raw)
                            .unwrap_or(serde_json::Value::Object(Default::default())),
                        enabled: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(bindings)
        })
    }

    pub fn get_plugin_binding(
        &self,
        program_id: ProgramId,
        plugin_id: &str,
    ) -> Result<Option<PluginBinding>, StoreError> {
        self.with_conn(|conn| {
            let binding = conn
                .query_row(
                    "SELECT id, program_id, plugin_id, config_json, enabled
                     FROM plugin_configs
                     WHERE program_id = ?1 AND plugin_id = ?2",
                    params![program_id, plugin_id],
                    |row| {
                        let raw: String = row.get(3)?;
                        Ok(PluginBinding {
                            id: row.get(0)?,
                            program_id: row.get(1)?,
                            plugin_id: row.get(2)?,
                            config: serde_json::from_str(&raw)
                                .unwrap_or(serde_json::Value::Object(Default::default())),
                            enabled: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(binding)
        })
    }

    pub fn delete_plugin_binding(
        &self,
        program_id: ProgramId,
        plugin_id: &str,
    ) -> Result<bool, StoreError> {
        self.with_conn_retry(|conn| {
            let changed = conn.execute(
                "DELETE FROM plugin_configs WHERE program_id = ?1 AND plugin_id = ?2",
                params![program_id, plugin_id],
            )?;
            Ok(changed > 0)
        })
    }
}

#[cfg(test)]
#[path = "plugins_tests.rs"]
mod tests;
