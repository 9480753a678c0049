// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_core::{Program, ProgramEvent, ProgramId, ProgramStatus, ResourceSample};
use warden_engine::{ActionResult, PluginDescriptor, PressureLevel};
use warden_store::PluginBinding;

/// User-visible error classification, the wire form of the store/query
/// error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Busy,
    Internal,
}

/// Wire view of a persisted plug-in binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginBindingView {
    pub id: i64,
    pub program_id: ProgramId,
    pub plugin_id: String,
    pub config: Value,
    pub enabled: bool,
}

impl From<PluginBinding> for PluginBindingView {
    fn from(binding: PluginBinding) -> Self {
        Self {
            id: binding.id,
            program_id: binding.program_id,
            plugin_id: binding.plugin_id,
            config: binding.config,
            enabled: binding.enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CacheStatsView {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub invalidations: u64,
    pub size: usize,
    pub tag_count: usize,
    pub hit_rate: f64,
}

impl From<warden_engine::CacheStats> for CacheStatsView {
    fn from(stats: warden_engine::CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            sets: stats.sets,
            deletes: stats.deletes,
            invalidations: stats.invalidations,
            size: stats.size,
            tag_count: stats.tag_count,
            hit_rate: stats.hit_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PoolStatsView {
    pub acquires: u64,
    pub releases: u64,
    pub max_wait_ms: u64,
    pub in_use: u32,
    pub idle: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MemoryReport {
    pub level: PressureLevel,
    pub used_pct: f32,
    pub total_mb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveReport {
    pub samples_purged: usize,
    pub events_purged: usize,
    pub db_bytes_before: u64,
    pub db_bytes_after: u64,
    pub backup_path: Option<String>,
}

/// Response from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong { version: String, uptime_secs: u64 },
    Ok,
    Error { kind: ErrorKind, message: String },

    Programs { programs: Vec<Program> },
    Program { program: Program },

    Started { id: ProgramId, pid: Option<u32> },
    Stopped {
        id: ProgramId,
        /// True when a plug-in accepted a polite shutdown and a deadline
        /// was recorded instead of a forced kill.
        graceful: bool,
        shutdown_remaining_secs: Option<i64>,
    },
    Restarted { id: ProgramId, pid: Option<u32> },

    Statuses {
        statuses: Vec<ProgramStatus>,
        pressure: PressureLevel,
        /// True when served from the short-TTL status cache.
        cached: bool,
    },
    Samples { samples: Vec<ResourceSample> },
    Events { events: Vec<ProgramEvent> },

    WebhookTested { ok: bool, message: String },

    PluginCatalog { plugins: Vec<PluginDescriptor> },
    PluginBindings { bindings: Vec<PluginBindingView> },
    PluginBound { binding: PluginBindingView },
    PluginResult { result: ActionResult },

    CacheStats { stats: CacheStatsView },
    CacheCleared { removed: usize },
    PoolStats { stats: PoolStatsView },
    Memory { report: MemoryReport },
    Security { locked_accounts: Vec<String> },
    Archived { report: ArchiveReport },

    ShuttingDown,
}

impl Response {
    pub fn validation(message: impl Into<String>) -> Self {
        Response::Error { kind: ErrorKind::Validation, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Response::Error { kind: ErrorKind::NotFound, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Response::Error { kind: ErrorKind::Internal, message: message.into() }
    }

    /// Map a store failure onto the wire taxonomy.
    pub fn from_store_error(e: warden_store::StoreError) -> Self {
        use warden_store::StoreError;
        let kind = match &e {
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Busy => ErrorKind::Busy,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Fatal(_) => ErrorKind::Internal,
        };
        Response::Error { kind, message: e.to_string() }
    }
}
