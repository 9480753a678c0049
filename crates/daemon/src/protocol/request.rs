// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use serde_json::Value;

use warden_core::{ProgramDraft, ProgramId};

/// Request from a socket client to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    // Program registry
    ProgramList,
    ProgramGet { id: ProgramId },
    ProgramCreate { draft: ProgramDraft },
    ProgramUpdate { id: ProgramId, draft: ProgramDraft },
    ProgramDelete { id: ProgramId },

    // Lifecycle commands
    ProgramStart { id: ProgramId },
    ProgramStop {
        id: ProgramId,
        #[serde(default)]
        force: bool,
    },
    ProgramRestart { id: ProgramId },

    // Observations
    StatusPoll,
    SampleRead { program_id: ProgramId, hours: u32 },
    EventRead { program_id: ProgramId, limit: u32 },

    /// Post a canonical payload to a webhook URL and report the outcome.
    WebhookTest { url: String },

    // Plug-ins
    PluginCatalog,
    PluginBindings { program_id: ProgramId },
    PluginBind {
        program_id: ProgramId,
        plugin_id: String,
        config: Value,
        #[serde(default = "default_true")]
        enabled: bool,
    },
    PluginUnbind { program_id: ProgramId, plugin_id: String },
    PluginInvoke {
        program_id: ProgramId,
        plugin_id: String,
        action: String,
        #[serde(default)]
        params: Value,
    },

    // Admin
    CacheStats,
    CacheClear,
    CacheResetStats,
    PoolStats,
    MemoryPressure,
    SecurityStatus,
    /// Retention purge + vacuum + gzip backup.
    Archive,

    /// Request daemon shutdown
    Shutdown,
}

fn default_true() -> bool {
    true
}
