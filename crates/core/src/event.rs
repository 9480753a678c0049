// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Program event history and notification severity

use serde::{Deserialize, Serialize};

use crate::{EpochMs, ProgramId};

/// Kind of a program lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Stop,
    Restart,
    Crash,
    /// Webhook connectivity test, never persisted to history.
    Test,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Restart => "restart",
            EventKind::Crash => "crash",
            EventKind::Test => "test",
            EventKind::Other => "other",
        }
    }

    /// Parse a persisted kind. Unknown strings map to `Other` so history
    /// rows written by a newer daemon still load.
    pub fn parse(s: &str) -> Self {
        match s {
            "start" => EventKind::Start,
            "stop" => EventKind::Stop,
            "restart" => EventKind::Restart,
            "crash" => EventKind::Crash,
            "test" => EventKind::Test,
            _ => EventKind::Other,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification severity. `stop` notifies at `Warning` while `crash`
/// notifies at `Error`; both are part of the outbound contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only history entry for one program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramEvent {
    pub id: i64,
    pub program_id: ProgramId,
    pub kind: EventKind,
    pub details: String,
    pub ts_ms: EpochMs,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
