// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observed liveness and the status record exposed to operators

use serde::{Deserialize, Serialize};

use crate::ProgramId;

/// Last-observed liveness of a program, tri-state.
///
/// `Unknown` means the supervisor has not completed a sweep for this
/// program yet; the first observation never emits a transition event
/// except `Unknown → Running`, which is a `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    #[default]
    Unknown,
    Running,
    Stopped,
}

impl Liveness {
    pub fn is_running(&self) -> bool {
        matches!(self, Liveness::Running)
    }
}

/// Point-in-time status of one program as presented to operators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramStatus {
    pub program_id: ProgramId,
    pub name: String,
    pub running: bool,
    pub pid: Option<u32>,
    pub cpu_percent: f32,
    pub memory_mb: f64,
    /// Seconds since the supervisor first observed the current run.
    pub uptime_secs: Option<u64>,
    /// Present while a graceful-shutdown deadline is active. The status
    /// cache is bypassed while any program carries this field so the
    /// countdown stays live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_remaining_secs: Option<i64>,
}

impl ProgramStatus {
    /// Status for a program with no live observation yet.
    pub fn stopped(program_id: ProgramId, name: impl Into<String>) -> Self {
        Self {
            program_id,
            name: name.into(),
            running: false,
            pid: None,
            cpu_percent: 0.0,
            memory_mb: 0.0,
            uptime_secs: None,
            shutdown_remaining_secs: None,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_remaining_secs.is_some()
    }
}
