// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource usage samples

use serde::{Deserialize, Serialize};

use crate::{EpochMs, ProgramId};

/// One `(cpu%, rss_mb)` observation for one program.
///
/// Produced by the supervisor's metric collectors, buffered, and flushed
/// to the store in batches. Per-program timestamps are non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceSample {
    pub program_id: ProgramId,
    pub cpu_percent: f32,
    pub memory_mb: f64,
    pub ts_ms: EpochMs,
}
