// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data retention policy

use serde::{Deserialize, Serialize};

/// How long samples and events are kept before archiving purges them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub metric_days: u32,
    pub event_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { metric_days: 30, event_days: 90 }
    }
}
