// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision engine: the supervisor sweep and its supporting fabric.
//!
//! Long-lived components (supervisor, metric buffer, memory controller)
//! run as tokio tasks constructed once by the daemon's coordinator; the
//! cache and plug-in host are shared state handed to consumers. Nothing
//! here is a global.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod buffer;
mod cache;
mod memory;
mod notify;
pub mod plugin;
mod supervisor;

pub use buffer::{MetricBuffer, DEFAULT_CAPACITY, DEFAULT_FLUSH_INTERVAL};
pub use cache::{Cache, CacheStats, DEFAULT_TTL};
pub use memory::{MemoryController, PressureLevel};
pub use notify::Notifier;
pub use plugin::{
    ActionDescriptor, ActionResult, ConfigField, FieldKind, ParamField, Plugin, PluginDescriptor,
    PluginError, PluginHost, PluginRegistry, GRACEFUL_SHUTDOWN_SECS,
};
pub use supervisor::{Supervisor, SupervisorConfig, SupervisorDeps, SupervisorHandle};

#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifier, NotifyCall};
