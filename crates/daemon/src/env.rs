// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Daemon version, written to logs at startup.
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve data directory: WARDEN_DATA_DIR > XDG data dir > ~/.local/share/warden
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WARDEN_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|base| base.join("warden"))
        .unwrap_or_else(|| PathBuf::from(".warden"))
}

/// `WARDEN_ENV`: development unless explicitly "production".
pub fn environment() -> crate::Environment {
    match std::env::var("WARDEN_ENV").as_deref() {
        Ok("production") => crate::Environment::Production,
        _ => crate::Environment::Development,
    }
}

/// Supervisor cadence (default 1 s).
pub fn check_interval() -> Duration {
    duration_ms("WARDEN_CHECK_INTERVAL_MS", 1000)
}

/// Store pool size (default 5).
pub fn pool_size() -> u32 {
    parsed("WARDEN_POOL_SIZE").unwrap_or(5)
}

/// Metric buffer flush interval (default 10 s).
pub fn flush_interval() -> Duration {
    duration_ms("WARDEN_FLUSH_INTERVAL_MS", 10_000)
}

/// Metric buffer capacity (default 1000).
pub fn buffer_capacity() -> usize {
    parsed("WARDEN_BUFFER_CAPACITY").unwrap_or(1000)
}

/// Cache default TTL (default 300 s).
pub fn cache_ttl() -> Duration {
    parsed("WARDEN_CACHE_TTL_SECS").map(Duration::from_secs).unwrap_or(Duration::from_secs(300))
}

/// Sample retention (default 30 days).
pub fn metric_retention_days() -> u32 {
    parsed("WARDEN_METRIC_RETENTION_DAYS").unwrap_or(30)
}

/// Event retention (default 90 days).
pub fn event_retention_days() -> u32 {
    parsed("WARDEN_EVENT_RETENTION_DAYS").unwrap_or(90)
}

/// Shutdown drain timeout (default 5 s).
pub fn drain_timeout() -> Duration {
    duration_ms("WARDEN_DRAIN_TIMEOUT_MS", 5000)
}

/// Bind address hint for the external HTTP transport. Not consumed by
/// the core; recorded so operators see one source of truth.
pub fn bind_host() -> String {
    std::env::var("WARDEN_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

pub fn bind_port() -> u16 {
    parsed("WARDEN_PORT").unwrap_or(8150)
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok())
}

fn duration_ms(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(parsed(key).unwrap_or(default_ms))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
