// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin handlers: cache, pool, memory, security, archiving.

use std::sync::Arc;

use warden_core::Clock;

use crate::protocol::{ArchiveReport, MemoryReport, PoolStatsView, Response};

use super::ListenCtx;

pub(super) fn cache_stats<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    Response::CacheStats { stats: ctx.cache.stats().into() }
}

pub(super) fn cache_clear<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    Response::CacheCleared { removed: ctx.cache.clear() }
}

pub(super) fn cache_reset_stats<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    ctx.cache.reset_stats();
    Response::Ok
}

pub(super) fn pool_stats<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    let stats = ctx.store.pool_stats();
    Response::PoolStats {
        stats: PoolStatsView {
            acquires: stats.acquires,
            releases: stats.releases,
            max_wait_ms: stats.max_wait_ms,
            in_use: stats.in_use,
            idle: stats.idle,
        },
    }
}

pub(super) fn memory_pressure<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    let host = ctx.adapter.host_memory();
    Response::Memory {
        report: MemoryReport {
            level: ctx.memory.level(),
            used_pct: host.used_pct,
            total_mb: host.total_mb,
        },
    }
}

/// Account lockout bookkeeping lives in the external transport layer;
/// the core reports an empty set so the admin surface stays stable.
pub(super) fn security_status<C: Clock>(_ctx: &Arc<ListenCtx<C>>) -> Response {
    Response::Security { locked_accounts: Vec::new() }
}

pub(super) async fn archive<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    let store = ctx.store.clone();
    let retention = ctx.retention;
    let now_ms = ctx.clock.epoch_ms();
    let backups_path = ctx.backups_path.clone();
    let threads_path = ctx.threads_path.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let summary = store.archive(retention, now_ms)?;
        let backup = store.backup_to(&backups_path, &[threads_path.as_path()])?;
        Ok::<_, warden_store::StoreError>((summary, backup))
    })
    .await;

    match outcome {
        Ok(Ok((summary, backup))) => Response::Archived {
            report: ArchiveReport {
                samples_purged: summary.samples_purged,
                events_purged: summary.events_purged,
                db_bytes_before: summary.db_bytes_before,
                db_bytes_after: summary.db_bytes_after,
                backup_path: Some(backup.db_backup.display().to_string()),
            },
        },
        Ok(Err(e)) => Response::from_store_error(e),
        Err(e) => Response::internal(format!("archive task: {e}")),
    }
}
