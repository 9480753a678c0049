// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: construct every component once, in dependency order.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use warden_adapters::{SysinfoAdapter, ThreadBindings, WebhookNotifier};
use warden_core::{Clock, SystemClock};
use warden_engine::{
    Cache, MemoryController, MetricBuffer, PluginHost, PluginRegistry, Supervisor,
    SupervisorConfig, SupervisorDeps,
};
use warden_store::Store;

use crate::listener::ListenCtx;

use super::{Config, DaemonState, LifecycleError};

/// Start every component in dependency order and bind the socket last.
/// Returns the daemon state plus the listener for the caller to spawn.
pub async fn startup(config: &Config) -> Result<(DaemonState, UnixListener), LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Lock failure means another daemon owns these files.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<(DaemonState, UnixListener), LifecycleError> {
    let clock = SystemClock;

    // 1. Data directory and exclusive pid-file lock, before anything
    //    else can race.
    std::fs::create_dir_all(&config.data_dir)?;
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 2. Store: open, migrate, seed. Credentials belong to the external
    //    auth layer; the seed row only anchors the schema.
    let store = Store::open(&config.db_path, config.pool_size)?;
    if store.seed_default_admin("admin", "", clock.epoch_ms())? {
        info!("seeded default admin row (credentials managed by the transport layer)");
    }

    // 3. Shared cache and webhook notifier.
    let cache = Arc::new(Cache::new(clock, config.cache_ttl));
    let threads = Arc::new(ThreadBindings::new(config.threads_path.clone()));
    let notifier = WebhookNotifier::new(threads)?;

    // 4. Metric buffer flusher.
    let buffer = Arc::new(MetricBuffer::new(store.clone(), clock, config.buffer_capacity));
    let flusher_cancel = CancellationToken::new();
    let flusher_task =
        Arc::clone(&buffer).spawn_flusher(config.flush_interval, flusher_cancel.clone());

    // 5. Memory controller.
    let adapter: Arc<dyn warden_adapters::ProcessAdapter> = Arc::new(SysinfoAdapter::new());
    let memory =
        Arc::new(MemoryController::new(Arc::clone(&cache), Arc::clone(&adapter), clock));
    let memory_cancel = CancellationToken::new();
    let memory_task = Arc::clone(&memory).spawn(memory_cancel.clone());

    // 6. Plug-in host: rehydrate enabled bindings.
    let plugins = Arc::new(PluginHost::new(PluginRegistry::built_ins(), store.clone()));
    plugins.rehydrate();

    // 7. Supervisor.
    let supervisor = Arc::new(Supervisor::new(
        SupervisorDeps {
            store: store.clone(),
            adapter: Arc::clone(&adapter),
            notifier: Arc::new(notifier.clone()),
            buffer: Arc::clone(&buffer),
            plugins: Arc::clone(&plugins),
        },
        clock,
        SupervisorConfig {
            check_interval: config.check_interval,
            ..SupervisorConfig::default()
        },
    ));
    let supervisor_task = Arc::clone(&supervisor).spawn();

    // 8. Socket, last: only a fully-started daemon accepts requests.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(ListenCtx {
        store: store.clone(),
        cache: Arc::clone(&cache),
        supervisor: Arc::clone(&supervisor),
        handle: supervisor.handle(),
        adapter,
        notifier,
        plugins: Arc::clone(&plugins),
        memory: Arc::clone(&memory),
        retention: config.retention,
        backups_path: config.backups_path.clone(),
        threads_path: config.threads_path.clone(),
        clock,
        shutdown: shutdown.clone(),
        start_time: Instant::now(),
    });

    info!(
        data_dir = %config.data_dir.display(),
        socket = %config.socket_path.display(),
        environment = ?config.environment,
        bind = format!("{}:{}", config.bind_host, config.bind_port),
        "daemon started"
    );

    Ok((
        DaemonState {
            config: config.clone(),
            lock_file,
            store,
            cache,
            buffer,
            memory,
            plugins,
            supervisor,
            ctx,
            start_time: Instant::now(),
            shutdown,
            flusher_task,
            memory_task,
            supervisor_task,
            flusher_cancel,
            memory_cancel,
        },
        listener,
    ))
}

/// Clean up files created by a failed startup.
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.socket_path) {
            warn!("socket cleanup failed: {e}");
        }
    }
    if config.lock_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.lock_path) {
            warn!("pid file cleanup failed: {e}");
        }
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
