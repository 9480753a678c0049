// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, signal handling.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use warden_core::{RetentionPolicy, SystemClock};
use warden_engine::{Cache, MemoryController, MetricBuffer, PluginHost, Supervisor};
use warden_store::Store;

use crate::listener::{ListenCtx, Listener};

/// Deployment environment, gating debug conveniences in the external
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Daemon configuration, resolved from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory (database, thread bindings, backups, logs).
    pub data_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub db_path: PathBuf,
    pub threads_path: PathBuf,
    pub backups_path: PathBuf,
    pub environment: Environment,
    pub check_interval: Duration,
    pub pool_size: u32,
    pub flush_interval: Duration,
    pub buffer_capacity: usize,
    pub cache_ttl: Duration,
    pub retention: RetentionPolicy,
    pub drain_timeout: Duration,
    /// Bind hints recorded for the external HTTP transport.
    pub bind_host: String,
    pub bind_port: u16,
}

impl Config {
    /// Resolve configuration from `WARDEN_*` environment variables.
    pub fn load() -> Self {
        let data_dir = crate::env::data_dir();
        Self {
            socket_path: data_dir.join("warden.sock"),
            lock_path: data_dir.join("warden.pid"),
            log_path: data_dir.join("warden.log"),
            db_path: data_dir.join("warden.db"),
            threads_path: data_dir.join("webhook_threads.json"),
            backups_path: data_dir.join("backups"),
            environment: crate::env::environment(),
            check_interval: crate::env::check_interval(),
            pool_size: crate::env::pool_size(),
            flush_interval: crate::env::flush_interval(),
            buffer_capacity: crate::env::buffer_capacity(),
            cache_ttl: crate::env::cache_ttl(),
            retention: RetentionPolicy {
                metric_days: crate::env::metric_retention_days(),
                event_days: crate::env::event_retention_days(),
            },
            drain_timeout: crate::env::drain_timeout(),
            bind_host: crate::env::bind_host(),
            bind_port: crate::env::bind_port(),
            data_dir,
        }
    }
}

/// Running daemon: every long-lived component plus its task handle, in
/// startup order so shutdown can run the exact reverse.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive pid-file lock;
    // released on drop.
    #[allow(dead_code)]
    lock_file: File,
    pub store: Store,
    pub cache: Arc<Cache<SystemClock>>,
    pub buffer: Arc<MetricBuffer<SystemClock>>,
    pub memory: Arc<MemoryController<SystemClock>>,
    pub plugins: Arc<PluginHost>,
    pub supervisor: Arc<Supervisor<SystemClock>>,
    pub ctx: Arc<ListenCtx<SystemClock>>,
    pub start_time: Instant,
    /// Cancelled by Shutdown requests and OS signals.
    pub shutdown: CancellationToken,
    flusher_task: JoinHandle<()>,
    memory_task: JoinHandle<()>,
    supervisor_task: JoinHandle<()>,
    flusher_cancel: CancellationToken,
    memory_cancel: CancellationToken,
}

impl DaemonState {
    /// Tear down in reverse startup order, joining each task with a
    /// bounded timeout. Remaining in-flight work is logged, never
    /// awaited indefinitely.
    pub async fn shutdown(self) {
        info!("shutting down daemon");
        let drain = self.config.drain_timeout;

        // 1. Supervisor stops sweeping.
        self.supervisor.handle().stop();
        join_bounded(self.supervisor_task, drain, "supervisor").await;

        // 2. Metric buffer: final flush happens inside the flusher exit
        //    path, before the store closes.
        self.flusher_cancel.cancel();
        join_bounded(self.flusher_task, drain, "metric buffer flusher").await;

        // 3. Memory controller.
        self.memory_cancel.cancel();
        join_bounded(self.memory_task, drain, "memory controller").await;

        // 4. Socket and pid files. The store pool closes on drop.
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("socket file not removed: {e}");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("pid file not removed: {e}");
            }
        }

        info!("daemon shutdown complete");
    }
}

async fn join_bounded(task: JoinHandle<()>, timeout: Duration, name: &str) {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{name} task ended abnormally: {e}"),
        Err(_) => warn!("{name} still running after {} ms drain", timeout.as_millis()),
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] warden_store::StoreError),

    #[error("notifier error: {0}")]
    Notifier(#[from] warden_adapters::NotifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Full daemon run: startup, serve until a shutdown signal, tear down.
pub async fn run(config: Config) -> Result<(), LifecycleError> {
    let (state, listener) = startup(&config).await?;
    let shutdown = state.shutdown.clone();

    let listener_task = tokio::spawn(Listener::new(listener, Arc::clone(&state.ctx)).run());

    wait_for_shutdown(&shutdown).await;

    // The listener exits on the same token; give it a moment.
    join_bounded(listener_task, config.drain_timeout, "listener").await;
    state.shutdown().await;
    Ok(())
}

/// Block until SIGINT, SIGTERM, or an in-band Shutdown request.
async fn wait_for_shutdown(shutdown: &CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
                shutdown.cancelled().await;
                return;
            }
        };
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT received");
                shutdown.cancel();
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received");
                shutdown.cancel();
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => { shutdown.cancel(); }
        }
    }
}
