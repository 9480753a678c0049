// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor sweep: liveness, transition detection, metric
//! collection scheduling.
//!
//! One long-running task. Each tick reads the program list (uncached),
//! takes a single process-table snapshot, classifies transitions per
//! program, and schedules one metric collector per running program. A
//! misbehaving program or store row never aborts the sweep, and a slow
//! collector never blocks the next tick.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use warden_adapters::{names_match, Notification, ProcessAdapter};
use warden_core::{
    Clock, EpochMs, EventKind, Liveness, Program, ProgramId, ProgramStatus, Severity,
};
use warden_store::{Store, StoreError};

use crate::buffer::MetricBuffer;
use crate::notify::Notifier;
use crate::plugin::PluginHost;

/// Supervisor cadence and budgets.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub check_interval: Duration,
    pub sample_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self { check_interval: Duration::from_secs(1), sample_timeout: Duration::from_secs(2) }
    }
}

/// Shared mutation surface for the supervisor task.
///
/// Everything outside the sweep (query surface, coordinator) talks to
/// the supervisor exclusively through this handle: an atomic running
/// flag, the intentional-stop set, and the immediate-check notifier.
#[derive(Clone)]
pub struct SupervisorHandle {
    inner: Arc<HandleState>,
}

struct HandleState {
    running: AtomicBool,
    /// Program names whose next `running → stopped` observation is an
    /// operator stop, not a crash. Entries never time out; a stale entry
    /// only ever downgrades one crash classification.
    intentional_stops: Mutex<HashSet<String>>,
    /// Program names with an operator restart in flight. Sweeps skip
    /// transition handling for these so the stop/start gap never reads
    /// as a termination.
    restarts_in_flight: Mutex<HashSet<String>>,
    immediate: Notify,
    immediate_requests: AtomicU64,
}

impl SupervisorHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HandleState {
                running: AtomicBool::new(true),
                intentional_stops: Mutex::new(HashSet::new()),
                restarts_in_flight: Mutex::new(HashSet::new()),
                immediate: Notify::new(),
                immediate_requests: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Ask the supervisor loop to exit after the current tick.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.immediate.notify_one();
    }

    /// Flag the next observed stop of `name` as operator-initiated.
    /// Called by the query surface before it dispatches the stop.
    pub fn mark_intentional_stop(&self, name: &str) {
        self.inner.intentional_stops.lock().insert(name.to_string());
    }

    pub fn intentional_stop_pending(&self, name: &str) -> bool {
        self.inner.intentional_stops.lock().contains(name)
    }

    /// Drop a pending flag without consuming it as a transition, e.g.
    /// when the program is deleted.
    pub fn forget_intentional_stop(&self, name: &str) {
        self.inner.intentional_stops.lock().remove(name);
    }

    fn consume_intentional_stop(&self, name: &str) -> bool {
        self.inner.intentional_stops.lock().remove(name)
    }

    /// Freeze sweep classification for `name` while a compound
    /// stop-then-start runs. The stop wait can span several sweeps; any
    /// of them observing the gap would otherwise emit a spurious stop.
    pub fn begin_restart(&self, name: &str) {
        self.inner.restarts_in_flight.lock().insert(name.to_string());
    }

    pub fn end_restart(&self, name: &str) {
        self.inner.restarts_in_flight.lock().remove(name);
    }

    pub fn restart_in_flight(&self, name: &str) -> bool {
        self.inner.restarts_in_flight.lock().contains(name)
    }

    /// Skip the remainder of the current wait and sweep again.
    pub fn request_immediate_check(&self) {
        self.inner.immediate_requests.fetch_add(1, Ordering::Relaxed);
        self.inner.immediate.notify_one();
    }

    /// Monotonic count of immediate-check requests, for observability.
    pub fn immediate_requests(&self) -> u64 {
        self.inner.immediate_requests.load(Ordering::Relaxed)
    }

    async fn wait_immediate(&self) {
        self.inner.immediate.notified().await;
    }
}

impl Default for SupervisorHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Plug-in lifecycle hook selector for off-thread dispatch.
#[derive(Debug, Clone, Copy)]
enum Hook {
    Start,
    Stop,
    Crash,
}

/// Last observation for one program.
#[derive(Debug, Clone, Copy, Default)]
struct Observed {
    liveness: Liveness,
    pid: Option<u32>,
    /// When the current run was first observed, for uptime.
    since_ms: Option<EpochMs>,
    cpu_percent: f32,
    memory_mb: f64,
}

/// Dependencies handed to the supervisor by the coordinator.
pub struct SupervisorDeps<C: Clock> {
    pub store: Store,
    pub adapter: Arc<dyn ProcessAdapter>,
    pub notifier: Arc<dyn Notifier>,
    pub buffer: Arc<MetricBuffer<C>>,
    pub plugins: Arc<PluginHost>,
}

/// The supervisor task.
pub struct Supervisor<C: Clock> {
    store: Store,
    adapter: Arc<dyn ProcessAdapter>,
    notifier: Arc<dyn Notifier>,
    buffer: Arc<MetricBuffer<C>>,
    plugins: Arc<PluginHost>,
    clock: C,
    config: SupervisorConfig,
    handle: SupervisorHandle,
    observed: Mutex<HashMap<ProgramId, Observed>>,
    /// Programs with a collector in flight; at most one per program.
    collectors: Mutex<HashSet<ProgramId>>,
}

impl<C: Clock> Supervisor<C> {
    pub fn new(deps: SupervisorDeps<C>, clock: C, config: SupervisorConfig) -> Self {
        Self {
            store: deps.store,
            adapter: deps.adapter,
            notifier: deps.notifier,
            buffer: deps.buffer,
            plugins: deps.plugins,
            clock,
            config,
            handle: SupervisorHandle::new(),
            observed: Mutex::new(HashMap::new()),
            collectors: Mutex::new(HashSet::new()),
        }
    }

    pub fn handle(&self) -> SupervisorHandle {
        self.handle.clone()
    }

    /// Run sweeps until the handle is stopped.
    pub async fn run(self: Arc<Self>) {
        info!(interval_ms = self.config.check_interval.as_millis() as u64, "supervisor started");
        while self.handle.is_running() {
            self.sweep().await;
            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval) => {}
                _ = self.handle.wait_immediate() => {
                    debug!("immediate sweep requested");
                }
            }
        }
        info!("supervisor stopped");
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// One full pass over all registered programs.
    pub async fn sweep(self: &Arc<Self>) {
        // Uncached read: transition detection must see the registry as it
        // is, not as it was.
        let programs = match self.store.list_programs() {
            Ok(programs) => programs,
            Err(e) => {
                warn!(error = %e, "sweep skipped: program list unavailable");
                return;
            }
        };

        // One process-table snapshot per sweep.
        let adapter = Arc::clone(&self.adapter);
        let running = match tokio::task::spawn_blocking(move || adapter.enumerate()).await {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "sweep skipped: process enumeration failed");
                return;
            }
        };

        // Deleted programs leave no ghost observations.
        {
            let live: HashSet<ProgramId> = programs.iter().map(|p| p.id).collect();
            self.observed.lock().retain(|id, _| live.contains(id));
        }

        for program in &programs {
            if let Err(e) = self.sweep_program(program, &running).await {
                warn!(program = program.id, error = %e, "sweep step failed");
            }
        }
    }

    async fn sweep_program(
        self: &Arc<Self>,
        program: &Program,
        running: &HashMap<String, u32>,
    ) -> Result<(), StoreError> {
        let now_ms = self.clock.epoch_ms();

        // An active graceful-shutdown window freezes transition handling:
        // the program presents as shutting_down until the deadline, then
        // the cleared state lets the natural stop path fire.
        if let Some(window) = program.graceful {
            if !window.expired(now_ms) {
                return Ok(());
            }
            self.store.clear_graceful_shutdown(program.id)?;
            self.store.clear_child_pid(program.id)?;
            debug!(program = program.id, "graceful-shutdown deadline expired");
        }

        // A restart in flight likewise freezes classification until the
        // new process is up and the flag is dropped.
        if self.handle.restart_in_flight(&program.name) {
            return Ok(());
        }

        let probe = self.probe(program, running).await;
        let prev =
            self.observed.lock().get(&program.id).copied().unwrap_or_default();

        match (prev.liveness, probe) {
            // Still running; a changed pid is tracked without an event.
            (Liveness::Running, Some(pid)) => {
                if prev.pid != Some(pid) {
                    self.store.set_child_pid(program.id, pid)?;
                    self.observed.lock().insert(
                        program.id,
                        Observed { pid: Some(pid), ..prev },
                    );
                }
                self.spawn_collector(program.id, pid);
            }

            // First sighting or restart after a stop.
            (Liveness::Unknown | Liveness::Stopped, Some(pid)) => {
                self.store.set_child_pid(program.id, pid)?;
                self.observed.lock().insert(
                    program.id,
                    Observed {
                        liveness: Liveness::Running,
                        pid: Some(pid),
                        since_ms: Some(now_ms),
                        ..Observed::default()
                    },
                );
                self.record_event(
                    program,
                    EventKind::Start,
                    "process observed running",
                    Severity::Success,
                );
                self.fire_hook(Hook::Start, program.id, Some(pid));
                self.spawn_collector(program.id, pid);
            }

            // Disappeared: operator stop or crash.
            (Liveness::Running, None) => {
                self.store.clear_child_pid(program.id)?;
                self.observed.lock().insert(
                    program.id,
                    Observed { liveness: Liveness::Stopped, ..Observed::default() },
                );
                if self.handle.consume_intentional_stop(&program.name) {
                    self.record_event(
                        program,
                        EventKind::Stop,
                        "process stopped",
                        Severity::Warning,
                    );
                    self.fire_hook(Hook::Stop, program.id, prev.pid);
                } else {
                    self.record_event(
                        program,
                        EventKind::Crash,
                        "process terminated unexpectedly",
                        Severity::Error,
                    );
                    self.fire_hook(Hook::Crash, program.id, prev.pid);
                }
            }

            // Not running before, not running now.
            (Liveness::Unknown | Liveness::Stopped, None) => {
                self.observed.lock().insert(
                    program.id,
                    Observed { liveness: Liveness::Stopped, ..Observed::default() },
                );
            }
        }

        Ok(())
    }

    /// Liveness from the sweep snapshot, falling back to a pid
    /// double-check through the adapter when the name scan misses.
    async fn probe(&self, program: &Program, running: &HashMap<String, u32>) -> Option<u32> {
        let base = program.base_name();
        if let Some(pid) =
            running.iter().find(|(name, _)| names_match(&base, name)).map(|(_, pid)| *pid)
        {
            return Some(pid);
        }

        let hint = program.child_pid?;
        let adapter = Arc::clone(&self.adapter);
        let path = program.path.clone();
        match tokio::task::spawn_blocking(move || adapter.find(&path, Some(hint))).await {
            Ok(probe) if probe.running => probe.pid,
            Ok(_) => None,
            Err(e) => {
                warn!(program = program.id, error = %e, "pid double-check failed");
                None
            }
        }
    }

    /// Schedule one metric collection for `program_id`; a no-op while a
    /// prior collector is still in flight. The collector times itself
    /// out so the sweep never waits on it.
    fn spawn_collector(self: &Arc<Self>, program_id: ProgramId, pid: u32) {
        if !self.collectors.lock().insert(program_id) {
            return;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let adapter = Arc::clone(&this.adapter);
            let sampled = tokio::time::timeout(
                this.config.sample_timeout,
                tokio::task::spawn_blocking(move || adapter.sample(pid)),
            )
            .await;

            match sampled {
                Ok(Ok((cpu_percent, memory_mb))) => {
                    this.buffer.add(program_id, cpu_percent, memory_mb);
                    if let Some(observed) = this.observed.lock().get_mut(&program_id) {
                        observed.cpu_percent = cpu_percent;
                        observed.memory_mb = memory_mb;
                    }
                }
                Ok(Err(e)) => warn!(program = program_id, error = %e, "collector task died"),
                Err(_) => warn!(program = program_id, "sample timed out"),
            }

            this.collectors.lock().remove(&program_id);
        });
    }

    /// Dispatch a plug-in lifecycle hook on a blocking thread. Hooks may
    /// do network I/O (e.g. the REST hook plug-in) and must never stall
    /// the sweep.
    fn fire_hook(&self, hook: Hook, program_id: ProgramId, pid: Option<u32>) {
        let plugins = Arc::clone(&self.plugins);
        tokio::task::spawn_blocking(move || match hook {
            Hook::Start => {
                if let Some(pid) = pid {
                    plugins.on_program_start(program_id, pid);
                }
            }
            Hook::Stop => plugins.on_program_stop(program_id, pid),
            Hook::Crash => plugins.on_program_crash(program_id, pid),
        });
    }

    fn record_event(&self, program: &Program, kind: EventKind, details: &str, severity: Severity) {
        info!(program = %program.name, kind = %kind, "state transition");
        if let Err(e) = self.store.append_event(program.id, kind, details, self.clock.epoch_ms())
        {
            warn!(program = program.id, kind = %kind, error = %e, "event append failed");
        }
        if !program.webhook_urls.is_empty() {
            let note = Notification {
                program_name: program.name.clone(),
                kind,
                details: details.to_string(),
                severity,
            };
            self.notifier.dispatch(&note, &program.webhook_urls);
        }
    }

    /// Presented status for one program, graceful countdown included.
    pub fn status_of(&self, program: &Program) -> ProgramStatus {
        let now_ms = self.clock.epoch_ms();

        if let Some(window) = program.graceful {
            if !window.expired(now_ms) {
                let observed =
                    self.observed.lock().get(&program.id).copied().unwrap_or_default();
                return ProgramStatus {
                    program_id: program.id,
                    name: program.name.clone(),
                    running: true,
                    pid: program.child_pid,
                    cpu_percent: observed.cpu_percent,
                    memory_mb: observed.memory_mb,
                    uptime_secs: uptime_secs(observed.since_ms, now_ms),
                    shutdown_remaining_secs: Some(window.remaining_secs(now_ms)),
                };
            }
        }

        let observed = self.observed.lock().get(&program.id).copied().unwrap_or_default();
        match observed.liveness {
            Liveness::Running => ProgramStatus {
                program_id: program.id,
                name: program.name.clone(),
                running: true,
                pid: observed.pid,
                cpu_percent: observed.cpu_percent,
                memory_mb: observed.memory_mb,
                uptime_secs: uptime_secs(observed.since_ms, now_ms),
                shutdown_remaining_secs: None,
            },
            Liveness::Unknown | Liveness::Stopped => {
                ProgramStatus::stopped(program.id, program.name.clone())
            }
        }
    }

    pub fn statuses(&self, programs: &[Program]) -> Vec<ProgramStatus> {
        programs.iter().map(|program| self.status_of(program)).collect()
    }
}

fn uptime_secs(since_ms: Option<EpochMs>, now_ms: EpochMs) -> Option<u64> {
    since_ms.map(|since| ((now_ms - since).max(0) / 1000) as u64)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
