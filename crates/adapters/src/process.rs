// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host process-table adapter.
//!
//! All OS-level failure modes (process gone, permission denied, zombie)
//! map to benign return values with a logged warning; the supervisor
//! sweep is never interrupted by a single hostile process.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

use warden_core::base_name;

/// Result of a liveness probe for one program path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessProbe {
    pub running: bool,
    pub pid: Option<u32>,
}

/// Host memory utilisation, for the memory-pressure controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostMemory {
    pub used_pct: f32,
    pub total_mb: f64,
}

/// Abstraction over the OS process table.
///
/// Methods are synchronous; callers with latency budgets wrap them in
/// `spawn_blocking` plus a timeout.
pub trait ProcessAdapter: Send + Sync + 'static {
    /// Locate a process for `path`. When `hint_pid` is alive its
    /// executable base name must match the expected one (PID reuse);
    /// otherwise the whole table is scanned by name.
    fn find(&self, path: &Path, hint_pid: Option<u32>) -> ProcessProbe;

    /// One bulk snapshot: executable base name → pid. The supervisor
    /// calls this once per sweep instead of probing per program.
    fn enumerate(&self) -> HashMap<String, u32>;

    /// Spawn detached and return the first matching pid observed within
    /// the settle window, or None.
    fn start(&self, path: &Path, args: Option<&str>) -> Option<u32>;

    /// Terminate every process matching `path`: children first, then
    /// parents. Polite termination waits up to 3 s per process before
    /// escalating to a forced kill of the subtree; `force` skips the
    /// polite phase. Returns true when nothing matching remains.
    fn stop(&self, path: &Path, force: bool) -> bool;

    /// `(cpu%, rss_mb)` for one pid; `(0, 0)` when the process is gone.
    fn sample(&self, pid: u32) -> (f32, f64);

    /// Host-wide memory utilisation.
    fn host_memory(&self) -> HostMemory;
}

/// Window to watch for a freshly spawned process to appear.
const SETTLE_WINDOW: Duration = Duration::from_millis(500);
const SETTLE_STEP: Duration = Duration::from_millis(50);

/// Per-process budget for polite termination before escalation.
const TERM_WAIT: Duration = Duration::from_secs(3);
const TERM_STEP: Duration = Duration::from_millis(100);

/// Real adapter over `sysinfo`. Holds a persistent `System` so repeated
/// refreshes produce CPU deltas rather than zeros.
pub struct SysinfoAdapter {
    sys: Mutex<System>,
}

impl SysinfoAdapter {
    pub fn new() -> Self {
        Self { sys: Mutex::new(System::new()) }
    }

    /// Refresh and return `(basename, pid, parent)` triples.
    fn snapshot(&self) -> Vec<(String, u32, Option<u32>)> {
        let mut sys = self.sys.lock();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        sys.processes()
            .iter()
            .map(|(pid, proc_)| {
                (
                    proc_.name().to_string_lossy().into_owned(),
                    pid.as_u32(),
                    proc_.parent().map(|p| p.as_u32()),
                )
            })
            .collect()
    }

    /// Matching pids for `base`, post-order over the child tree so each
    /// parent appears after all of its descendants.
    fn collect_victims(&self, base: &str) -> Vec<u32> {
        let snapshot = self.snapshot();
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for (_, pid, parent) in &snapshot {
            if let Some(parent) = parent {
                children.entry(*parent).or_default().push(*pid);
            }
        }

        let roots: Vec<u32> = snapshot
            .iter()
            .filter(|(name, _, _)| names_match(base, name))
            .map(|(_, pid, _)| *pid)
            .collect();

        let mut visited = HashSet::new();
        let mut ordered = Vec::new();
        for root in roots {
            push_post_order(root, &children, &mut visited, &mut ordered);
        }
        ordered
    }
}

impl Default for SysinfoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn push_post_order(
    pid: u32,
    children: &HashMap<u32, Vec<u32>>,
    visited: &mut HashSet<u32>,
    out: &mut Vec<u32>,
) {
    // PID reuse can fabricate parent cycles within one snapshot; the
    // visited set is marked on entry so they terminate.
    if !visited.insert(pid) {
        return;
    }
    if let Some(kids) = children.get(&pid) {
        for kid in kids {
            push_post_order(*kid, children, visited, out);
        }
    }
    out.push(pid);
}

/// Compare an expected executable base name against an observed process
/// name. Linux reports `comm`, truncated to 15 bytes, so a prefix match
/// is accepted once the observed name is at the truncation limit.
pub fn names_match(expected: &str, observed: &str) -> bool {
    if expected == observed {
        return true;
    }
    observed.len() >= 15 && expected.starts_with(observed)
}

impl ProcessAdapter for SysinfoAdapter {
    fn find(&self, path: &Path, hint_pid: Option<u32>) -> ProcessProbe {
        let base = base_name(path);
        let snapshot = self.snapshot();

        // Double-check the stored pid: alive is not enough, the slot may
        // have been reused by an unrelated process.
        if let Some(hint) = hint_pid {
            if let Some((name, pid, _)) = snapshot.iter().find(|(_, pid, _)| *pid == hint) {
                if names_match(&base, name) {
                    return ProcessProbe { running: true, pid: Some(*pid) };
                }
                debug!(pid = hint, observed = %name, expected = %base, "pid reused, rescanning");
            }
        }

        match snapshot.iter().find(|(name, _, _)| names_match(&base, name)) {
            Some((_, pid, _)) => ProcessProbe { running: true, pid: Some(*pid) },
            None => ProcessProbe { running: false, pid: None },
        }
    }

    fn enumerate(&self) -> HashMap<String, u32> {
        let mut map = HashMap::new();
        // First matching pid wins, like the probe path.
        for (name, pid, _) in self.snapshot() {
            map.entry(name).or_insert(pid);
        }
        map
    }

    fn start(&self, path: &Path, args: Option<&str>) -> Option<u32> {
        let mut command = Command::new(path);
        if let Some(args) = args {
            // Whitespace split only; registered argument strings carry no
            // shell quoting.
            command.args(args.split_whitespace());
        }
        if let Some(dir) = path.parent() {
            command.current_dir(dir);
        }
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        if let Err(e) = command.spawn() {
            warn!(path = %path.display(), error = %e, "spawn failed");
            return None;
        }

        // Some programs re-exec or fork; trust the process table, not the
        // immediate child, within the settle window.
        let deadline = Instant::now() + SETTLE_WINDOW;
        loop {
            let probe = self.find(path, None);
            if let Some(pid) = probe.pid {
                return Some(pid);
            }
            if Instant::now() >= deadline {
                warn!(path = %path.display(), "no matching process after spawn settle window");
                return None;
            }
            std::thread::sleep(SETTLE_STEP);
        }
    }

    fn stop(&self, path: &Path, force: bool) -> bool {
        let base = base_name(path);
        let victims = self.collect_victims(&base);
        if victims.is_empty() {
            debug!(name = %base, "stop: no matching process");
            return true;
        }

        for pid in &victims {
            if force {
                signal::kill_hard(*pid);
                continue;
            }
            signal::term(*pid);
            if !wait_gone(*pid, TERM_WAIT) {
                // Escalate: the stubborn process and whatever is left of
                // its subtree get SIGKILL.
                warn!(pid, name = %base, "polite termination timed out, escalating");
                for remaining in &victims {
                    if signal::is_alive(*remaining) {
                        signal::kill_hard(*remaining);
                    }
                }
                break;
            }
        }

        let gone = !self
            .collect_victims(&base)
            .iter()
            .any(|pid| signal::is_alive(*pid));
        if !gone {
            warn!(name = %base, "processes still present after stop");
        }
        gone
    }

    fn sample(&self, pid: u32) -> (f32, f64) {
        let mut sys = self.sys.lock();
        let target = Pid::from_u32(pid);
        sys.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        match sys.process(target) {
            Some(proc_) => {
                let rss_mb = proc_.memory() as f64 / (1024.0 * 1024.0);
                (proc_.cpu_usage(), rss_mb)
            }
            None => {
                debug!(pid, "sample: process gone");
                (0.0, 0.0)
            }
        }
    }

    fn host_memory(&self) -> HostMemory {
        let mut sys = self.sys.lock();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return HostMemory::default();
        }
        HostMemory {
            used_pct: (sys.used_memory() as f64 / total as f64 * 100.0) as f32,
            total_mb: total as f64 / (1024.0 * 1024.0),
        }
    }
}

fn wait_gone(pid: u32, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    while Instant::now() < deadline {
        if !signal::is_alive(pid) {
            return true;
        }
        std::thread::sleep(TERM_STEP);
    }
    !signal::is_alive(pid)
}

#[cfg(unix)]
mod signal {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use tracing::debug;

    pub(super) fn term(pid: u32) {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            debug!(pid, error = %e, "SIGTERM failed");
        }
    }

    pub(super) fn kill_hard(pid: u32) {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pid, error = %e, "SIGKILL failed");
        }
    }

    pub(super) fn is_alive(pid: u32) -> bool {
        // Signal 0: existence probe. EPERM still means alive.
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            Err(nix::errno::Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use std::collections::VecDeque;

    /// Recorded stop call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StopCall {
        pub base_name: String,
        pub force: bool,
    }

    #[derive(Default)]
    struct FakeState {
        /// basename → pid for everything "running".
        table: HashMap<String, u32>,
        /// pid → (cpu, rss_mb)
        samples: HashMap<u32, (f32, f64)>,
        /// pids handed out by successive `start` calls.
        start_pids: VecDeque<u32>,
        host_memory: HostMemory,
        starts: Vec<String>,
        stops: Vec<StopCall>,
    }

    /// Scriptable process adapter for tests.
    #[derive(Clone, Default)]
    pub struct FakeProcessAdapter {
        inner: std::sync::Arc<Mutex<FakeState>>,
    }

    impl FakeProcessAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Present `name` as running at `pid`.
        pub fn set_running(&self, name: &str, pid: u32) {
            self.inner.lock().table.insert(name.to_string(), pid);
        }

        /// Remove `name` from the process table.
        pub fn set_stopped(&self, name: &str) {
            let mut state = self.inner.lock();
            if let Some(pid) = state.table.remove(name) {
                state.samples.remove(&pid);
            }
        }

        pub fn set_sample(&self, pid: u32, cpu: f32, rss_mb: f64) {
            self.inner.lock().samples.insert(pid, (cpu, rss_mb));
        }

        /// Queue the pid the next `start` call reports.
        pub fn push_start_pid(&self, pid: u32) {
            self.inner.lock().start_pids.push_back(pid);
        }

        pub fn set_host_memory(&self, used_pct: f32, total_mb: f64) {
            self.inner.lock().host_memory = HostMemory { used_pct, total_mb };
        }

        pub fn starts(&self) -> Vec<String> {
            self.inner.lock().starts.clone()
        }

        pub fn stops(&self) -> Vec<StopCall> {
            self.inner.lock().stops.clone()
        }
    }

    impl ProcessAdapter for FakeProcessAdapter {
        fn find(&self, path: &Path, hint_pid: Option<u32>) -> ProcessProbe {
            let base = base_name(path);
            let state = self.inner.lock();
            match state.table.get(&base) {
                Some(pid) => ProcessProbe { running: true, pid: Some(*pid) },
                None => {
                    // A stale hint pid never resurrects a stopped program.
                    let _ = hint_pid;
                    ProcessProbe { running: false, pid: None }
                }
            }
        }

        fn enumerate(&self) -> HashMap<String, u32> {
            self.inner.lock().table.clone()
        }

        fn start(&self, path: &Path, _args: Option<&str>) -> Option<u32> {
            let base = base_name(path);
            let mut state = self.inner.lock();
            state.starts.push(base.clone());
            let pid = state.start_pids.pop_front()?;
            state.table.insert(base, pid);
            Some(pid)
        }

        fn stop(&self, path: &Path, force: bool) -> bool {
            let base = base_name(path);
            let mut state = self.inner.lock();
            state.stops.push(StopCall { base_name: base.clone(), force });
            if let Some(pid) = state.table.remove(&base) {
                state.samples.remove(&pid);
            }
            true
        }

        fn sample(&self, pid: u32) -> (f32, f64) {
            self.inner.lock().samples.get(&pid).copied().unwrap_or((0.0, 0.0))
        }

        fn host_memory(&self) -> HostMemory {
            self.inner.lock().host_memory
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessAdapter, StopCall};

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
