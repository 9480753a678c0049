// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared rig: a full daemon context over fakes and a temp store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use warden_adapters::{FakeProcessAdapter, ThreadBindings, WebhookNotifier};
use warden_core::{EventKind, FakeClock, Program, ProgramDraft, ProgramId, RetentionPolicy};
use warden_daemon::listener::{handle_request, ListenCtx};
use warden_daemon::{Request, Response};
use warden_engine::{
    ActionDescriptor, ActionResult, Cache, FakeNotifier, MemoryController, MetricBuffer, Plugin,
    PluginDescriptor, PluginError, PluginHost, PluginRegistry, Supervisor, SupervisorConfig,
    SupervisorDeps,
};
use warden_store::Store;

pub struct Rig {
    pub ctx: Arc<ListenCtx<FakeClock>>,
    pub supervisor: Arc<Supervisor<FakeClock>>,
    pub store: Store,
    pub adapter: FakeProcessAdapter,
    pub notifier: FakeNotifier,
    pub clock: FakeClock,
    pub buffer: Arc<MetricBuffer<FakeClock>>,
    _dir: tempfile::TempDir,
}

pub fn rig() -> Rig {
    rig_with(PluginRegistry::built_ins(), 1000)
}

pub fn rig_with(registry: PluginRegistry, buffer_capacity: usize) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("warden.db"), 2).unwrap();
    let clock = FakeClock::new();
    let adapter = FakeProcessAdapter::new();
    let notifier = FakeNotifier::new();
    let cache = Arc::new(Cache::with_default_ttl(clock.clone()));
    let threads_path = dir.path().join("webhook_threads.json");
    let webhooks =
        WebhookNotifier::new(Arc::new(ThreadBindings::new(threads_path.clone()))).unwrap();
    let buffer = Arc::new(MetricBuffer::new(store.clone(), clock.clone(), buffer_capacity));
    let plugins = Arc::new(PluginHost::new(registry, store.clone()));
    let memory = Arc::new(MemoryController::new(
        Arc::clone(&cache),
        Arc::new(adapter.clone()),
        clock.clone(),
    ));

    let supervisor = Arc::new(Supervisor::new(
        SupervisorDeps {
            store: store.clone(),
            adapter: Arc::new(adapter.clone()),
            notifier: Arc::new(notifier.clone()),
            buffer: Arc::clone(&buffer),
            plugins: Arc::clone(&plugins),
        },
        clock.clone(),
        SupervisorConfig::default(),
    ));

    let ctx = Arc::new(ListenCtx {
        store: store.clone(),
        cache,
        supervisor: Arc::clone(&supervisor),
        handle: supervisor.handle(),
        adapter: Arc::new(adapter.clone()),
        notifier: webhooks,
        plugins,
        memory,
        retention: RetentionPolicy::default(),
        backups_path: dir.path().join("backups"),
        threads_path,
        clock: clock.clone(),
        shutdown: CancellationToken::new(),
        start_time: Instant::now(),
    });

    Rig { ctx, supervisor, store, adapter, notifier, clock, buffer, _dir: dir }
}

impl Rig {
    pub async fn request(&self, request: Request) -> Response {
        handle_request(&self.ctx, request).await
    }

    pub async fn register(&self, name: &str, urls: &[&str]) -> Program {
        let draft = ProgramDraft {
            name: name.to_string(),
            path: PathBuf::from(format!("/bin/{name}")),
            args: None,
            webhook_urls: urls.iter().map(|u| u.to_string()).collect(),
        };
        match self.request(Request::ProgramCreate { draft }).await {
            Response::Program { program } => program,
            other => panic!("register failed: {other:?}"),
        }
    }

    pub async fn sweep(&self) {
        self.supervisor.sweep().await;
    }

    /// Event kinds for one program in emission order.
    pub fn events(&self, id: ProgramId) -> Vec<EventKind> {
        let mut kinds: Vec<_> =
            self.store.list_events(id, 1000).unwrap().into_iter().map(|e| e.kind).collect();
        kinds.reverse();
        kinds
    }
}

/// Plug-in whose `shutdown_server` always succeeds; used for graceful
/// shutdown scenarios.
struct GracefulPlugin;

pub fn graceful_descriptor() -> PluginDescriptor {
    PluginDescriptor {
        id: "graceful".into(),
        name: "Graceful".into(),
        description: "always accepts polite shutdown".into(),
        config: vec![],
        actions: vec![ActionDescriptor {
            name: "shutdown_server".into(),
            title: "Shutdown".into(),
            description: "polite stop".into(),
            params: vec![],
        }],
    }
}

pub fn graceful_build(
    _program_id: ProgramId,
    _config: &Value,
) -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(GracefulPlugin))
}

impl Plugin for GracefulPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        graceful_descriptor()
    }

    fn validate(&self, _config: &Value) -> Result<(), String> {
        Ok(())
    }

    fn execute(&self, action: &str, _params: &Value) -> ActionResult {
        match action {
            "shutdown_server" => ActionResult::ok("winding down"),
            other => ActionResult::fail(format!("unknown action: {other}")),
        }
    }
}
