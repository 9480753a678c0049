// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture wiring a full ListenCtx over fakes and a temp store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use warden_adapters::{FakeProcessAdapter, ThreadBindings, WebhookNotifier};
use warden_core::{FakeClock, ProgramDraft, RetentionPolicy};
use warden_engine::{
    Cache, FakeNotifier, MemoryController, MetricBuffer, PluginHost, PluginRegistry, Supervisor,
    SupervisorConfig, SupervisorDeps,
};
use warden_store::Store;

use super::ListenCtx;

pub(crate) struct Fixture {
    pub ctx: Arc<ListenCtx<FakeClock>>,
    pub adapter: FakeProcessAdapter,
    pub clock: FakeClock,
    pub store: Store,
    pub supervisor: Arc<Supervisor<FakeClock>>,
    pub notifier: FakeNotifier,
    _dir: tempfile::TempDir,
}

pub(crate) fn fixture() -> Fixture {
    fixture_with_registry(PluginRegistry::built_ins())
}

pub(crate) fn fixture_with_registry(registry: PluginRegistry) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("warden.db"), 2).unwrap();
    let clock = FakeClock::new();
    let adapter = FakeProcessAdapter::new();
    let cache = Arc::new(Cache::with_default_ttl(clock.clone()));
    let threads_path = dir.path().join("webhook_threads.json");
    let webhooks =
        WebhookNotifier::new(Arc::new(ThreadBindings::new(threads_path.clone()))).unwrap();
    let notifier = FakeNotifier::new();
    let buffer = Arc::new(MetricBuffer::new(store.clone(), clock.clone(), 1000));
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
            buffer,
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

    Fixture { ctx, adapter, clock, store, supervisor, notifier, _dir: dir }
}

pub(crate) fn draft(name: &str) -> ProgramDraft {
    ProgramDraft {
        name: name.to_string(),
        path: PathBuf::from(format!("/opt/{name}")),
        args: None,
        webhook_urls: Vec::new(),
    }
}
