// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle command handlers: start, stop, restart.
//!
//! All three mark the intentional-stop set *before* dispatching to the
//! process adapter, then raise the immediate-check flag so the next
//! sweep classifies the transition promptly.

use std::sync::Arc;

use tracing::{info, warn};

use warden_adapters::Notification;
use warden_core::{Clock, EventKind, Program, ProgramId, Severity};

use crate::protocol::Response;

use super::{invalidate_program_caches, ListenCtx};

fn fetch<C: Clock>(ctx: &Arc<ListenCtx<C>>, id: ProgramId) -> Result<Program, Response> {
    match ctx.store.get_program(id) {
        Ok(Some(program)) => Ok(program),
        Ok(None) => Err(Response::not_found(format!("program {id}"))),
        Err(e) => Err(Response::from_store_error(e)),
    }
}

pub(super) async fn start<C: Clock>(ctx: &Arc<ListenCtx<C>>, id: ProgramId) -> Response {
    let program = match fetch(ctx, id) {
        Ok(program) => program,
        Err(response) => return response,
    };

    let adapter = Arc::clone(&ctx.adapter);
    let path = program.path.clone();
    let args = program.args.clone();
    let pid = match tokio::task::spawn_blocking(move || adapter.start(&path, args.as_deref()))
        .await
    {
        Ok(pid) => pid,
        Err(e) => return Response::internal(format!("start task: {e}")),
    };

    if let Some(pid) = pid {
        if let Err(e) = ctx.store.set_child_pid(id, pid) {
            warn!(id, error = %e, "child pid not recorded");
        }
    } else {
        warn!(id, name = %program.name, "no matching process after start");
    }

    invalidate_program_caches(ctx, Some(id));
    ctx.handle.request_immediate_check();
    info!(id, name = %program.name, ?pid, "start dispatched");
    Response::Started { id, pid }
}

pub(super) async fn stop<C: Clock>(ctx: &Arc<ListenCtx<C>>, id: ProgramId, force: bool) -> Response {
    let program = match fetch(ctx, id) {
        Ok(program) => program,
        Err(response) => return response,
    };

    // Before any dispatch, so the sweep that observes the exit
    // classifies it as a stop.
    ctx.handle.mark_intentional_stop(&program.name);

    // Polite path first: a bound plug-in may accept a graceful shutdown,
    // in which case only a deadline is recorded and the process is left
    // to wind itself down.
    if !force {
        let plugins = Arc::clone(&ctx.plugins);
        let polite =
            tokio::task::spawn_blocking(move || plugins.polite_shutdown(id)).await.unwrap_or(None);
        if let Some(grace_secs) = polite {
            return match ctx.store.set_graceful_shutdown(id, grace_secs, ctx.clock.epoch_ms()) {
                Ok(window) => {
                    invalidate_program_caches(ctx, Some(id));
                    ctx.handle.request_immediate_check();
                    info!(id, name = %program.name, grace_secs, "graceful shutdown accepted");
                    Response::Stopped {
                        id,
                        graceful: true,
                        shutdown_remaining_secs: Some(window.remaining_secs(ctx.clock.epoch_ms())),
                    }
                }
                Err(e) => Response::from_store_error(e),
            };
        }
    }

    let adapter = Arc::clone(&ctx.adapter);
    let path = program.path.clone();
    let stopped =
        match tokio::task::spawn_blocking(move || adapter.stop(&path, force)).await {
            Ok(stopped) => stopped,
            Err(e) => return Response::internal(format!("stop task: {e}")),
        };
    if !stopped {
        warn!(id, name = %program.name, "processes survived stop");
    }

    invalidate_program_caches(ctx, Some(id));
    ctx.handle.request_immediate_check();
    info!(id, name = %program.name, force, "stop dispatched");
    Response::Stopped { id, graceful: false, shutdown_remaining_secs: None }
}

pub(super) async fn restart<C: Clock>(ctx: &Arc<ListenCtx<C>>, id: ProgramId) -> Response {
    let program = match fetch(ctx, id) {
        Ok(program) => program,
        Err(response) => return response,
    };

    // The stop wait can take up to 3 s per process and sweeps keep
    // running meanwhile: the restart flag freezes classification for
    // this program so the gap never surfaces as a stop or crash. The
    // intentional-stop mark stays as a fallback in case the new
    // process fails to appear.
    ctx.handle.mark_intentional_stop(&program.name);
    ctx.handle.begin_restart(&program.name);

    let adapter = Arc::clone(&ctx.adapter);
    let path = program.path.clone();
    let args = program.args.clone();
    let pid = match tokio::task::spawn_blocking(move || {
        adapter.stop(&path, false);
        adapter.start(&path, args.as_deref())
    })
    .await
    {
        Ok(pid) => pid,
        Err(e) => {
            ctx.handle.end_restart(&program.name);
            return Response::internal(format!("restart task: {e}"));
        }
    };

    if let Some(pid) = pid {
        if let Err(e) = ctx.store.set_child_pid(id, pid) {
            warn!(id, error = %e, "child pid not recorded");
        }
    }

    // Sweeps were suppressed across the stop/start, so the restart is
    // recorded here as the single event for the whole operation.
    if let Err(e) = ctx.store.append_event(id, EventKind::Restart, "operator restart", ctx.clock.epoch_ms())
    {
        warn!(id, error = %e, "restart event not recorded");
    }
    ctx.handle.end_restart(&program.name);
    if !program.webhook_urls.is_empty() {
        let note = Notification {
            program_name: program.name.clone(),
            kind: EventKind::Restart,
            details: "operator restart".to_string(),
            severity: Severity::Info,
        };
        ctx.notifier.dispatch(&note, &program.webhook_urls);
    }

    invalidate_program_caches(ctx, Some(id));
    ctx.handle.request_immediate_check();
    info!(id, name = %program.name, ?pid, "restart dispatched");
    Response::Restarted { id, pid }
}
