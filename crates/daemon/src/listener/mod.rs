// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the query surface.
//!
//! Accepts Unix-socket connections and serves the Request/Response
//! protocol without blocking the supervisor. Handlers are grouped per
//! area; each request runs on its own connection task.

mod admin;
mod lifecycle;
mod plugins;
mod programs;
mod status;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use warden_adapters::{ProcessAdapter, WebhookNotifier};
use warden_core::{Clock, RetentionPolicy};
use warden_engine::{Cache, MemoryController, PluginHost, Supervisor, SupervisorHandle};
use warden_store::Store;

use crate::env::DAEMON_VERSION;
use crate::protocol::{self, Request, Response};

/// Shared daemon context for all request handlers.
pub struct ListenCtx<C: Clock> {
    pub store: Store,
    pub cache: Arc<Cache<C>>,
    pub supervisor: Arc<Supervisor<C>>,
    pub handle: SupervisorHandle,
    pub adapter: Arc<dyn ProcessAdapter>,
    pub notifier: WebhookNotifier,
    pub plugins: Arc<PluginHost>,
    pub memory: Arc<MemoryController<C>>,
    pub retention: RetentionPolicy,
    pub backups_path: PathBuf,
    pub threads_path: PathBuf,
    pub clock: C,
    pub shutdown: CancellationToken,
    pub start_time: Instant,
}

/// Listener task accepting socket connections until shutdown.
pub struct Listener<C: Clock> {
    unix: UnixListener,
    ctx: Arc<ListenCtx<C>>,
}

impl<C: Clock> Listener<C> {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx<C>>) -> Self {
        Self { unix, ctx }
    }

    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            handle_connection(reader, writer, ctx).await;
                        });
                    }
                    Err(e) => error!("accept error: {e}"),
                },
            }
        }
        debug!("listener stopped");
    }
}

async fn handle_connection<C: Clock>(
    mut reader: impl AsyncRead + Unpin,
    mut writer: impl AsyncWrite + Unpin,
    ctx: Arc<ListenCtx<C>>,
) {
    loop {
        let request = match protocol::read_request(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(protocol::ProtocolError::Malformed(e)) => {
                // The length prefix keeps the stream in sync, so the
                // connection survives one bad payload.
                let response = Response::validation(format!("malformed request: {e}"));
                if protocol::write_response(&mut writer, &response).await.is_err() {
                    break;
                }
                continue;
            }
            Err(e) => {
                debug!("connection read error: {e}");
                break;
            }
        };

        let response = handle_request(&ctx, request).await;
        let done = matches!(response, Response::ShuttingDown);
        if let Err(e) = protocol::write_response(&mut writer, &response).await {
            warn!("connection write error: {e}");
            break;
        }
        if done {
            break;
        }
    }
}

/// Dispatch one request. Public so the daemon's own tests (and the
/// workspace specs) can drive the query surface without a socket.
pub async fn handle_request<C: Clock>(ctx: &Arc<ListenCtx<C>>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong {
            version: DAEMON_VERSION.to_string(),
            uptime_secs: ctx.start_time.elapsed().as_secs(),
        },

        Request::ProgramList => programs::list(ctx),
        Request::ProgramGet { id } => programs::get(ctx, id),
        Request::ProgramCreate { draft } => programs::create(ctx, draft),
        Request::ProgramUpdate { id, draft } => programs::update(ctx, id, draft),
        Request::ProgramDelete { id } => programs::delete(ctx, id),

        Request::ProgramStart { id } => lifecycle::start(ctx, id).await,
        Request::ProgramStop { id, force } => lifecycle::stop(ctx, id, force).await,
        Request::ProgramRestart { id } => lifecycle::restart(ctx, id).await,

        Request::StatusPoll => status::poll(ctx),
        Request::SampleRead { program_id, hours } => status::samples(ctx, program_id, hours),
        Request::EventRead { program_id, limit } => status::events(ctx, program_id, limit),
        Request::WebhookTest { url } => status::webhook_test(ctx, &url).await,

        Request::PluginCatalog => plugins::catalog(ctx),
        Request::PluginBindings { program_id } => plugins::bindings(ctx, program_id),
        Request::PluginBind { program_id, plugin_id, config, enabled } => {
            plugins::bind(ctx, program_id, &plugin_id, config, enabled)
        }
        Request::PluginUnbind { program_id, plugin_id } => {
            plugins::unbind(ctx, program_id, &plugin_id)
        }
        Request::PluginInvoke { program_id, plugin_id, action, params } => {
            plugins::invoke(ctx, program_id, plugin_id, action, params).await
        }

        Request::CacheStats => admin::cache_stats(ctx),
        Request::CacheClear => admin::cache_clear(ctx),
        Request::CacheResetStats => admin::cache_reset_stats(ctx),
        Request::PoolStats => admin::pool_stats(ctx),
        Request::MemoryPressure => admin::memory_pressure(ctx),
        Request::SecurityStatus => admin::security_status(ctx),
        Request::Archive => admin::archive(ctx).await,

        Request::Shutdown => {
            ctx.shutdown.cancel();
            Response::ShuttingDown
        }
    }
}

/// Cache tags shared by the program handlers.
pub(crate) const TAG_PROGRAMS: &str = "programs";
pub(crate) const TAG_PROGRAM_LIST: &str = "programs:list";
pub(crate) const TAG_STATUS: &str = "programs:status";
pub(crate) const TAG_SAMPLES: &str = "samples";

pub(crate) fn program_tag(id: warden_core::ProgramId) -> String {
    format!("program:{id}")
}

/// Expire every cached read that depends on the program registry.
pub(crate) fn invalidate_program_caches<C: Clock>(
    ctx: &ListenCtx<C>,
    id: Option<warden_core::ProgramId>,
) {
    ctx.cache.invalidate_tags(&[TAG_PROGRAMS, TAG_PROGRAM_LIST, TAG_STATUS]);
    if let Some(id) = id {
        ctx.cache.invalidate_by_tag(&program_tag(id));
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
