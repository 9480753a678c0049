// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plug-in catalog, binding and action handlers.

use std::sync::Arc;

use serde_json::Value;

use warden_core::{Clock, ProgramId};
use warden_engine::PluginError;

use crate::protocol::{ErrorKind, PluginBindingView, Response};

use super::ListenCtx;

fn from_plugin_error(e: PluginError) -> Response {
    match e {
        PluginError::Unknown(id) => Response::not_found(format!("unknown plugin: {id}")),
        PluginError::NotBound => {
            Response::Error { kind: ErrorKind::NotFound, message: "plugin not bound".to_string() }
        }
        PluginError::InvalidConfig(message) => Response::validation(message),
        PluginError::Load(message) => Response::internal(message),
        PluginError::Store(e) => Response::from_store_error(e),
    }
}

pub(super) fn catalog<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    Response::PluginCatalog { plugins: ctx.plugins.catalog() }
}

pub(super) fn bindings<C: Clock>(ctx: &Arc<ListenCtx<C>>, program_id: ProgramId) -> Response {
    match ctx.plugins.bindings_for(program_id) {
        Ok(bindings) => Response::PluginBindings {
            bindings: bindings.into_iter().map(PluginBindingView::from).collect(),
        },
        Err(e) => Response::from_store_error(e),
    }
}

pub(super) fn bind<C: Clock>(
    ctx: &Arc<ListenCtx<C>>,
    program_id: ProgramId,
    plugin_id: &str,
    config: Value,
    enabled: bool,
) -> Response {
    match ctx.plugins.bind(program_id, plugin_id, &config, enabled, ctx.clock.epoch_ms()) {
        Ok(binding) => Response::PluginBound { binding: binding.into() },
        Err(e) => from_plugin_error(e),
    }
}

pub(super) fn unbind<C: Clock>(
    ctx: &Arc<ListenCtx<C>>,
    program_id: ProgramId,
    plugin_id: &str,
) -> Response {
    match ctx.plugins.unbind(program_id, plugin_id) {
        Ok(true) => Response::Ok,
        Ok(false) => Response::not_found(format!("no binding for plugin {plugin_id}")),
        Err(e) => from_plugin_error(e),
    }
}

/// Actions may do network I/O (RCON, HTTP), so they run on a blocking
/// thread with the plug-in's own budget.
pub(super) async fn invoke<C: Clock>(
    ctx: &Arc<ListenCtx<C>>,
    program_id: ProgramId,
    plugin_id: String,
    action: String,
    params: Value,
) -> Response {
    let plugins = Arc::clone(&ctx.plugins);
    let outcome = tokio::task::spawn_blocking(move || {
        plugins.invoke(program_id, &plugin_id, &action, &params)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => Response::PluginResult { result },
        Ok(Err(e)) => from_plugin_error(e),
        Err(e) => Response::internal(format!("plugin task: {e}")),
    }
}
