// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Program registry handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use warden_core::{normalize_path, Clock, Program, ProgramDraft, ProgramId};

use crate::protocol::Response;

use super::{invalidate_program_caches, ListenCtx, TAG_PROGRAMS, TAG_PROGRAM_LIST};

const LIST_KEY: &str = "programs:list";

/// Normalize and sanity-check an operator-supplied draft.
fn validated(mut draft: ProgramDraft) -> Result<ProgramDraft, String> {
    draft.name = draft.name.trim().to_string();
    if draft.name.is_empty() {
        return Err("name is required".to_string());
    }
    if draft.path.as_os_str().is_empty() {
        return Err("path is required".to_string());
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    draft.path = normalize_path(&draft.path, &cwd);
    for url in &draft.webhook_urls {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("webhook url must be http(s): {url}"));
        }
    }
    Ok(draft)
}

pub(super) fn list<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    if let Some(cached) = ctx.cache.get(LIST_KEY) {
        if let Ok(programs) = serde_json::from_value::<Vec<Program>>(cached) {
            return Response::Programs { programs };
        }
    }

    match ctx.store.list_programs() {
        Ok(programs) => {
            if let Ok(value) = serde_json::to_value(&programs) {
                ctx.cache.set(LIST_KEY, value, &[TAG_PROGRAMS, TAG_PROGRAM_LIST]);
            }
            Response::Programs { programs }
        }
        Err(e) => Response::from_store_error(e),
    }
}

pub(super) fn get<C: Clock>(ctx: &Arc<ListenCtx<C>>, id: ProgramId) -> Response {
    match ctx.store.get_program(id) {
        Ok(Some(program)) => Response::Program { program },
        Ok(None) => Response::not_found(format!("program {id}")),
        Err(e) => Response::from_store_error(e),
    }
}

pub(super) fn create<C: Clock>(ctx: &Arc<ListenCtx<C>>, draft: ProgramDraft) -> Response {
    let draft = match validated(draft) {
        Ok(draft) => draft,
        Err(message) => return Response::validation(message),
    };

    match ctx.store.create_program(&draft, ctx.clock.epoch_ms()) {
        Ok(program) => {
            info!(id = program.id, name = %program.name, "program registered");
            invalidate_program_caches(ctx, None);
            Response::Program { program }
        }
        Err(e) => Response::from_store_error(e),
    }
}

pub(super) fn update<C: Clock>(
    ctx: &Arc<ListenCtx<C>>,
    id: ProgramId,
    draft: ProgramDraft,
) -> Response {
    let draft = match validated(draft) {
        Ok(draft) => draft,
        Err(message) => return Response::validation(message),
    };

    if let Err(e) = ctx.store.update_program(id, &draft, ctx.clock.epoch_ms()) {
        return Response::from_store_error(e);
    }
    invalidate_program_caches(ctx, Some(id));

    match ctx.store.get_program(id) {
        Ok(Some(program)) => Response::Program { program },
        Ok(None) => Response::not_found(format!("program {id}")),
        Err(e) => Response::from_store_error(e),
    }
}

pub(super) fn delete<C: Clock>(ctx: &Arc<ListenCtx<C>>, id: ProgramId) -> Response {
    let program = match ctx.store.get_program(id) {
        Ok(Some(program)) => program,
        Ok(None) => return Response::not_found(format!("program {id}")),
        Err(e) => return Response::from_store_error(e),
    };

    match ctx.store.delete_program(id) {
        Ok(true) => {
            // Events, samples, URLs and plugin rows cascade in the store;
            // in-memory state is tended here.
            ctx.handle.forget_intentional_stop(&program.name);
            ctx.handle.end_restart(&program.name);
            ctx.plugins.forget_program(id);
            invalidate_program_caches(ctx, Some(id));
            info!(id, name = %program.name, "program deleted");
            Response::Ok
        }
        Ok(false) => Response::not_found(format!("program {id}")),
        Err(e) => Response::from_store_error(e),
    }
}
