// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status poll, sample and event read handlers.

use std::sync::Arc;
use std::time::Duration;

use warden_core::{Clock, ProgramId, ProgramStatus};

use crate::protocol::Response;

use super::{program_tag, ListenCtx, TAG_SAMPLES, TAG_STATUS};

const STATUS_KEY: &str = "programs:status";

/// The status snapshot is cached briefly; graceful-shutdown countdowns
/// bypass it entirely so the remaining seconds are live.
const STATUS_TTL: Duration = Duration::from_secs(2);

pub(super) fn poll<C: Clock>(ctx: &Arc<ListenCtx<C>>) -> Response {
    let programs = match ctx.store.list_programs() {
        Ok(programs) => programs,
        Err(e) => return Response::from_store_error(e),
    };

    let now_ms = ctx.clock.epoch_ms();
    let countdown_active = programs
        .iter()
        .any(|p| p.graceful.map(|window| !window.expired(now_ms)).unwrap_or(false));

    if !countdown_active {
        if let Some(cached) = ctx.cache.get(STATUS_KEY) {
            if let Ok(statuses) = serde_json::from_value::<Vec<ProgramStatus>>(cached) {
                return Response::Statuses {
                    statuses,
                    pressure: ctx.memory.level(),
                    cached: true,
                };
            }
        }
    }

    let statuses = ctx.supervisor.statuses(&programs);
    if !countdown_active {
        if let Ok(value) = serde_json::to_value(&statuses) {
            ctx.cache.set_with_ttl(STATUS_KEY, value, &[TAG_STATUS], STATUS_TTL);
        }
    }

    Response::Statuses { statuses, pressure: ctx.memory.level(), cached: false }
}

pub(super) fn samples<C: Clock>(
    ctx: &Arc<ListenCtx<C>>,
    program_id: ProgramId,
    hours: u32,
) -> Response {
    if hours == 0 {
        return Response::validation("hours must be at least 1");
    }

    let key = format!("samples:{program_id}:{hours}");
    if let Some(cached) = ctx.cache.get(&key) {
        if let Ok(samples) = serde_json::from_value(cached) {
            return Response::Samples { samples };
        }
    }

    let since_ms = ctx.clock.epoch_ms() - i64::from(hours) * 3_600_000;
    match ctx.store.list_samples(program_id, since_ms) {
        Ok(samples) => {
            if let Ok(value) = serde_json::to_value(&samples) {
                ctx.cache.set(&key, value, &[TAG_SAMPLES, &program_tag(program_id)]);
            }
            Response::Samples { samples }
        }
        Err(e) => Response::from_store_error(e),
    }
}

pub(super) fn events<C: Clock>(
    ctx: &Arc<ListenCtx<C>>,
    program_id: ProgramId,
    limit: u32,
) -> Response {
    let limit = if limit == 0 { 100 } else { limit.min(1000) };
    match ctx.store.list_events(program_id, limit) {
        Ok(events) => Response::Events { events },
        Err(e) => Response::from_store_error(e),
    }
}

pub(super) async fn webhook_test<C: Clock>(ctx: &Arc<ListenCtx<C>>, url: &str) -> Response {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Response::validation(format!("webhook url must be http(s): {url}"));
    }
    let (ok, message) = ctx.notifier.test(url).await;
    Response::WebhookTested { ok, message }
}
