// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous multi-destination webhook dispatcher.
//!
//! Fan-out is per destination: each URL gets its own task so one slow
//! receiver never delays the others, and the caller returns as soon as
//! the tasks are queued. Failures are logged and dropped; there is no
//! durable retry queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::SecondsFormat;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use warden_core::{EventKind, Severity};

use crate::threads::ThreadBindings;

/// Per-destination request budget.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from webhook delivery. Logged at the dispatch site, never
/// retried.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("destination returned HTTP {0}")]
    Http(u16),

    #[error("client error: {0}")]
    Client(String),
}

/// One logical notification, fanned out to N destinations.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub program_name: String,
    pub kind: EventKind,
    pub details: String,
    pub severity: Severity,
}

/// Webhook dispatcher with per-program conversation threading for
/// Discord-style destinations.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    threads: Arc<ThreadBindings>,
}

impl WebhookNotifier {
    pub fn new(threads: Arc<ThreadBindings>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self { client, threads })
    }

    /// Queue delivery to every destination and return immediately with
    /// the number of tasks spawned.
    pub fn dispatch(&self, note: &Notification, urls: &[String]) -> usize {
        for url in urls {
            let this = self.clone();
            let note = note.clone();
            let url = url.clone();
            tokio::spawn(async move {
                match this.send_one(&note, &url).await {
                    Ok(()) => {
                        debug!(program = %note.program_name, kind = %note.kind, "webhook sent")
                    }
                    Err(e) => warn!(
                        program = %note.program_name,
                        kind = %note.kind,
                        error = %e,
                        "webhook dropped"
                    ),
                }
            });
        }
        urls.len()
    }

    /// Post a canonical test payload synchronously. Returns `(ok, status
    /// line)` for display to the operator.
    pub async fn test(&self, url: &str) -> (bool, String) {
        let note = Notification {
            program_name: "warden".to_string(),
            kind: EventKind::Test,
            details: "Webhook connectivity test".to_string(),
            severity: Severity::Info,
        };
        match self.send_one(&note, url).await {
            Ok(()) => (true, "webhook delivered".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }

    async fn send_one(&self, note: &Notification, url: &str) -> Result<(), NotifyError> {
        let now_iso = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let discord = is_discord_url(url);

        let (request_url, payload, creating_thread) = if discord {
            match self.threads.get(&note.program_name) {
                // Append to the program's existing thread via the query
                // parameter; the body never carries the thread id.
                Some(thread_id) => {
                    (append_query(url, "thread_id", &thread_id), discord_payload(note, &now_iso, None), false)
                }
                // First notification: ask the destination to open a
                // forum-style thread named after the program.
                None => (
                    url.to_string(),
                    discord_payload(note, &now_iso, Some(&note.program_name)),
                    true,
                ),
            }
        } else {
            (url.to_string(), generic_payload(note, &now_iso), false)
        };

        let response = self
            .client
            .post(&request_url)
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Http(status.as_u16()));
        }

        // 204 carries no body, so there is nothing to extract.
        if discord && creating_thread && status.as_u16() != 204 {
            if let Ok(body) = response.json::<Value>().await {
                match extract_thread_id(&body) {
                    Some(thread_id) => self.threads.set(&note.program_name, &thread_id),
                    None => debug!(program = %note.program_name, "no thread id in response"),
                }
            }
        }

        Ok(())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> NotifyError {
    if e.is_timeout() {
        NotifyError::Timeout
    } else if e.is_connect() {
        NotifyError::Connect(e.to_string())
    } else {
        NotifyError::Client(e.to_string())
    }
}

pub(crate) fn is_discord_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains("discord.com")
}

fn title_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Start => "Program started",
        EventKind::Stop => "Program stopped",
        EventKind::Restart => "Program restarted",
        EventKind::Crash => "Program crashed",
        EventKind::Test => "Webhook test",
        EventKind::Other => "Notification",
    }
}

fn color_for(severity: Severity) -> u32 {
    match severity {
        Severity::Info => 3_447_003,     // blue
        Severity::Success => 3_066_993,  // green
        Severity::Warning => 15_844_367, // orange
        Severity::Error => 15_158_332,   // red
    }
}

/// Rich embed for Discord destinations. `thread_name` is present only on
/// the thread-creating first send.
pub(crate) fn discord_payload(
    note: &Notification,
    now_iso: &str,
    thread_name: Option<&str>,
) -> Value {
    let mut payload = json!({
        "content": title_for(note.kind),
        "embeds": [{
            "title": title_for(note.kind),
            "description": format!("**{}**", note.program_name),
            "color": color_for(note.severity),
            "fields": [
                {
                    "name": "Details",
                    "value": if note.details.is_empty() { "-" } else { note.details.as_str() },
                    "inline": false
                },
                { "name": "Time", "value": now_iso, "inline": true },
                { "name": "Severity", "value": note.severity.as_str().to_uppercase(), "inline": true }
            ],
            "footer": { "text": "warden process supervisor" },
            "timestamp": now_iso
        }]
    });
    if let Some(name) = thread_name {
        payload["thread_name"] = Value::String(name.to_string());
    }
    payload
}

/// Flat JSON for non-Discord destinations.
pub(crate) fn generic_payload(note: &Notification, now_iso: &str) -> Value {
    json!({
        "program_name": note.program_name,
        "event_type": note.kind.as_str(),
        "status": note.severity.as_str(),
        "details": note.details,
        "timestamp": now_iso,
        "message": format!("Program '{}' - {}", note.program_name, note.kind),
    })
}

/// Pull a thread id out of a webhook response, trying the known shapes
/// in order: `thread.id`, `channel_id`, top-level `id`.
pub(crate) fn extract_thread_id(body: &Value) -> Option<String> {
    let candidates = [
        body.get("thread").and_then(|thread| thread.get("id")),
        body.get("channel_id"),
        body.get("id"),
    ];
    for candidate in candidates.into_iter().flatten() {
        match candidate {
            Value::String(s) if !s.is_empty() => return Some(s.clone()),
            Value::Number(n) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

pub(crate) fn append_query(url: &str, key: &str, value: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{key}={value}")
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
