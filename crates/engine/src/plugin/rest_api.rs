// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic HTTP hook plug-in.
//!
//! For programs exposing their own HTTP control surface: a configured
//! base URL plus raw GET/POST/PUT/DELETE actions with a path parameter.
//! When enabled per config, lifecycle hooks post start/stop/crash
//! notifications to configured endpoints automatically.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use warden_core::ProgramId;

use super::{
    config_str, ActionDescriptor, ActionResult, ConfigField, FieldKind, ParamField, Plugin,
    PluginDescriptor, PluginError,
};

const HTTP_BUDGET: Duration = Duration::from_secs(5);

fn path_param(required: bool) -> ParamField {
    ParamField {
        name: "path".into(),
        title: "Path".into(),
        kind: FieldKind::String { format: None },
        required,
    }
}

fn body_param() -> ParamField {
    ParamField {
        name: "body".into(),
        title: "JSON body".into(),
        kind: FieldKind::String { format: None },
        required: false,
    }
}

pub(super) fn descriptor() -> PluginDescriptor {
    PluginDescriptor {
        id: "rest_api".into(),
        name: "Generic REST API".into(),
        description: "Calls a program's own HTTP control endpoints, with optional \
                      start/stop notifications."
            .into(),
        config: vec![
            ConfigField {
                name: "base_url".into(),
                title: "Base URL".into(),
                kind: FieldKind::String { format: Some("uri".into()) },
                required: true,
                default: None,
            },
            ConfigField {
                name: "auth_header".into(),
                title: "Authorization header".into(),
                kind: FieldKind::String { format: Some("password".into()) },
                required: false,
                default: None,
            },
            ConfigField {
                name: "on_start_enabled".into(),
                title: "Notify on start".into(),
                kind: FieldKind::Boolean,
                required: false,
                default: Some(json!(false)),
            },
            ConfigField {
                name: "on_start_endpoint".into(),
                title: "Start endpoint".into(),
                kind: FieldKind::String { format: None },
                required: false,
                default: Some(json!("/api/program/start")),
            },
            ConfigField {
                name: "on_stop_enabled".into(),
                title: "Notify on stop/crash".into(),
                kind: FieldKind::Boolean,
                required: false,
                default: Some(json!(false)),
            },
            ConfigField {
                name: "on_stop_endpoint".into(),
                title: "Stop endpoint".into(),
                kind: FieldKind::String { format: None },
                required: false,
                default: Some(json!("/api/program/stop")),
            },
        ],
        actions: vec![
            ActionDescriptor {
                name: "health_check".into(),
                title: "Health check".into(),
                description: "GET on the base URL.".into(),
                params: vec![],
            },
            ActionDescriptor {
                name: "http_get".into(),
                title: "HTTP GET".into(),
                description: "GET on a path below the base URL.".into(),
                params: vec![path_param(true)],
            },
            ActionDescriptor {
                name: "http_post".into(),
                title: "HTTP POST".into(),
                description: "POST a JSON body to a path below the base URL.".into(),
                params: vec![path_param(true), body_param()],
            },
            ActionDescriptor {
                name: "http_put".into(),
                title: "HTTP PUT".into(),
                description: "PUT a JSON body to a path below the base URL.".into(),
                params: vec![path_param(true), body_param()],
            },
            ActionDescriptor {
                name: "http_delete".into(),
                title: "HTTP DELETE".into(),
                description: "DELETE on a path below the base URL.".into(),
                params: vec![path_param(true)],
            },
        ],
    }
}

pub(super) fn build(
    program_id: ProgramId,
    config: &Value,
) -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(RestApiPlugin {
        program_id,
        base_url: config_str(config, "base_url", "").trim_end_matches('/').to_string(),
        auth_header: config.get("auth_header").and_then(Value::as_str).map(str::to_string),
        on_start_enabled: config.get("on_start_enabled").and_then(Value::as_bool).unwrap_or(false),
        on_start_endpoint: config_str(config, "on_start_endpoint", "/api/program/start"),
        on_stop_enabled: config.get("on_stop_enabled").and_then(Value::as_bool).unwrap_or(false),
        on_stop_endpoint: config_str(config, "on_stop_endpoint", "/api/program/stop"),
    }))
}

struct RestApiPlugin {
    program_id: ProgramId,
    base_url: String,
    auth_header: Option<String>,
    on_start_enabled: bool,
    on_start_endpoint: String,
    on_stop_enabled: bool,
    on_stop_endpoint: String,
}

impl Plugin for RestApiPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        descriptor()
    }

    fn validate(&self, config: &Value) -> Result<(), String> {
        let base_url = config.get("base_url").and_then(Value::as_str).unwrap_or("");
        if base_url.is_empty() {
            return Err("base_url is required".to_string());
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(format!("base_url must be http(s): {base_url}"));
        }
        Ok(())
    }

    fn execute(&self, action: &str, params: &Value) -> ActionResult {
        match action {
            "health_check" => self.request("GET", "", None),
            "http_get" => match param_path(params) {
                Some(path) => self.request("GET", &path, None),
                None => ActionResult::fail("missing required param: path"),
            },
            "http_post" => match param_path(params) {
                Some(path) => self.request("POST", &path, params.get("body").cloned()),
                None => ActionResult::fail("missing required param: path"),
            },
            "http_put" => match param_path(params) {
                Some(path) => self.request("PUT", &path, params.get("body").cloned()),
                None => ActionResult::fail("missing required param: path"),
            },
            "http_delete" => match param_path(params) {
                Some(path) => self.request("DELETE", &path, None),
                None => ActionResult::fail("missing required param: path"),
            },
            other => ActionResult::fail(format!("unknown action: {other}")),
        }
    }

    fn on_program_start(&self, pid: u32) {
        if self.on_start_enabled {
            self.lifecycle_notify(&self.on_start_endpoint, "start", pid);
        }
    }

    fn on_program_stop(&self, pid: u32) {
        if self.on_stop_enabled {
            self.lifecycle_notify(&self.on_stop_endpoint, "stop", pid);
        }
    }

    // Crash reuses the stop endpoint; the event field tells them apart.
    fn on_program_crash(&self, pid: u32) {
        if self.on_stop_enabled {
            self.lifecycle_notify(&self.on_stop_endpoint, "crash", pid);
        }
    }
}

fn param_path(params: &Value) -> Option<String> {
    let path = params.get("path").and_then(Value::as_str)?;
    if path.is_empty() {
        return None;
    }
    Some(if path.starts_with('/') { path.to_string() } else { format!("/{path}") })
}

impl RestApiPlugin {
    /// Config-gated lifecycle notification: fire-and-forget with the
    /// plug-in's own budget, failures logged and dropped.
    fn lifecycle_notify(&self, endpoint: &str, event: &str, pid: u32) {
        let body = json!({
            "program_id": self.program_id,
            "pid": pid,
            "event": event,
        });
        let result = self.request("POST", endpoint, Some(body));
        if result.success {
            debug!(program = self.program_id, event, endpoint, "lifecycle hook delivered");
        } else {
            warn!(
                program = self.program_id,
                event,
                endpoint,
                message = %result.message,
                "lifecycle hook dropped"
            );
        }
    }

    fn request(&self, method: &str, path: &str, body: Option<Value>) -> ActionResult {
        let client = match reqwest::blocking::Client::builder().timeout(HTTP_BUDGET).build() {
            Ok(client) => client,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        let url = format!("{}{path}", self.base_url);
        let mut request = match method {
            "POST" => client.post(&url),
            "PUT" => client.put(&url),
            "DELETE" => client.delete(&url),
            _ => client.get(&url),
        };
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        match request.send() {
            Ok(response) => {
                let status = response.status();
                let data = response.json::<Value>().ok();
                if status.is_success() {
                    ActionResult {
                        success: true,
                        message: format!("{method} {url}: HTTP {status}"),
                        data: data.or(Some(json!(null))),
                    }
                } else {
                    ActionResult::fail(format!("{method} {url}: HTTP {status}"))
                }
            }
            Err(e) => ActionResult::fail(format!("{method} {url}: {e}")),
        }
    }
}

#[cfg(test)]
#[path = "rest_api_tests.rs"]
mod tests;
