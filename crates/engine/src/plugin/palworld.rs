// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Palworld REST API plug-in.
//!
//! Controls a Palworld dedicated server through its official REST API
//! (`/v1/api/...`, basic auth `admin:<AdminPassword>`). The
//! `shutdown_server` action is the polite-stop hook the supervisor uses
//! before forced termination.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use warden_core::ProgramId;

use super::{
    config_str, config_u16, ActionDescriptor, ActionResult, ConfigField, FieldKind, ParamField,
    Plugin, PluginDescriptor, PluginError, GRACEFUL_SHUTDOWN_SECS,
};

const HTTP_BUDGET: Duration = Duration::from_secs(5);

pub(super) fn descriptor() -> PluginDescriptor {
    PluginDescriptor {
        id: "palworld".into(),
        name: "Palworld REST API".into(),
        description: "Controls a Palworld server: info, players, settings, metrics, \
                      announcements, player moderation, world saves, graceful shutdown.".into(),
        config: vec![
            ConfigField {
                name: "host".into(),
                title: "Server address".into(),
                kind: FieldKind::String { format: None },
                required: false,
                default: Some(json!("localhost")),
            },
            ConfigField {
                name: "port".into(),
                title: "REST API port".into(),
                kind: FieldKind::Integer { min: Some(1), max: Some(65535) },
                required: false,
                default: Some(json!(8212)),
            },
            ConfigField {
                name: "password".into(),
                title: "Admin password".into(),
                kind: FieldKind::String { format: Some("password".into()) },
                required: true,
                default: None,
            },
        ],
        actions: vec![
            ActionDescriptor {
                name: "get_info".into(),
                title: "Server info".into(),
                description: "Version, name, description and world GUID.".into(),
                params: vec![],
            },
            ActionDescriptor {
                name: "get_players".into(),
                title: "Player list".into(),
                description: "Players currently connected.".into(),
                params: vec![],
            },
            ActionDescriptor {
                name: "get_settings".into(),
                title: "Server settings".into(),
                description: "Current server settings.".into(),
                params: vec![],
            },
            ActionDescriptor {
                name: "get_metrics".into(),
                title: "Server metrics".into(),
                description: "Server FPS, uptime and player counts.".into(),
                params: vec![],
            },
            ActionDescriptor {
                name: "announce".into(),
                title: "Announce".into(),
                description: "Broadcasts a message to every player.".into(),
                params: vec![ParamField {
                    name: "message".into(),
                    title: "Message".into(),
                    kind: FieldKind::String { format: None },
                    required: true,
                }],
            },
            ActionDescriptor {
                name: "kick_player".into(),
                title: "Kick player".into(),
                description: "Kicks a player by Steam id, with an optional reason.".into(),
                params: vec![
                    ParamField {
                        name: "userid".into(),
                        title: "User id".into(),
                        kind: FieldKind::String { format: None },
                        required: true,
                    },
                    ParamField {
                        name: "message".into(),
                        title: "Reason".into(),
                        kind: FieldKind::String { format: None },
                        required: false,
                    },
                ],
            },
            ActionDescriptor {
                name: "ban_player".into(),
                title: "Ban player".into(),
                description: "Bans a player by Steam id, with an optional reason.".into(),
                params: vec![
                    ParamField {
                        name: "userid".into(),
                        title: "User id".into(),
                        kind: FieldKind::String { format: None },
                        required: true,
                    },
                    ParamField {
                        name: "message".into(),
                        title: "Reason".into(),
                        kind: FieldKind::String { format: None },
                        required: false,
                    },
                ],
            },
            ActionDescriptor {
                name: "unban_player".into(),
                title: "Unban player".into(),
                description: "Lifts a ban by Steam id.".into(),
                params: vec![ParamField {
                    name: "userid".into(),
                    title: "User id".into(),
                    kind: FieldKind::String { format: None },
                    required: true,
                }],
            },
            ActionDescriptor {
                name: "save_world".into(),
                title: "Save world".into(),
                description: "Forces a world save.".into(),
                params: vec![],
            },
            ActionDescriptor {
                name: "shutdown_server".into(),
                title: "Graceful shutdown".into(),
                description: "Announces and shuts down after a grace period.".into(),
                params: vec![],
            },
            ActionDescriptor {
                name: "force_stop".into(),
                title: "Force stop".into(),
                description: "Stops the server immediately, without announcement.".into(),
                params: vec![],
            },
        ],
    }
}

pub(super) fn build(
    program_id: ProgramId,
    config: &Value,
) -> Result<Box<dyn Plugin>, PluginError> {
    let host = config_str(config, "host", "localhost");
    let port = config_u16(config, "port", 8212);
    Ok(Box::new(PalworldPlugin {
        program_id,
        base_url: format!("http://{host}:{port}/v1/api"),
        password: config_str(config, "password", ""),
    }))
}

struct PalworldPlugin {
    program_id: ProgramId,
    base_url: String,
    password: String,
}

impl Plugin for PalworldPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        descriptor()
    }

    fn validate(&self, config: &Value) -> Result<(), String> {
        let password = config.get("password").and_then(Value::as_str).unwrap_or("");
        if password.is_empty() {
            return Err("password is required".to_string());
        }
        Ok(())
    }

    fn execute(&self, action: &str, params: &Value) -> ActionResult {
        match action {
            "get_info" => self.get("/info"),
            "get_players" => self.get("/players"),
            "get_settings" => self.get("/settings"),
            "get_metrics" => self.get("/metrics"),
            "announce" => match params.get("message").and_then(Value::as_str) {
                Some(message) if !message.is_empty() => {
                    self.post("/announce", Some(json!({ "message": message })))
                }
                _ => ActionResult::fail("missing required param: message"),
            },
            "kick_player" => self.player_action("/kick", params),
            "ban_player" => self.player_action("/ban", params),
            "unban_player" => match params.get("userid").and_then(Value::as_str) {
                Some(userid) if !userid.is_empty() => {
                    self.post("/unban", Some(json!({ "userid": userid })))
                }
                _ => ActionResult::fail("missing required param: userid"),
            },
            "save_world" => self.post("/save", None),
            "shutdown_server" => self.post(
                "/shutdown",
                Some(json!({
                    "waittime": GRACEFUL_SHUTDOWN_SECS,
                    "message": format!(
                        "Server shutting down in {GRACEFUL_SHUTDOWN_SECS} seconds"
                    ),
                })),
            ),
            "force_stop" => self.post("/stop", None),
            other => ActionResult::fail(format!("unknown action: {other}")),
        }
    }

    fn on_program_crash(&self, pid: u32) {
        debug!(program = self.program_id, pid, "palworld server crashed");
    }
}

impl PalworldPlugin {
    /// Kick/ban share a shape: required `userid`, optional reason.
    fn player_action(&self, path: &str, params: &Value) -> ActionResult {
        let userid = match params.get("userid").and_then(Value::as_str) {
            Some(userid) if !userid.is_empty() => userid,
            _ => return ActionResult::fail("missing required param: userid"),
        };
        let mut body = json!({ "userid": userid });
        if let Some(message) = params.get("message").and_then(Value::as_str) {
            if !message.is_empty() {
                body["message"] = Value::String(message.to_string());
            }
        }
        self.post(path, Some(body))
    }

    /// Per-call blocking client. Plug-in `execute` runs on blocking
    /// threads, never on the async runtime.
    fn client(&self) -> Result<reqwest::blocking::Client, String> {
        reqwest::blocking::Client::builder()
            .timeout(HTTP_BUDGET)
            .build()
            .map_err(|e| e.to_string())
    }

    fn get(&self, path: &str) -> ActionResult {
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => return ActionResult::fail(e),
        };
        let url = format!("{}{path}", self.base_url);
        match client.get(&url).basic_auth("admin", Some(&self.password)).send() {
            Ok(response) if response.status().is_success() => {
                let data = response.json::<Value>().unwrap_or(Value::Null);
                ActionResult::ok_with(format!("GET {path} ok"), data)
            }
            Ok(response) => ActionResult::fail(format!("GET {path}: HTTP {}", response.status())),
            Err(e) => ActionResult::fail(format!("GET {path}: {e}")),
        }
    }

    fn post(&self, path: &str, body: Option<Value>) -> ActionResult {
        let client = match self.client() {
            Ok(client) => client,
            Err(e) => return ActionResult::fail(e),
        };
        let url = format!("{}{path}", self.base_url);
        let mut request = client.post(&url).basic_auth("admin", Some(&self.password));
        if let Some(body) = body {
            request = request.json(&body);
        }
        match request.send() {
            Ok(response) if response.status().is_success() => {
                ActionResult::ok(format!("POST {path} ok"))
            }
            Ok(response) => ActionResult::fail(format!("POST {path}: HTTP {}", response.status())),
            Err(e) => ActionResult::fail(format!("POST {path}: {e}")),
        }
    }
}

#[cfg(test)]
#[path = "palworld_tests.rs"]
mod tests;
