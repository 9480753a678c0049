// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source RCON plug-in.
//!
//! Speaks the Source RCON protocol over TCP: authenticate with the
//! configured password, send one command per connection, read the
//! response. Connections are per-call and bounded by a 5 s I/O budget.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use warden_core::ProgramId;

use super::{
    config_str, config_u16, ActionDescriptor, ActionResult, ConfigField, FieldKind, ParamField,
    Plugin, PluginDescriptor, PluginError,
};

const IO_BUDGET: Duration = Duration::from_secs(5);

const PACKET_AUTH: i32 = 3;
const PACKET_EXEC: i32 = 2;

pub(super) fn descriptor() -> PluginDescriptor {
    PluginDescriptor {
        id: "rcon".into(),
        name: "RCON Controller".into(),
        description: "Sends RCON commands to game servers speaking the Source RCON protocol.".into(),
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
                title: "RCON port".into(),
                kind: FieldKind::Integer { min: Some(1), max: Some(65535) },
                required: false,
                default: Some(json!(25575)),
            },
            ConfigField {
                name: "password".into(),
                title: "RCON password".into(),
                kind: FieldKind::String { format: Some("password".into()) },
                required: true,
                default: None,
            },
            ConfigField {
                name: "shutdown_command".into(),
                title: "Shutdown command".into(),
                kind: FieldKind::String { format: None },
                required: false,
                default: Some(json!("stop")),
            },
        ],
        actions: vec![
            ActionDescriptor {
                name: "send_command".into(),
                title: "Run command".into(),
                description: "Executes an RCON command and returns the server response.".into(),
                params: vec![ParamField {
                    name: "command".into(),
                    title: "Command".into(),
                    kind: FieldKind::String { format: None },
                    required: true,
                }],
            },
            ActionDescriptor {
                name: "shutdown_server".into(),
                title: "Shut down server".into(),
                description: "Sends the configured shutdown command for a polite stop.".into(),
                params: vec![],
            },
        ],
    }
}

pub(super) fn build(
    program_id: ProgramId,
    config: &Value,
) -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(RconPlugin {
        program_id,
        host: config_str(config, "host", "localhost"),
        port: config_u16(config, "port", 25575),
        password: config_str(config, "password", ""),
        shutdown_command: config_str(config, "shutdown_command", "stop"),
    }))
}

struct RconPlugin {
    program_id: ProgramId,
    host: String,
    port: u16,
    password: String,
    shutdown_command: String,
}

impl Plugin for RconPlugin {
    fn descriptor(&self) -> PluginDescriptor {
        descriptor()
    }

    fn validate(&self, config: &Value) -> Result<(), String> {
        let password = config.get("password").and_then(Value::as_str).unwrap_or("");
        if password.is_empty() {
            return Err("password is required".to_string());
        }
        if let Some(port) = config.get("port").and_then(Value::as_i64) {
            if u16::try_from(port).is_err() || port == 0 {
                return Err(format!("port out of range: {port}"));
            }
        }
        Ok(())
    }

    fn execute(&self, action: &str, params: &Value) -> ActionResult {
        let command = match action {
            "send_command" => {
                match params.get("command").and_then(Value::as_str) {
                    Some(command) if !command.is_empty() => command.to_string(),
                    _ => return ActionResult::fail("missing required param: command"),
                }
            }
            "shutdown_server" => self.shutdown_command.clone(),
            other => return ActionResult::fail(format!("unknown action: {other}")),
        };

        match self.run_command(&command) {
            Ok(response) => ActionResult::ok_with(
                format!("command '{command}' executed"),
                json!({ "response": response }),
            ),
            Err(e) => ActionResult::fail(e),
        }
    }

    fn on_program_stop(&self, pid: u32) {
        debug!(program = self.program_id, pid, "rcon target stopped");
    }
}

impl RconPlugin {
    fn run_command(&self, command: &str) -> Result<String, String> {
        let mut stream = self.connect()?;

        write_packet(&mut stream, 1, PACKET_AUTH, &self.password)?;
        let auth = read_auth_response(&mut stream)?;
        if auth == -1 {
            return Err("authentication rejected".to_string());
        }

        write_packet(&mut stream, 2, PACKET_EXEC, command)?;
        let (_, body) = read_packet(&mut stream)?;
        Ok(body)
    }

    fn connect(&self) -> Result<TcpStream, String> {
        let address = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| format!("resolve {}:{}: {e}", self.host, self.port))?
            .next()
            .ok_or_else(|| format!("no address for {}:{}", self.host, self.port))?;

        let stream = TcpStream::connect_timeout(&address, IO_BUDGET)
            .map_err(|e| format!("connect {address}: {e}"))?;
        stream.set_read_timeout(Some(IO_BUDGET)).map_err(|e| e.to_string())?;
        stream.set_write_timeout(Some(IO_BUDGET)).map_err(|e| e.to_string())?;
        Ok(stream)
    }
}

/// Encode one RCON packet: length, request id, type, body, two nulls.
/// All integers little-endian.
fn write_packet(stream: &mut impl Write, id: i32, kind: i32, body: &str) -> Result<(), String> {
    let length = (4 + 4 + body.len() + 2) as i32;
    let mut packet = Vec::with_capacity(length as usize + 4);
    packet.extend_from_slice(&length.to_le_bytes());
    packet.extend_from_slice(&id.to_le_bytes());
    packet.extend_from_slice(&kind.to_le_bytes());
    packet.extend_from_slice(body.as_bytes());
    packet.extend_from_slice(&[0, 0]);
    stream.write_all(&packet).map_err(|e| format!("send: {e}"))
}

/// Read one packet, returning `(request id, body)`.
fn read_packet(stream: &mut impl Read) -> Result<(i32, String), String> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).map_err(|e| format!("recv: {e}"))?;
    let length = i32::from_le_bytes(header);
    if !(10..=4106).contains(&length) {
        return Err(format!("bad packet length: {length}"));
    }

    let mut payload = vec![0u8; length as usize];
    stream.read_exact(&mut payload).map_err(|e| format!("recv: {e}"))?;

    let id = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let body_bytes = &payload[8..payload.len().saturating_sub(2)];
    Ok((id, String::from_utf8_lossy(body_bytes).into_owned()))
}

/// The auth reply is a type-2 packet whose id echoes ours, or -1 on
/// rejection. Some servers emit an empty response-value packet first.
fn read_auth_response(stream: &mut impl Read) -> Result<i32, String> {
    for _ in 0..2 {
        let (id, _) = read_packet(stream)?;
        if id == -1 || id == 1 {
            return Ok(id);
        }
    }
    Err("no auth response".to_string())
}

#[cfg(test)]
#[path = "rcon_tests.rs"]
mod tests;
