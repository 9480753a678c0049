// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plug-in contract, registry and host.
//!
//! Plug-ins give individual programs protocol-specific control (RCON,
//! Palworld REST, generic HTTP hooks). The contract is deliberately
//! narrow and synchronous: plug-ins are not schedulable entities, and
//! callers with latency budgets wrap `execute` in `spawn_blocking`.
//! Implementations are a registry of typed constructors keyed by plug-in
//! id; config documents stay opaque JSON validated by the plug-in
//! itself.

mod palworld;
mod rcon;
mod rest_api;

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use warden_core::{EpochMs, ProgramId};
use warden_store::{PluginBinding, Store, StoreError};

/// Grace period recorded when a polite shutdown is accepted.
pub const GRACEFUL_SHUTDOWN_SECS: u32 = 30;

/// Plug-in layer errors.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown plugin: {0}")]
    Unknown(String),

    #[error("plugin not bound to program")]
    NotBound,

    #[error("plugin rejected config: {0}")]
    InvalidConfig(String),

    #[error("plugin load failed: {0}")]
    Load(String),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Declarative config/param field types, rendered into forms by the
/// operator UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<Cow<'static, str>>,
    },
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigField {
    pub name: Cow<'static, str>,
    pub title: Cow<'static, str>,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamField {
    pub name: Cow<'static, str>,
    pub title: Cow<'static, str>,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDescriptor {
    pub name: Cow<'static, str>,
    pub title: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub params: Vec<ParamField>,
}

/// What a plug-in declares about itself: identity, config schema and
/// the actions it serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginDescriptor {
    pub id: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub config: Vec<ConfigField>,
    pub actions: Vec<ActionDescriptor>,
}

impl PluginDescriptor {
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|action| action.name == name)
    }
}

/// Result envelope for every plug-in action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: None }
    }

    pub fn ok_with(message: impl Into<String>, data: Value) -> Self {
        Self { success: true, message: message.into(), data: Some(data) }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }
}

/// The plug-in contract.
pub trait Plugin: Send + Sync + 'static {
    fn descriptor(&self) -> PluginDescriptor;

    /// Check a candidate config document against the published schema.
    fn validate(&self, config: &Value) -> Result<(), String>;

    /// Run a named action. Failures are reported in-band via
    /// `success = false`; only transport-level faults use `Err` paths
    /// inside implementations.
    fn execute(&self, action: &str, params: &Value) -> ActionResult;

    fn on_program_start(&self, _pid: u32) {}
    fn on_program_stop(&self, _pid: u32) {}
    fn on_program_crash(&self, _pid: u32) {}
}

type BuildFn = fn(ProgramId, &Value) -> Result<Box<dyn Plugin>, PluginError>;
type DescriptorFn = fn() -> PluginDescriptor;

struct RegistryEntry {
    descriptor: DescriptorFn,
    build: BuildFn,
}

/// Registry of typed plug-in constructors keyed by plug-in id.
pub struct PluginRegistry {
    entries: HashMap<&'static str, RegistryEntry>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    /// The plug-ins shipped with the daemon.
    pub fn built_ins() -> Self {
        let mut registry = Self::empty();
        registry.register("rcon", rcon::descriptor, rcon::build);
        registry.register("palworld", palworld::descriptor, palworld::build);
        registry.register("rest_api", rest_api::descriptor, rest_api::build);
        registry
    }

    pub fn register(&mut self, id: &'static str, descriptor: DescriptorFn, build: BuildFn) {
        self.entries.insert(id, RegistryEntry { descriptor, build });
    }

    pub fn descriptor(&self, id: &str) -> Option<PluginDescriptor> {
        self.entries.get(id).map(|entry| (entry.descriptor)())
    }

    /// All available descriptors, sorted by id.
    pub fn catalog(&self) -> Vec<PluginDescriptor> {
        let mut descriptors: Vec<_> =
            self.entries.values().map(|entry| (entry.descriptor)()).collect();
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        descriptors
    }

    pub fn build(
        &self,
        id: &str,
        program_id: ProgramId,
        config: &Value,
    ) -> Result<Box<dyn Plugin>, PluginError> {
        let entry =
            self.entries.get(id).ok_or_else(|| PluginError::Unknown(id.to_string()))?;
        (entry.build)(program_id, config)
    }
}

/// Owns live plug-in instances and their persisted bindings.
pub struct PluginHost {
    registry: PluginRegistry,
    store: Store,
    instances: Mutex<HashMap<(ProgramId, String), Arc<dyn Plugin>>>,
}

impl PluginHost {
    pub fn new(registry: PluginRegistry, store: Store) -> Self {
        Self { registry, store, instances: Mutex::new(HashMap::new()) }
    }

    /// Instantiate every enabled binding from the store. Bindings whose
    /// plug-in fails to load are skipped, not fatal. Returns the number
    /// of live instances.
    pub fn rehydrate(&self) -> usize {
        let bindings = match self.store.list_plugin_bindings(None) {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(error = %e, "plugin bindings unavailable at boot");
                return 0;
            }
        };

        let mut live = 0;
        for binding in bindings.into_iter().filter(|b| b.enabled) {
            match self.registry.build(&binding.plugin_id, binding.program_id, &binding.config) {
                Ok(instance) => {
                    self.instances
                        .lock()
                        .insert((binding.program_id, binding.plugin_id.clone()), instance.into());
                    live += 1;
                }
                Err(e) => warn!(
                    program = binding.program_id,
                    plugin = %binding.plugin_id,
                    error = %e,
                    "plugin rehydration skipped"
                ),
            }
        }
        info!(instances = live, "plugin host rehydrated");
        live
    }

    pub fn catalog(&self) -> Vec<PluginDescriptor> {
        self.registry.catalog()
    }

    pub fn bindings_for(&self, program_id: ProgramId) -> Result<Vec<PluginBinding>, StoreError> {
        self.store.list_plugin_bindings(Some(program_id))
    }

    /// Validate, persist and (when enabled) instantiate a binding.
    /// Disabling a binding unloads the live instance.
    pub fn bind(
        &self,
        program_id: ProgramId,
        plugin_id: &str,
        config: &Value,
        enabled: bool,
        now_ms: EpochMs,
    ) -> Result<PluginBinding, PluginError> {
        let instance = self.registry.build(plugin_id, program_id, config)?;
        instance.validate(config).map_err(PluginError::InvalidConfig)?;

        let binding =
            self.store.upsert_plugin_binding(program_id, plugin_id, config, enabled, now_ms)?;

        let key = (program_id, plugin_id.to_string());
        if enabled {
            self.instances.lock().insert(key, instance.into());
        } else {
            self.instances.lock().remove(&key);
        }
        Ok(binding)
    }

    pub fn unbind(&self, program_id: ProgramId, plugin_id: &str) -> Result<bool, PluginError> {
        let removed = self.store.delete_plugin_binding(program_id, plugin_id)?;
        self.instances.lock().remove(&(program_id, plugin_id.to_string()));
        Ok(removed)
    }

    /// Drop live instances for a deleted program. The rows cascade with
    /// the program; only the in-memory map needs tending.
    pub fn forget_program(&self, program_id: ProgramId) {
        self.instances.lock().retain(|(id, _), _| *id != program_id);
    }

    pub fn invoke(
        &self,
        program_id: ProgramId,
        plugin_id: &str,
        action: &str,
        params: &Value,
    ) -> Result<ActionResult, PluginError> {
        let instance = self
            .instances
            .lock()
            .get(&(program_id, plugin_id.to_string()))
            .cloned()
            .ok_or(PluginError::NotBound)?;
        Ok(instance.execute(action, params))
    }

    /// Ask a bound plug-in for a polite shutdown. Returns the grace
    /// period to record when one accepts; None means the caller falls
    /// back to forced termination through the process adapter.
    pub fn polite_shutdown(&self, program_id: ProgramId) -> Option<u32> {
        let candidates: Vec<Arc<dyn Plugin>> = self
            .instances
            .lock()
            .iter()
            .filter(|((id, _), _)| *id == program_id)
            .map(|(_, instance)| Arc::clone(instance))
            .collect();

        for instance in candidates {
            let descriptor = instance.descriptor();
            if !descriptor.has_action("shutdown_server") {
                continue;
            }
            let result = instance.execute("shutdown_server", &Value::Null);
            if result.success {
                info!(program = program_id, plugin = %descriptor.id, "polite shutdown accepted");
                return Some(GRACEFUL_SHUTDOWN_SECS);
            }
            warn!(
                program = program_id,
                plugin = %descriptor.id,
                message = %result.message,
                "polite shutdown refused"
            );
        }
        None
    }

    pub(crate) fn on_program_start(&self, program_id: ProgramId, pid: u32) {
        for instance in self.instances_for(program_id) {
            instance.on_program_start(pid);
        }
    }

    pub(crate) fn on_program_stop(&self, program_id: ProgramId, pid: Option<u32>) {
        let Some(pid) = pid else { return };
        for instance in self.instances_for(program_id) {
            instance.on_program_stop(pid);
        }
    }

    pub(crate) fn on_program_crash(&self, program_id: ProgramId, pid: Option<u32>) {
        let Some(pid) = pid else { return };
        for instance in self.instances_for(program_id) {
            instance.on_program_crash(pid);
        }
    }

    fn instances_for(&self, program_id: ProgramId) -> Vec<Arc<dyn Plugin>> {
        self.instances
            .lock()
            .iter()
            .filter(|((id, _), _)| *id == program_id)
            .map(|(_, instance)| Arc::clone(instance))
            .collect()
    }
}

/// Shared helpers for the built-in plug-ins' config parsing.
pub(crate) fn config_str(config: &Value, key: &str, default: &str) -> String {
    config.get(key).and_then(Value::as_str).unwrap_or(default).to_string()
}

pub(crate) fn config_u16(config: &Value, key: &str, default: u16) -> u16 {
    config
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
