// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use serde_json::json;
use warden_core::ProgramDraft;

use crate::test_store;

fn seeded() -> (crate::Store, tempfile::TempDir, i64) {
    let (store, dir) = test_store();
    let program = store
        .create_program(
            &ProgramDraft { name: "p".into(), path: PathBuf::from("/bin/p"), ..Default::default() },
            0,
        )
        .unwrap();
    (store, dir, program.id)
}

#[test]
fn upsert_creates_then_updates_in_place() {
    let (store, _dir, id) = seeded();

    let first = store
        .upsert_plugin_binding(id, "rcon", &json!({"port": 25575}), true, 1)
        .unwrap();
    let second = store
        .upsert_plugin_binding(id, "rcon", &json!({"port": 1234}), false, 2)
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.config, json!({"port": 1234}));
    assert!(!second.enabled);
    assert_eq!(store.list_plugin_bindings(Some(id)).unwrap().len(), 1);
}

#[test]
fn list_all_for_rehydration() {
    let (store, _dir, id) = seeded();
    let other = store
        .create_program(
            &ProgramDraft { name: "q".into(), path: PathBuf::from("/bin/q"), ..Default::default() },
            0,
        )
        .unwrap();

    store.upsert_plugin_binding(id, "rcon", &json!({}), true, 1).unwrap();
    store.upsert_plugin_binding(other.id, "palworld", &json!({}), true, 1).unwrap();

    assert_eq!(store.list_plugin_bindings(None).unwrap().len(), 2);
    assert_eq!(store.list_plugin_bindings(Some(other.id)).unwrap().len(), 1);
}

#[test]
fn get_and_delete_binding() {
    let (store, _dir, id) = seeded();
    store.upsert_plugin_binding(id, "rest_api", &json!({"base_url": "http://x"}), true, 1).unwrap();

    let binding = store.get_plugin_binding(id, "rest_api").unwrap().unwrap();
    assert_eq!(binding.config["base_url"], "http://x");

    assert!(store.delete_plugin_binding(id, "rest_api").unwrap());
    assert!(!store.delete_plugin_binding(id, "rest_api").unwrap());
    assert!(store.get_plugin_binding(id, "rest_api").unwrap().is_none());
}

#[test]
fn deleting_program_cascades_bindings() {
    let (store, _dir, id) = seeded();
    store.upsert_plugin_binding(id, "rcon", &json!({}), true, 1).unwrap();

    store.delete_program(id).unwrap();
    assert!(store.list_plugin_bindings(None).unwrap().is_empty());
}

#[test]
fn binding_for_unknown_program_is_conflict() {
    let (store, _dir) = test_store();
    let err = store.upsert_plugin_binding(99, "rcon", &serde_json::json!({}), true, 1).unwrap_err();
    assert!(matches!(err, crate::StoreError::Conflict(_)));
}
