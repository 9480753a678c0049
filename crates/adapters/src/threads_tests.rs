// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn set_get_remove_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let bindings = ThreadBindings::new(dir.path().join("webhook_threads.json"));

    assert_eq!(bindings.get("p"), None);
    bindings.set("p", "12345");
    assert_eq!(bindings.get("p"), Some("12345".to_string()));

    bindings.remove("p");
    assert_eq!(bindings.get("p"), None);
}

#[test]
fn bindings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("webhook_threads.json");

    ThreadBindings::new(path.clone()).set("srv", "t-1");
    let reopened = ThreadBindings::new(path);
    assert_eq!(reopened.get("srv"), Some("t-1".to_string()));
}

#[test]
fn corrupt_file_is_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("webhook_threads.json");
    std::fs::write(&path, "not-json").unwrap();

    let bindings = ThreadBindings::new(path);
    assert_eq!(bindings.get("p"), None);
    bindings.set("p", "1");
    assert_eq!(bindings.get("p"), Some("1".to_string()));
}
