// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn data_dir_prefers_env_override() {
    std::env::set_var("WARDEN_DATA_DIR", "/tmp/warden-test");
    assert_eq!(data_dir(), PathBuf::from("/tmp/warden-test"));
    std::env::remove_var("WARDEN_DATA_DIR");
}

#[test]
#[serial]
fn environment_defaults_to_development() {
    std::env::remove_var("WARDEN_ENV");
    assert_eq!(environment(), crate::Environment::Development);

    std::env::set_var("WARDEN_ENV", "production");
    assert_eq!(environment(), crate::Environment::Production);

    std::env::set_var("WARDEN_ENV", "staging");
    assert_eq!(environment(), crate::Environment::Development);
    std::env::remove_var("WARDEN_ENV");
}

#[test]
#[serial]
fn intervals_parse_with_defaults() {
    std::env::remove_var("WARDEN_CHECK_INTERVAL_MS");
    assert_eq!(check_interval(), Duration::from_secs(1));

    std::env::set_var("WARDEN_CHECK_INTERVAL_MS", "2500");
    assert_eq!(check_interval(), Duration::from_millis(2500));

    std::env::set_var("WARDEN_CHECK_INTERVAL_MS", "not-a-number");
    assert_eq!(check_interval(), Duration::from_secs(1));
    std::env::remove_var("WARDEN_CHECK_INTERVAL_MS");
}

#[test]
#[serial]
fn retention_defaults_match_policy() {
    std::env::remove_var("WARDEN_METRIC_RETENTION_DAYS");
    std::env::remove_var("WARDEN_EVENT_RETENTION_DAYS");
    assert_eq!(metric_retention_days(), 30);
    assert_eq!(event_retention_days(), 90);
}
