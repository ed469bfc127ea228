// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::io::Write;

fn clear_env() {
    for var in [
        "USHER_BASE_URL",
        "USHER_WORKSPACE",
        "USHER_POLL_INTERVAL_MS",
        "USHER_RECONNECT_MS",
        "USHER_STATE_PATH",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_match_the_fixed_cadences() {
    clear_env();
    let config = Config::load_or_default(None).unwrap();
    assert_eq!(config.poll_interval(), Duration::from_millis(5_000));
    assert_eq!(config.reconnect_delay(), Duration::from_millis(1_500));
    assert_eq!(config.mode, "auto");
    assert!(config.workspace.is_none());
}

#[test]
#[serial]
fn loads_toml_file() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "base_url = \"http://backend:9000\"\nworkspace = \"/home/me/project\"\npoll_interval_ms = 250"
    )
    .unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.base_url, "http://backend:9000");
    assert_eq!(config.workspace.as_deref(), Some("/home/me/project"));
    assert_eq!(config.poll_interval_ms, 250);
    // Unspecified fields keep their defaults.
    assert_eq!(config.reconnect_delay_ms, 1_500);
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "base_url = \"http://from-file:1\"").unwrap();
    std::env::set_var("USHER_BASE_URL", "http://from-env:2");
    std::env::set_var("USHER_RECONNECT_MS", "100");
    let config = Config::load(file.path()).unwrap();
    clear_env();
    assert_eq!(config.base_url, "http://from-env:2");
    assert_eq!(config.reconnect_delay_ms, 100);
}

#[test]
#[serial]
fn invalid_numeric_env_is_ignored() {
    clear_env();
    std::env::set_var("USHER_POLL_INTERVAL_MS", "not-a-number");
    let config = Config::load_or_default(None).unwrap();
    clear_env();
    assert_eq!(config.poll_interval_ms, 5_000);
}

#[test]
#[serial]
fn malformed_toml_is_a_parse_error() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "base_url = [broken").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(Some(&dir.path().join("nope.toml"))).unwrap();
    assert_eq!(config, {
        let mut default = Config::default();
        default.apply_env();
        default
    });
}
