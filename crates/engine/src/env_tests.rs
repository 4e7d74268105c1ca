// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn with_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let saved: Vec<_> = vars.iter().map(|(k, _)| (*k, std::env::var(k).ok())).collect();
    for (key, value) in vars {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    let out = f();
    for (key, value) in saved {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    out
}

#[test]
#[serial]
fn state_dir_prefers_kiln_state_dir() {
    let dir = with_env(
        &[("KILN_STATE_DIR", Some("/srv/kiln")), ("XDG_STATE_HOME", Some("/xdg"))],
        state_dir,
    );
    assert_eq!(dir.unwrap(), PathBuf::from("/srv/kiln"));
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    let dir =
        with_env(&[("KILN_STATE_DIR", None), ("XDG_STATE_HOME", Some("/xdg"))], state_dir);
    assert_eq!(dir.unwrap(), PathBuf::from("/xdg/kiln"));
}

#[test]
#[serial]
fn state_dir_falls_back_to_home() {
    let dir = with_env(
        &[("KILN_STATE_DIR", None), ("XDG_STATE_HOME", None), ("HOME", Some("/home/rolf"))],
        state_dir,
    );
    assert_eq!(dir.unwrap(), PathBuf::from("/home/rolf/.local/state/kiln"));
}

#[test]
#[serial]
fn state_dir_without_any_hint_fails() {
    let dir = with_env(
        &[("KILN_STATE_DIR", None), ("XDG_STATE_HOME", None), ("HOME", None)],
        state_dir,
    );
    assert!(matches!(dir, Err(EngineError::NoStateDir)));
}

#[test]
#[serial]
fn status_timeout_reads_env() {
    for (value, expected_ms) in [(None, 5000), (Some("250"), 250), (Some("soon"), 5000)] {
        let timeout = with_env(&[("KILN_STATUS_TIMEOUT_MS", value)], status_timeout);
        assert_eq!(timeout, Duration::from_millis(expected_ms), "{value:?}");
    }
}
