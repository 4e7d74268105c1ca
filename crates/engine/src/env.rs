// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use crate::error::EngineError;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: KILN_STATE_DIR > XDG_STATE_HOME/kiln > ~/.local/state/kiln
pub fn state_dir() -> Result<PathBuf, EngineError> {
    if let Ok(dir) = std::env::var("KILN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("kiln"));
    }
    let home = std::env::var("HOME").map_err(|_| EngineError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/kiln"))
}

/// Status callback timeout (default 5s, configurable via `KILN_STATUS_TIMEOUT_MS`).
pub fn status_timeout() -> Duration {
    std::env::var("KILN_STATUS_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
