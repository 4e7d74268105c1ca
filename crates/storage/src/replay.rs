// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rebuild a build aggregate from its update log.

use crate::log::{LogError, UpdateLog};
use kiln_core::{Build, Update};
use tracing::info;

/// Outcome of replaying a log.
#[derive(Debug, Clone, PartialEq)]
pub struct Replayed {
    pub build: Build,
    /// Persisted updates interleaved with everything they derive, in
    /// application order. This is what live watchers saw.
    pub history: Vec<Update>,
}

/// Fold every persisted update of `log` into `build`.
///
/// Persisted records were accepted when first applied, so a record the fold
/// rejects now means the log and the fold disagree; that fails the replay.
pub fn replay(log: &mut UpdateLog, mut build: Build) -> Result<Replayed, LogError> {
    let entries = log.entries()?;
    let mut history = Vec::with_capacity(entries.len());

    for entry in entries {
        let derived = build.apply(&entry.update).map_err(|e| LogError::Replay {
            path: log.path().to_path_buf(),
            seq: entry.seq,
            reason: e.to_string(),
        })?;
        history.push(entry.update);
        history.extend(derived);
    }

    info!(
        build_id = %build.id,
        records = log.write_seq(),
        state = %build.state_value(),
        "replayed update log"
    );
    Ok(Replayed { build, history })
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
