// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_core::test_support::updates;
use kiln_core::{StateValue, UpdateKind};
use tempfile::tempdir;

const QUOTA: u64 = 1024;

fn inputs() -> Vec<Update> {
    vec![
        Update::BuildSource(updates::source("https://example.com/repo.git")),
        updates::job_state("linux", StateValue::Pending, "waiting", 1.0),
        updates::job_state("mac", StateValue::Pending, "waiting", 1.0),
        updates::step("linux", "build", StateValue::Pending, 2.0),
        updates::output("linux", "binary", 512),
        updates::step("linux", "build", StateValue::Success, 3.0),
        updates::job_state("linux", StateValue::Success, "done", 4.0),
        updates::job_state("mac", StateValue::Error, "vm crashed", 5.0),
    ]
}

#[test]
fn replay_matches_live_fold() {
    let dir = tempdir().unwrap();
    let mut log = UpdateLog::open(&dir.path().join("build.log")).unwrap();

    let mut live = Build::new("c0ffee", QUOTA);
    let mut live_history = Vec::new();
    for update in inputs() {
        let derived = live.apply(&update).unwrap();
        log.append(&update).unwrap();
        live_history.push(update);
        live_history.extend(derived);
    }

    let replayed = replay(&mut log, Build::new("c0ffee", QUOTA)).unwrap();

    similar_asserts::assert_eq!(replayed.build, live);
    similar_asserts::assert_eq!(replayed.history, live_history);
    assert_eq!(replayed.build.state_value(), StateValue::Error);
}

#[test]
fn replay_rederives_generated_updates() {
    let dir = tempdir().unwrap();
    let mut log = UpdateLog::open(&dir.path().join("build.log")).unwrap();
    for update in inputs() {
        log.append(&update).unwrap();
    }

    let replayed = replay(&mut log, Build::new("c0ffee", QUOTA)).unwrap();

    let generated: Vec<_> =
        replayed.history.iter().filter(|u| u.is_generated()).map(Update::kind).collect();
    assert_eq!(generated.iter().filter(|k| **k == UpdateKind::JobCreated).count(), 2);
    assert_eq!(generated.iter().filter(|k| **k == UpdateKind::Enqueued).count(), 1);
    assert_eq!(replayed.history.last().map(Update::kind), Some(UpdateKind::BuildState));
}

#[test]
fn empty_log_replays_to_fresh_build() {
    let dir = tempdir().unwrap();
    let mut log = UpdateLog::open(&dir.path().join("build.log")).unwrap();

    let replayed = replay(&mut log, Build::new("c0ffee", QUOTA)).unwrap();

    assert_eq!(replayed.build, Build::new("c0ffee", QUOTA));
    assert!(replayed.history.is_empty());
}

#[test]
fn record_rejected_by_fold_fails_replay() {
    let dir = tempdir().unwrap();
    let mut log = UpdateLog::open(&dir.path().join("build.log")).unwrap();
    log.append(&updates::job_state("linux", StateValue::Success, "", 1.0)).unwrap();
    log.append(&updates::stdout("linux", "too late")).unwrap();

    match replay(&mut log, Build::new("c0ffee", QUOTA)) {
        Err(LogError::Replay { seq, .. }) => assert_eq!(seq, 2),
        other => panic!("expected Replay error, got {other:?}"),
    }
}
