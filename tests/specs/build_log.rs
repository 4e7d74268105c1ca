// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A build folded live and a build replayed from its log are the same build.

use crate::prelude::*;
use kiln_core::ApplyError;
use kiln_storage::{replay, UpdateLog};
use similar_asserts::assert_eq;

const QUOTA: u64 = 1000;

fn inputs() -> Vec<Update> {
    vec![
        Update::BuildSource(updates::source("https://git.example/kiln.git")),
        updates::job_state("linux", StateValue::Pending, "running", 10.0),
        updates::job_state("bsd", StateValue::Pending, "running", 10.0),
        updates::step("linux", "configure", StateValue::Success, 11.0),
        updates::step("linux", "build", StateValue::Pending, 12.0),
        updates::stdout("linux", "cc -o kiln kiln.c\n"),
        updates::output("linux", "kiln", 400),
        updates::step("linux", "build", StateValue::Success, 13.0),
        updates::abort("bsd", 14.0),
        updates::job_state("linux", StateValue::Success, "done", 15.0),
    ]
}

#[test]
fn replaying_the_log_rebuilds_the_build() {
    let scratch = Scratch::new();
    let path = scratch.log_path("b1");
    let mut live = Build::new("b1", QUOTA);
    let mut seen = Vec::new();
    {
        let mut log = UpdateLog::open(&path).unwrap();
        for update in inputs() {
            let derived = live.apply(&update).unwrap();
            log.append(&update).unwrap();
            seen.push(update);
            seen.extend(derived);
        }
        log.flush().unwrap();
    }

    let mut log = UpdateLog::open(&path).unwrap();
    let replayed = replay(&mut log, Build::new("b1", QUOTA)).unwrap();

    assert_eq!(replayed.build, live);
    assert_eq!(replayed.history, seen);
    assert_eq!(live.state_value(), StateValue::Failure);
    assert_eq!(live.job("linux").unwrap().step("build").unwrap().step_number, Some(2));
    assert_eq!(live.job("linux").unwrap().remaining_output_size, 600);
}

#[test]
fn finished_jobs_and_builds_reject_updates() {
    let mut build = Build::new("b1", QUOTA);
    for update in inputs() {
        build.apply(&update).unwrap();
    }
    let before = build.clone();

    let err = build.apply(&updates::step("bsd", "late", StateValue::Success, 20.0)).unwrap_err();

    assert!(matches!(err, ApplyError::BuildFinished { .. }));
    assert_eq!(build, before);
}

#[test]
fn oversized_output_is_refused() {
    let mut build = Build::new("b1", 50);
    build.apply(&updates::job_state("linux", StateValue::Pending, "running", 1.0)).unwrap();
    let before = build.clone();

    let err = build.apply(&updates::output("linux", "image", 100)).unwrap_err();

    assert!(matches!(err, ApplyError::OutputQuotaExceeded { size: 100, remaining: 50, .. }));
    assert_eq!(build, before);
}
