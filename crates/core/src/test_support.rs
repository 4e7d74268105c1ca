// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for updates.
pub mod strategies {
    use crate::id::BuildId;
    use crate::state::{State, StateValue};
    use crate::update::{
        BuildSource, BuildState, Enqueued, JobAbort, JobCreated, JobState, OutputItem, StdOut,
        StepState, Update,
    };
    use proptest::prelude::*;

    pub fn arb_state_value() -> impl Strategy<Value = StateValue> {
        prop_oneof![
            Just(StateValue::Pending),
            Just(StateValue::Success),
            Just(StateValue::Failure),
            Just(StateValue::Error),
        ]
    }

    fn arb_job_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,12}"
    }

    fn arb_text() -> impl Strategy<Value = String> {
        "[ -~]{0,40}"
    }

    fn arb_time() -> impl Strategy<Value = f64> {
        0.0f64..4_000_000_000.0
    }

    fn arb_state() -> impl Strategy<Value = State> {
        (arb_state_value(), arb_text(), arb_time())
            .prop_map(|(state, text, time)| State { state, text, time })
    }

    pub fn arb_update() -> impl Strategy<Value = Update> {
        prop_oneof![
            (arb_text(), arb_text(), arb_text(), arb_text(), arb_text()).prop_map(
                |(url, repo_url, author, branch, comment)| {
                    Update::BuildSource(BuildSource {
                        clone_url: format!("https://{url}"),
                        repo_url,
                        author,
                        branch,
                        comment,
                    })
                }
            ),
            arb_state().prop_map(|state| Update::BuildState(BuildState { state })),
            (arb_job_name(), arb_state())
                .prop_map(|(job_name, state)| Update::JobState(JobState { job_name, state })),
            ("[0-9a-f]{40}", arb_job_name()).prop_map(|(sha, job_name)| {
                Update::JobCreated(JobCreated { build_id: BuildId::from(sha), job_name })
            }),
            (arb_job_name(), arb_time())
                .prop_map(|(job_name, time)| Update::JobAbort(JobAbort { job_name, time })),
            (arb_job_name(), "[a-z_][a-z0-9_]{0,10}", arb_state_value(), arb_text(), arb_time())
                .prop_map(|(job_name, step_name, state, text, time)| {
                    Update::StepState(StepState {
                        job_name,
                        step_name,
                        state,
                        text,
                        time,
                        step_number: None,
                    })
                }),
            (arb_job_name(), "[a-zA-Z][a-zA-Z0-9._-]{0,12}", any::<bool>(), any::<u64>()).prop_map(
                |(job_name, name, isdir, size)| {
                    Update::OutputItem(OutputItem { job_name, name, isdir, size })
                }
            ),
            (arb_job_name(), any::<String>())
                .prop_map(|(job_name, data)| Update::StdOut(StdOut { job_name, data })),
            Just(Update::Enqueued(Enqueued::default())),
        ]
    }
}

// ── Update factory functions ────────────────────────────────────────────────

/// Terse constructors for well-formed updates with fixed timestamps.
pub mod updates {
    use crate::state::StateValue;
    use crate::update::{BuildSource, JobAbort, JobState, OutputItem, StdOut, StepState, Update};

    pub fn source(clone_url: &str) -> BuildSource {
        BuildSource {
            clone_url: clone_url.to_string(),
            repo_url: clone_url.trim_end_matches(".git").to_string(),
            author: "rolf".to_string(),
            branch: "feature".to_string(),
            comment: "pull request #1".to_string(),
        }
    }

    pub fn job_state(job: &str, state: StateValue, text: &str, time: f64) -> Update {
        Update::JobState(JobState {
            job_name: job.to_string(),
            state: crate::state::State { state, text: text.to_string(), time },
        })
    }

    pub fn step(job: &str, step: &str, state: StateValue, time: f64) -> Update {
        Update::StepState(StepState {
            job_name: job.to_string(),
            step_name: step.to_string(),
            state,
            text: format!("{step} {state}"),
            time,
            step_number: None,
        })
    }

    pub fn output(job: &str, name: &str, size: u64) -> Update {
        Update::OutputItem(OutputItem {
            job_name: job.to_string(),
            name: name.to_string(),
            isdir: false,
            size,
        })
    }

    pub fn stdout(job: &str, data: &str) -> Update {
        Update::StdOut(StdOut { job_name: job.to_string(), data: data.to_string() })
    }

    pub fn abort(job: &str, time: f64) -> Update {
        Update::JobAbort(JobAbort { job_name: job.to_string(), time })
    }
}
