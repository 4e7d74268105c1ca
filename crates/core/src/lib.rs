// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-core: update model and build/job aggregates for the kiln CI engine

pub mod macros;

pub mod build;
pub mod clock;
pub mod id;
pub mod job;
pub mod state;
pub mod update;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use build::{derive_state, ApplyError, Build};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{short, BuildId};
pub use job::{Job, ABORTED_TEXT};
pub use state::{State, StateValue};
pub use update::{
    BuildSource, BuildState, Enqueued, JobAbort, JobCreated, JobState, OutputItem, StdOut,
    StepState, Update, UpdateError, UpdateKind, TAG_KEY,
};
