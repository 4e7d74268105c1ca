// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-engine: job runners, build coordination, triggers and status callbacks

pub mod config;
mod coordinator;
mod engine;
pub mod env;
mod error;
pub mod notify;
mod runner;
pub mod trigger;
mod watch;

#[cfg(test)]
mod test_helpers;

pub use config::{ConfigError, EngineConfig};
pub use coordinator::{BuildCoordinator, ABANDONED_TEXT, RESTARTED_TEXT};
pub use engine::Engine;
pub use error::EngineError;
pub use notify::{HttpStatusNotifier, NoopStatusNotifier, NotifyError, Status, StatusNotifier};
pub use runner::{decode_line, JobRunner, RunOutcome};
pub use trigger::{Trigger, TriggerError};
pub use watch::{WatchHub, Watcher};

#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeStatusNotifier;
