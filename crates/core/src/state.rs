// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build/job/step status values.

use crate::clock::{Clock, SystemClock};
use crate::update::validate;
use crate::update::UpdateError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a build, job, or step.
///
/// `Pending` is the only non-terminal value; everything else is a finish
/// state and admits no further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateValue {
    Pending,
    Success,
    Failure,
    Error,
}

impl StateValue {
    pub const ALL: [StateValue; 4] =
        [StateValue::Pending, StateValue::Success, StateValue::Failure, StateValue::Error];

    /// The build/job is no longer running.
    pub fn is_finished(self) -> bool {
        !matches!(self, StateValue::Pending)
    }

    pub fn is_succeeded(self) -> bool {
        matches!(self, StateValue::Success)
    }

    pub fn is_errored(self) -> bool {
        matches!(self, StateValue::Error)
    }
}

crate::simple_display! {
    StateValue {
        Pending => "pending",
        Success => "success",
        Failure => "failure",
        Error => "error",
    }
}

impl FromStr for StateValue {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StateValue::Pending),
            "success" => Ok(StateValue::Success),
            "failure" => Ok(StateValue::Failure),
            "error" => Ok(StateValue::Error),
            other => Err(UpdateError::IllegalState(other.to_string())),
        }
    }
}

/// Current epoch seconds from the system clock.
///
/// Default for `time` fields that are absent from a serialized record.
pub(crate) fn now_secs() -> f64 {
    SystemClock.epoch_secs()
}

/// A status value with a human-readable description and the time it was
/// reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub state: StateValue,
    pub text: String,
    #[serde(default = "now_secs")]
    pub time: f64,
}

impl State {
    /// Create a state stamped with the current wall-clock time.
    pub fn new(state: StateValue, text: impl Into<String>) -> Result<Self, UpdateError> {
        Self::with_time(state, text, now_secs())
    }

    pub fn with_time(
        state: StateValue,
        text: impl Into<String>,
        time: f64,
    ) -> Result<Self, UpdateError> {
        let s = Self { state, text: text.into(), time };
        s.validate()?;
        Ok(s)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        validate::printable("State.text", &self.text)?;
        validate::time("State.time", self.time)
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn is_succeeded(&self) -> bool {
        self.state.is_succeeded()
    }

    pub fn is_errored(&self) -> bool {
        self.state.is_errored()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
