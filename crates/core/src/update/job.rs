// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-scoped update payloads

use super::{validate, UpdateError};
use crate::id::BuildId;
use crate::state::{now_secs, State, StateValue};
use serde::{Deserialize, Serialize};

/// Job specific state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub job_name: String,
    #[serde(flatten)]
    pub state: State,
}

impl JobState {
    /// Create a job state stamped with the current wall-clock time.
    pub fn new(
        job_name: impl Into<String>,
        state: StateValue,
        text: impl Into<String>,
    ) -> Result<Self, UpdateError> {
        Self::with_time(job_name, state, text, now_secs())
    }

    pub fn with_time(
        job_name: impl Into<String>,
        state: StateValue,
        text: impl Into<String>,
        time: f64,
    ) -> Result<Self, UpdateError> {
        let update = Self { job_name: job_name.into(), state: State::with_time(state, text, time)? };
        validate::job_name(&update.job_name)?;
        Ok(update)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        validate::job_name(&self.job_name)?;
        self.state.validate()
    }
}

/// A job appeared in a build. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCreated {
    pub build_id: BuildId,
    pub job_name: String,
}

impl JobCreated {
    pub fn new(build_id: BuildId, job_name: impl Into<String>) -> Result<Self, UpdateError> {
        let update = Self { build_id, job_name: job_name.into() };
        update.validate()?;
        Ok(update)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        validate::job_name(&self.job_name)
    }
}

/// Request that a job stop now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAbort {
    pub job_name: String,
    #[serde(default = "now_secs")]
    pub time: f64,
}

impl JobAbort {
    pub fn new(job_name: impl Into<String>) -> Result<Self, UpdateError> {
        Self::with_time(job_name, now_secs())
    }

    pub fn with_time(job_name: impl Into<String>, time: f64) -> Result<Self, UpdateError> {
        let update = Self { job_name: job_name.into(), time };
        update.validate()?;
        Ok(update)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        validate::job_name(&self.job_name)?;
        validate::time("JobAbort.time", self.time)
    }
}

/// State change of a single step within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    pub job_name: String,
    pub step_name: String,
    pub state: StateValue,
    pub text: String,
    #[serde(default = "now_secs")]
    pub time: f64,
    /// Position of the step within its job, assigned when the update is
    /// applied. Never serialized.
    #[serde(skip)]
    pub step_number: Option<u32>,
}

impl StepState {
    pub fn new(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        state: StateValue,
        text: impl Into<String>,
    ) -> Result<Self, UpdateError> {
        Self::with_time(job_name, step_name, state, text, now_secs())
    }

    pub fn with_time(
        job_name: impl Into<String>,
        step_name: impl Into<String>,
        state: StateValue,
        text: impl Into<String>,
        time: f64,
    ) -> Result<Self, UpdateError> {
        let update = Self {
            job_name: job_name.into(),
            step_name: step_name.into(),
            state,
            text: text.into(),
            time,
            step_number: None,
        };
        update.validate()?;
        Ok(update)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        validate::job_name(&self.job_name)?;
        validate::step_name(&self.step_name)?;
        validate::printable("StepState.text", &self.text)?;
        validate::time("StepState.time", self.time)
    }
}

/// The job produced an output file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputItem {
    pub job_name: String,
    pub name: String,
    pub isdir: bool,
    #[serde(default)]
    pub size: u64,
}

impl OutputItem {
    pub fn new(
        job_name: impl Into<String>,
        name: impl Into<String>,
        isdir: bool,
        size: u64,
    ) -> Result<Self, UpdateError> {
        let update = Self { job_name: job_name.into(), name: name.into(), isdir, size };
        update.validate()?;
        Ok(update)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        validate::job_name(&self.job_name)?;
        validate::output_name(&self.name)
    }

    /// Check that a `/`-separated relative path lies inside this item.
    pub fn validate_path(&self, path: &str) -> Result<(), UpdateError> {
        let mut components = path.split('/');
        if components.next() != Some(self.name.as_str()) {
            return Err(UpdateError::InvalidOutputPath {
                path: path.to_string(),
                reason: "not inside the output item",
            });
        }
        for component in components {
            if !validate::is_printable(component) {
                return Err(UpdateError::InvalidOutputPath {
                    path: path.to_string(),
                    reason: "non-printable characters",
                });
            }
            if component == "." || component == ".." {
                return Err(UpdateError::InvalidOutputPath {
                    path: path.to_string(),
                    reason: "relative path component",
                });
            }
        }
        Ok(())
    }
}

/// The job's process wrote to its terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdOut {
    pub job_name: String,
    pub data: String,
}

impl StdOut {
    pub fn new(job_name: impl Into<String>, data: impl Into<String>) -> Result<Self, UpdateError> {
        let update = Self { job_name: job_name.into(), data: data.into() };
        update.validate()?;
        Ok(update)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        validate::job_name(&self.job_name)
    }
}
