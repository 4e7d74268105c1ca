// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Update types: the immutable facts about build, job, and step progress.
//!
//! Updates are the unit of persistence and replay. Each serializes to a
//! single JSON object carrying its kind under `"class"`:
//!
//! ```json
//! {"class": "StepState", "job_name": "linux", "step_name": "build", ...}
//! ```

mod build;
mod job;
mod registry;
pub(crate) mod validate;

pub use build::{BuildSource, BuildState, Enqueued};
pub use job::{JobAbort, JobCreated, JobState, OutputItem, StdOut, StepState};
pub use registry::{Factory, UpdateKind};

use serde::Serialize;
use thiserror::Error;

/// Key holding the kind tag in a serialized update.
pub const TAG_KEY: &str = "class";

/// Errors from constructing or decoding an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("malformed update record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("update record is not a JSON object")]
    NotAnObject,

    #[error("update record has no \"class\" tag")]
    MissingTag,

    #[error("unknown update kind: {0:?}")]
    UnknownKind(String),

    #[error("illegal state: {0:?}")]
    IllegalState(String),

    #[error("{field} not printable: {value:?}")]
    NotPrintable { field: &'static str, value: String },

    #[error("{field} is not a valid timestamp: {value}")]
    InvalidTime { field: &'static str, value: f64 },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("invalid job name: {0:?}")]
    InvalidJobName(String),

    #[error("StepState.step_name invalid: {0:?}")]
    InvalidStepName(String),

    #[error("output item name {name:?} {reason}")]
    InvalidOutputName { name: String, reason: &'static str },

    #[error("invalid output path {path:?}: {reason}")]
    InvalidOutputPath { path: String, reason: &'static str },
}

/// Which aggregate an update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Build,
    Job(&'a str),
}

/// An immutable, serializable fact about build progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "class")]
pub enum Update {
    BuildSource(BuildSource),
    BuildState(BuildState),
    JobState(JobState),
    JobCreated(JobCreated),
    JobAbort(JobAbort),
    StepState(StepState),
    OutputItem(OutputItem),
    StdOut(StdOut),
    Enqueued(Enqueued),
}

crate::update_kinds!(
    BuildSource,
    BuildState,
    JobState,
    JobCreated,
    JobAbort,
    StepState,
    OutputItem,
    StdOut,
    Enqueued,
);

impl Update {
    pub fn kind(&self) -> UpdateKind {
        match self {
            Update::BuildSource(_) => UpdateKind::BuildSource,
            Update::BuildState(_) => UpdateKind::BuildState,
            Update::JobState(_) => UpdateKind::JobState,
            Update::JobCreated(_) => UpdateKind::JobCreated,
            Update::JobAbort(_) => UpdateKind::JobAbort,
            Update::StepState(_) => UpdateKind::StepState,
            Update::OutputItem(_) => UpdateKind::OutputItem,
            Update::StdOut(_) => UpdateKind::StdOut,
            Update::Enqueued(_) => UpdateKind::Enqueued,
        }
    }

    /// Generated updates are re-derived on replay and must never be persisted.
    pub fn is_generated(&self) -> bool {
        self.kind().is_generated()
    }

    pub fn scope(&self) -> Scope<'_> {
        match self {
            Update::BuildSource(_) | Update::BuildState(_) | Update::Enqueued(_) => Scope::Build,
            Update::JobState(u) => Scope::Job(&u.job_name),
            Update::JobCreated(u) => Scope::Job(&u.job_name),
            Update::JobAbort(u) => Scope::Job(&u.job_name),
            Update::StepState(u) => Scope::Job(&u.job_name),
            Update::OutputItem(u) => Scope::Job(&u.job_name),
            Update::StdOut(u) => Scope::Job(&u.job_name),
        }
    }

    /// Name of the job this update belongs to, if it is job-scoped.
    pub fn job_name(&self) -> Option<&str> {
        match self.scope() {
            Scope::Job(name) => Some(name),
            Scope::Build => None,
        }
    }

    /// Timestamp carried by the update, if its kind has one.
    pub fn time(&self) -> Option<f64> {
        match self {
            Update::BuildState(u) => Some(u.state.time),
            Update::JobState(u) => Some(u.state.time),
            Update::JobAbort(u) => Some(u.time),
            Update::StepState(u) => Some(u.time),
            Update::BuildSource(_)
            | Update::JobCreated(_)
            | Update::OutputItem(_)
            | Update::StdOut(_)
            | Update::Enqueued(_) => None,
        }
    }

    /// Re-run the constructor checks on an already built update.
    pub fn validate(&self) -> Result<(), UpdateError> {
        match self {
            Update::BuildSource(u) => u.validate(),
            Update::BuildState(u) => u.state.validate(),
            Update::JobState(u) => u.validate(),
            Update::JobCreated(u) => u.validate(),
            Update::JobAbort(u) => u.validate(),
            Update::StepState(u) => u.validate(),
            Update::OutputItem(u) => u.validate(),
            Update::StdOut(u) => u.validate(),
            Update::Enqueued(_) => Ok(()),
        }
    }

    /// All non-transient fields, without the kind tag.
    pub fn dump(&self) -> Result<serde_json::Map<String, serde_json::Value>, UpdateError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(mut fields) => {
                fields.remove(TAG_KEY);
                Ok(fields)
            }
            _ => Err(UpdateError::NotAnObject),
        }
    }

    /// Canonical single-line JSON record, tag included.
    pub fn serialize(&self) -> Result<String, UpdateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and validate a serialized update record.
    pub fn construct(record: &str) -> Result<Update, UpdateError> {
        let value: serde_json::Value = serde_json::from_str(record)?;
        Self::from_value(value)
    }

    /// Decode and validate an already parsed update record.
    pub fn from_value(value: serde_json::Value) -> Result<Update, UpdateError> {
        let serde_json::Value::Object(mut fields) = value else {
            return Err(UpdateError::NotAnObject);
        };
        let tag = match fields.remove(TAG_KEY) {
            Some(serde_json::Value::String(tag)) => tag,
            _ => return Err(UpdateError::MissingTag),
        };
        let (_, factory) = registry::lookup(&tag).ok_or(UpdateError::UnknownKind(tag))?;
        let update = factory(serde_json::Value::Object(fields))?;
        update.validate()?;
        Ok(update)
    }
}

impl std::fmt::Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.serialize() {
            Ok(record) => f.write_str(&record),
            Err(_) => write!(f, "<{}>", self.kind()),
        }
    }
}

#[cfg(test)]
#[path = "../update_tests.rs"]
mod tests;
