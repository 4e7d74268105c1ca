// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build aggregate and the update fold.
//!
//! [`Build::apply`] folds one update at a time, in the order received, and
//! returns the generated updates it derived along the way. Feeding the
//! persisted (non-generated) subsequence of a stream through the same fold
//! rebuilds the identical aggregate and re-derives every generated update.
//! Folding the full stream, derived updates included, agrees as well.

use crate::id::BuildId;
use crate::job::Job;
use crate::state::{State, StateValue};
use crate::update::{BuildSource, BuildState, Enqueued, JobCreated, Scope, Update, UpdateError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from applying an update to a build or job.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("update for unknown job {job:?}")]
    UnknownJob { job: String },

    #[error("job {job:?} already finished with {state}")]
    JobFinished { job: String, state: StateValue },

    #[error("build {build} already finished with {state}")]
    BuildFinished { build: BuildId, state: StateValue },

    #[error(
        "output item {item:?} of job {job:?} needs {size} bytes, only {remaining} remaining"
    )]
    OutputQuotaExceeded { job: String, item: String, size: u64, remaining: u64 },

    #[error("build {build} has no source and cannot be enqueued")]
    NotBuildable { build: BuildId },

    #[error(transparent)]
    Invalid(#[from] UpdateError),
}

impl ApplyError {
    /// The update targeted something already finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplyError::JobFinished { .. } | ApplyError::BuildFinished { .. })
    }
}

/// Derive the build state from its job states.
///
/// Pending while any job is pending; otherwise the worst outcome wins
/// (error over failure over success). A build without jobs is pending.
pub fn derive_state(jobs: impl IntoIterator<Item = StateValue>) -> StateValue {
    let mut any = false;
    let mut failed = false;
    let mut errored = false;
    for state in jobs {
        any = true;
        match state {
            StateValue::Pending => return StateValue::Pending,
            StateValue::Error => errored = true,
            StateValue::Failure => failed = true,
            StateValue::Success => {}
        }
    }
    if !any {
        StateValue::Pending
    } else if errored {
        StateValue::Error
    } else if failed {
        StateValue::Failure
    } else {
        StateValue::Success
    }
}

/// Folded state of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    /// Derived build state; `None` until the first job appears.
    pub state: Option<State>,
    /// Jobs in order of first appearance.
    pub jobs: IndexMap<String, Job>,
    pub sources: Vec<BuildSource>,
    pub enqueued: bool,
    /// Output quota each new job starts with.
    pub max_output_size: u64,
}

impl Build {
    pub fn new(id: impl Into<BuildId>, max_output_size: u64) -> Self {
        Self {
            id: id.into(),
            state: None,
            jobs: IndexMap::new(),
            sources: Vec::new(),
            enqueued: false,
            max_output_size,
        }
    }

    pub fn state_value(&self) -> StateValue {
        self.state.as_ref().map_or(StateValue::Pending, |s| s.state)
    }

    pub fn is_finished(&self) -> bool {
        self.state_value().is_finished()
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    /// A build can run once it knows where to clone from.
    pub fn is_buildable(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Mark the build as accepted by a queue.
    ///
    /// Returns the `Enqueued` update to broadcast. It is generated: replay
    /// derives it again from the first job appearing in the log.
    pub fn enqueue(&mut self, queue: impl Into<String>) -> Result<Update, ApplyError> {
        if !self.is_buildable() {
            return Err(ApplyError::NotBuildable { build: self.id.clone() });
        }
        let update = Update::Enqueued(Enqueued::new(Some(queue.into())));
        self.apply(&update)?;
        Ok(update)
    }

    /// Fold one update into the build.
    ///
    /// On success returns the generated updates derived from it, in the
    /// order they took effect. On error the build is unchanged.
    pub fn apply(&mut self, update: &Update) -> Result<Vec<Update>, ApplyError> {
        if self.already_holds(update) {
            return Ok(Vec::new());
        }
        if self.is_finished() {
            return Err(ApplyError::BuildFinished {
                build: self.id.clone(),
                state: self.state_value(),
            });
        }

        match update.scope() {
            Scope::Build => {
                self.apply_build_update(update);
                Ok(Vec::new())
            }
            Scope::Job(name) => self.apply_job_update(name, update),
        }
    }

    /// A derived update this build has already taken effect from, as when a
    /// mirror folds the full published stream rather than just the inputs.
    fn already_holds(&self, update: &Update) -> bool {
        match update {
            Update::BuildState(u) => self.state.as_ref() == Some(&u.state),
            Update::JobState(u) => self
                .job(&u.job_name)
                .is_some_and(|job| job.aborted && job.state.as_ref() == Some(&u.state)),
            _ => false,
        }
    }

    fn apply_build_update(&mut self, update: &Update) {
        match update {
            Update::BuildSource(source) => {
                if !self.sources.contains(source) {
                    self.sources.push(source.clone());
                }
            }
            Update::Enqueued(_) => self.enqueued = true,
            // BuildState is derived by the fold, never taken as input.
            _ => {}
        }
    }

    fn apply_job_update(&mut self, name: &str, update: &Update) -> Result<Vec<Update>, ApplyError> {
        let mut derived = Vec::new();

        if !self.jobs.contains_key(name) {
            match update {
                Update::JobState(_) => derived.extend(self.create_job(name)?),
                Update::JobCreated(_) => {
                    derived.extend(self.create_job(name)?);
                    derived.retain(|u| !matches!(u, Update::JobCreated(_)));
                }
                _ => return Err(ApplyError::UnknownJob { job: name.to_string() }),
            }
        } else if matches!(update, Update::JobCreated(_)) {
            return Ok(derived);
        }

        let job = self
            .jobs
            .get_mut(name)
            .ok_or_else(|| ApplyError::UnknownJob { job: name.to_string() })?;
        if let Some(implied) = job.apply(update)? {
            derived.push(implied);
        }

        let time = update.time().or_else(|| derived.iter().find_map(Update::time));
        derived.extend(self.refresh_state(time));
        Ok(derived)
    }

    fn create_job(&mut self, name: &str) -> Result<Vec<Update>, ApplyError> {
        let mut derived = vec![Update::JobCreated(JobCreated::new(self.id.clone(), name)?)];
        self.jobs.insert(name.to_string(), Job::new(name, self.max_output_size));
        if !self.enqueued {
            self.enqueued = true;
            derived.push(Update::Enqueued(Enqueued::default()));
        }
        Ok(derived)
    }

    /// Recompute the derived build state; returns a `BuildState` if it changed.
    fn refresh_state(&mut self, time: Option<f64>) -> Option<Update> {
        let value = derive_state(self.jobs.values().map(Job::state_value));
        let text = self.describe(value);
        if let Some(current) = &self.state {
            if current.state == value && current.text == text {
                return None;
            }
        }

        let time = time.or_else(|| self.state.as_ref().map(|s| s.time)).unwrap_or_default();
        let state = State { state: value, text, time };
        self.state = Some(state.clone());
        Some(Update::BuildState(BuildState::new(state)))
    }

    fn describe(&self, value: StateValue) -> String {
        let total = self.jobs.len();
        let count = |v: StateValue| self.jobs.values().filter(|j| j.state_value() == v).count();
        match value {
            StateValue::Pending => {
                let finished = self.jobs.values().filter(|j| j.is_finished()).count();
                format!("{finished}/{total} jobs finished")
            }
            StateValue::Success => format!("all {total} jobs succeeded"),
            StateValue::Failure => format!("{}/{total} jobs failed", count(StateValue::Failure)),
            StateValue::Error => format!("{}/{total} jobs errored", count(StateValue::Error)),
        }
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
