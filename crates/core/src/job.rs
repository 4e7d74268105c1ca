// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job aggregate: one execution unit of a build.

use crate::build::ApplyError;
use crate::state::{State, StateValue};
use crate::update::{JobAbort, JobState, OutputItem, StepState, Update};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Text of the job state produced by a [`JobAbort`].
pub const ABORTED_TEXT: &str = "job aborted";

/// Folded state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    /// Latest job state; `None` until the first `JobState` arrives.
    pub state: Option<State>,
    /// Step records, indexed by their step number.
    pub steps: Vec<StepState>,
    step_numbers: HashMap<String, u32>,
    /// Output items by name.
    pub output_items: BTreeMap<String, OutputItem>,
    /// Bytes of output the job may still produce.
    pub remaining_output_size: u64,
    pub aborted: bool,
}

impl Job {
    pub fn new(name: impl Into<String>, max_output_size: u64) -> Self {
        Self {
            name: name.into(),
            state: None,
            steps: Vec::new(),
            step_numbers: HashMap::new(),
            output_items: BTreeMap::new(),
            remaining_output_size: max_output_size,
            aborted: false,
        }
    }

    pub fn state_value(&self) -> StateValue {
        self.state.as_ref().map_or(StateValue::Pending, |s| s.state)
    }

    pub fn is_finished(&self) -> bool {
        self.state_value().is_finished()
    }

    /// Look up a step record by name.
    pub fn step(&self, step_name: &str) -> Option<&StepState> {
        let number = *self.step_numbers.get(step_name)?;
        self.steps.get(number as usize)
    }

    /// Apply a job-scoped update.
    ///
    /// Returns the job state implied by the update, if any (only `JobAbort`
    /// implies one). A finished job rejects every update and stays unchanged.
    pub fn apply(&mut self, update: &Update) -> Result<Option<Update>, ApplyError> {
        if self.is_finished() {
            return Err(ApplyError::JobFinished {
                job: self.name.clone(),
                state: self.state_value(),
            });
        }

        match update {
            Update::JobState(u) => {
                self.state = Some(u.state.clone());
                Ok(None)
            }
            Update::JobAbort(u) => self.abort(u).map(Some),
            Update::StepState(u) => {
                self.step_update(u);
                Ok(None)
            }
            Update::OutputItem(u) => {
                self.add_output_item(u)?;
                Ok(None)
            }
            Update::JobCreated(_)
            | Update::StdOut(_)
            | Update::BuildSource(_)
            | Update::BuildState(_)
            | Update::Enqueued(_) => Ok(None),
        }
    }

    fn abort(&mut self, abort: &JobAbort) -> Result<Update, ApplyError> {
        let state = JobState::with_time(&self.name, StateValue::Failure, ABORTED_TEXT, abort.time)?;
        self.aborted = true;
        self.state = Some(state.state.clone());
        Ok(Update::JobState(state))
    }

    /// Record a step. The first update for a step name fixes its number;
    /// later ones overwrite state, text, and time.
    fn step_update(&mut self, step: &StepState) {
        let next = self.steps.len() as u32;
        let number = *self.step_numbers.entry(step.step_name.clone()).or_insert(next);

        let mut record = step.clone();
        record.step_number = Some(number);
        match self.steps.get_mut(number as usize) {
            Some(existing) => *existing = record,
            None => self.steps.push(record),
        }
    }

    fn add_output_item(&mut self, item: &OutputItem) -> Result<(), ApplyError> {
        let remaining = self.remaining_output_size.checked_sub(item.size).ok_or_else(|| {
            ApplyError::OutputQuotaExceeded {
                job: self.name.clone(),
                item: item.name.clone(),
                size: item.size,
                remaining: self.remaining_output_size,
            }
        })?;
        self.remaining_output_size = remaining;
        self.output_items.insert(item.name.clone(), item.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
