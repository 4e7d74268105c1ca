// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-scoped update payloads

use super::UpdateError;
use crate::state::State;
use serde::{Deserialize, Serialize};

/// A place from which the request to build a commit originated.
///
/// A build needs at least one source before it can be enqueued, since the
/// source carries the clone URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSource {
    pub clone_url: String,
    pub repo_url: String,
    pub author: String,
    pub branch: String,
    pub comment: String,
}

impl BuildSource {
    pub fn new(
        clone_url: impl Into<String>,
        repo_url: impl Into<String>,
        author: impl Into<String>,
        branch: impl Into<String>,
        comment: impl Into<String>,
    ) -> Result<Self, UpdateError> {
        let source = Self {
            clone_url: clone_url.into(),
            repo_url: repo_url.into(),
            author: author.into(),
            branch: branch.into(),
            comment: comment.into(),
        };
        source.validate()?;
        Ok(source)
    }

    pub(crate) fn validate(&self) -> Result<(), UpdateError> {
        if self.clone_url.is_empty() {
            return Err(UpdateError::EmptyField("BuildSource.clone_url"));
        }
        Ok(())
    }
}

/// Overall build state, derived from the job states. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildState {
    #[serde(flatten)]
    pub state: State,
}

impl BuildState {
    pub fn new(state: State) -> Self {
        Self { state }
    }
}

/// The build was enqueued and its jobs may run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enqueued {
    /// Name of the queue that accepted the build; process-local only.
    #[serde(skip)]
    pub queue: Option<String>,
}

impl Enqueued {
    pub fn new(queue: Option<String>) -> Self {
        Self { queue }
    }
}
