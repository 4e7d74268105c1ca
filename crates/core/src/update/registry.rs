// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static tag → decoder table for serialized updates.
//!
//! Every update kind is listed exactly once. The table is a `static` and is
//! never mutated, so lookups need no synchronization.

use super::{
    BuildSource, BuildState, Enqueued, JobAbort, JobCreated, JobState, OutputItem, StdOut,
    StepState, Update,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Decodes the fields of one kind (tag already removed) into an [`Update`].
pub type Factory = fn(serde_json::Value) -> Result<Update, serde_json::Error>;

/// Discriminant of an [`Update`], also its serialized tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateKind {
    BuildSource,
    BuildState,
    JobState,
    JobCreated,
    JobAbort,
    StepState,
    OutputItem,
    StdOut,
    Enqueued,
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

fn factory<T>(fields: serde_json::Value) -> Result<Update, serde_json::Error>
where
    T: DeserializeOwned + Into<Update>,
{
    serde_json::from_value::<T>(fields).map(Into::into)
}

static REGISTRY: [(UpdateKind, Factory); 9] = [
    (UpdateKind::BuildSource, factory::<BuildSource>),
    (UpdateKind::BuildState, factory::<BuildState>),
    (UpdateKind::JobState, factory::<JobState>),
    (UpdateKind::JobCreated, factory::<JobCreated>),
    (UpdateKind::JobAbort, factory::<JobAbort>),
    (UpdateKind::StepState, factory::<StepState>),
    (UpdateKind::OutputItem, factory::<OutputItem>),
    (UpdateKind::StdOut, factory::<StdOut>),
    (UpdateKind::Enqueued, factory::<Enqueued>),
];

impl UpdateKind {
    /// Every registered kind, in registry order.
    pub fn all() -> impl Iterator<Item = UpdateKind> {
        REGISTRY.iter().map(|(kind, _)| *kind)
    }

    /// Look up a kind by its serialized tag.
    pub fn from_tag(tag: &str) -> Option<UpdateKind> {
        Self::all().find(|kind| kind.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            UpdateKind::BuildSource => "BuildSource",
            UpdateKind::BuildState => "BuildState",
            UpdateKind::JobState => "JobState",
            UpdateKind::JobCreated => "JobCreated",
            UpdateKind::JobAbort => "JobAbort",
            UpdateKind::StepState => "StepState",
            UpdateKind::OutputItem => "OutputItem",
            UpdateKind::StdOut => "StdOut",
            UpdateKind::Enqueued => "Enqueued",
        }
    }

    /// Generated kinds are derived while folding other updates and are
    /// never written to the update log.
    pub fn is_generated(self) -> bool {
        matches!(self, UpdateKind::BuildState | UpdateKind::JobCreated | UpdateKind::Enqueued)
    }
}

/// Find the kind and decoder registered for a serialized tag.
pub(crate) fn lookup(tag: &str) -> Option<(UpdateKind, Factory)> {
    REGISTRY.iter().find(|(kind, _)| kind.tag() == tag).copied()
}
