// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::ConfigError;
use crate::notify::NotifyError;
use crate::trigger::TriggerError;
use kiln_core::{ApplyError, BuildId, UpdateKind};
use kiln_sandbox::SandboxError;
use kiln_storage::LogError;
use thiserror::Error;

/// Errors that stop a build from being driven.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("update log: {0}")]
    Log(#[from] LogError),

    #[error("sandbox: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("trigger: {0}")]
    Trigger(#[from] TriggerError),

    #[error("status callback: {0}")]
    Notify(#[from] NotifyError),

    #[error("build {build}: {source}")]
    Rejected {
        build: BuildId,
        #[source]
        source: ApplyError,
    },

    #[error("{0} updates are derived and cannot be submitted")]
    Generated(UpdateKind),

    #[error("build {0} has no jobs to run")]
    NoJobs(BuildId),

    #[error("unknown machine {0:?}")]
    UnknownMachine(String),

    #[error("cannot determine state directory: set KILN_STATE_DIR or HOME")]
    NoStateDir,
}
