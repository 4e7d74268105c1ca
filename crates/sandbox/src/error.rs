// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::command::CommandError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from configuring or driving a sandbox.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("base image not found: {}", .0.display())]
    BaseImageNotFound(PathBuf),

    #[error("invalid command for machine {machine}: {source}")]
    Command {
        machine: String,
        #[source]
        source: CommandError,
    },

    #[error("no free overlay name for {} after {tried} attempts", overlay.display())]
    NoFreeOverlay { overlay: PathBuf, tried: usize },

    #[error("could not create overlay image {}: {reason}", overlay.display())]
    OverlayCreation { overlay: PathBuf, reason: String },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox must be prepared before launch")]
    NotPrepared,

    #[error("sandbox already launched")]
    AlreadyLaunched,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SandboxError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SandboxError::Io { context: context.into(), source }
    }
}
