// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox configuration.

use crate::command::tokenize;
use crate::error::SandboxError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Program used to materialize overlays when none is configured.
pub const DEFAULT_IMAGE_TOOL: &str = "qemu-img";

/// Machine description as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub base_image: PathBuf,
    pub overlay_image: PathBuf,
    /// Launch command template; may contain `IMAGENAME` and `SSHPORT`.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<u16>,
}

/// Validated machine configuration with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    pub machine_id: String,
    pub base_image: PathBuf,
    pub overlay_image: PathBuf,
    pub command: String,
    pub image_tool: String,
    pub ssh_port: Option<u16>,
}

impl ContainerConfig {
    /// Resolve `spec` against `base_dir` and check the base image exists.
    pub fn configure(
        machine_id: impl Into<String>,
        spec: &ContainerSpec,
        base_dir: &Path,
    ) -> Result<Self, SandboxError> {
        let machine_id = machine_id.into();

        let base_image = base_dir.join(&spec.base_image);
        if !base_image.is_file() {
            return Err(SandboxError::BaseImageNotFound(base_image));
        }
        tokenize(&spec.command)
            .map_err(|source| SandboxError::Command { machine: machine_id.clone(), source })?;

        Ok(Self {
            machine_id,
            base_image,
            overlay_image: base_dir.join(&spec.overlay_image),
            command: spec.command.clone(),
            image_tool: spec.image_tool.clone().unwrap_or_else(|| DEFAULT_IMAGE_TOOL.to_string()),
            ssh_port: spec.ssh_port,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
