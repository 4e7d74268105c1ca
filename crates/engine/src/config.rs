// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration loaded from TOML.
//!
//! ```toml
//! state_dir = "state"
//! max_output_size = 1073741824
//! status_timeout_ms = 5000
//!
//! [machines.linux]
//! base_image = "images/debian.qcow2"
//! overlay_image = "/var/tmp/kiln/debian.qcow2"
//! command = "qemu-system-x86_64 -hda IMAGENAME -nic user,hostfwd=tcp::SSHPORT-:22"
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use crate::env;
use crate::error::EngineError;
use kiln_sandbox::{ContainerConfig, ContainerSpec, SandboxError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Output quota per job when the config does not set one (1 GiB).
pub const DEFAULT_MAX_OUTPUT_SIZE: u64 = 1 << 30;

/// Queue name recorded when a build is enqueued.
pub const DEFAULT_QUEUE: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default = "default_max_output_size")]
    pub max_output_size: u64,
    #[serde(default)]
    pub status_timeout_ms: Option<u64>,
    /// Bearer token sent with status callbacks.
    #[serde(default)]
    pub status_token: Option<String>,
    #[serde(default = "default_queue")]
    pub queue: String,
    /// Boot base images directly instead of throwaway overlays.
    #[serde(default)]
    pub manage: bool,
    /// Machines by id; every build runs one job per machine.
    #[serde(default)]
    pub machines: BTreeMap<String, ContainerSpec>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_max_output_size() -> u64 {
    DEFAULT_MAX_OUTPUT_SIZE
}

fn default_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(&text, base_dir)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Parse config text; relative paths will resolve against `base_dir`.
    pub fn parse(text: &str, base_dir: PathBuf) -> Result<Self, toml::de::Error> {
        let mut config: EngineConfig = toml::from_str(text)?;
        config.base_dir = base_dir;
        Ok(config)
    }

    /// Where update logs live: the configured directory, else the environment default.
    pub fn state_dir(&self) -> Result<PathBuf, EngineError> {
        match &self.state_dir {
            Some(dir) => Ok(self.base_dir.join(dir)),
            None => env::state_dir(),
        }
    }

    /// Update log path for one build.
    pub fn log_path(&self, build_id: &str) -> Result<PathBuf, EngineError> {
        Ok(self.state_dir()?.join("builds").join(format!("{build_id}.log")))
    }

    pub fn status_timeout(&self) -> Duration {
        self.status_timeout_ms.map(Duration::from_millis).unwrap_or_else(env::status_timeout)
    }

    pub fn machine_ids(&self) -> impl Iterator<Item = &str> {
        self.machines.keys().map(String::as_str)
    }

    /// Validated sandbox configuration for one machine.
    pub fn machine(&self, id: &str) -> Result<ContainerConfig, EngineError> {
        let spec = self.machines.get(id).ok_or_else(|| EngineError::UnknownMachine(id.into()))?;
        Ok(ContainerConfig::configure(id, spec, &self.base_dir)?)
    }

    /// Every machine with its sandbox configuration, or why it has none.
    pub fn sandboxes(
        &self,
    ) -> impl Iterator<Item = (&str, Result<ContainerConfig, SandboxError>)> + '_ {
        self.machines
            .iter()
            .map(|(id, spec)| (id.as_str(), ContainerConfig::configure(id, spec, &self.base_dir)))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
