// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! QEMU sandbox booted from a qcow2 overlay.

use crate::command::{substitute, tokenize};
use crate::config::ContainerConfig;
use crate::container::Container;
use crate::error::SandboxError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

/// Overlay suffixes tried (`_00` through `_99`) before giving up.
pub const MAX_OVERLAYS: usize = 100;

/// A QEMU virtual machine.
pub struct Qemu {
    cfg: ContainerConfig,
    manage: bool,
    running_image: Option<PathBuf>,
    /// Overlay file this sandbox created and must delete.
    overlay: Option<PathBuf>,
    ssh_port: Option<u16>,
    child: Option<Child>,
}

impl Qemu {
    pub fn new(cfg: ContainerConfig) -> Self {
        Self { cfg, manage: false, running_image: None, overlay: None, ssh_port: None, child: None }
    }

    pub fn is_managed(&self) -> bool {
        self.manage
    }

    /// Claim the first unused `<overlay>_NN` by creating it exclusively.
    fn reserve_overlay(&self) -> Result<PathBuf, SandboxError> {
        for idx in 0..MAX_OVERLAYS {
            let mut name = OsString::from(self.cfg.overlay_image.as_os_str());
            name.push(format!("_{idx:02}"));
            let candidate = PathBuf::from(name);

            match std::fs::OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(SandboxError::io(
                        format!("reserving overlay {}", candidate.display()),
                        e,
                    ))
                }
            }
        }
        Err(SandboxError::NoFreeOverlay {
            overlay: self.cfg.overlay_image.clone(),
            tried: MAX_OVERLAYS,
        })
    }

    async fn create_overlay(&self, overlay: &Path) -> Result<(), SandboxError> {
        let tool = &self.cfg.image_tool;
        let output = Command::new(tool)
            .arg("create")
            .arg("-o")
            .arg(format!("backing_file={}", self.cfg.base_image.display()))
            .arg("-f")
            .arg("qcow2")
            .arg(overlay)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SandboxError::Spawn { program: tool.clone(), source })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SandboxError::OverlayCreation {
            overlay: overlay.to_path_buf(),
            reason: format!("{tool} exited with {}: {}", output.status, stderr.trim()),
        })
    }
}

#[async_trait]
impl Container for Qemu {
    fn config(&self) -> &ContainerConfig {
        &self.cfg
    }

    fn running_image(&self) -> Option<&Path> {
        self.running_image.as_deref()
    }

    fn ssh_port(&self) -> Option<u16> {
        self.ssh_port
    }

    async fn prepare(&mut self, manage: bool) -> Result<(), SandboxError> {
        self.manage = manage;
        if manage {
            self.running_image = Some(self.cfg.base_image.clone());
            info!(machine = %self.cfg.machine_id, image = %self.cfg.base_image.display(), "managing base image");
            return Ok(());
        }

        let overlay = self.reserve_overlay()?;
        if let Err(e) = self.create_overlay(&overlay).await {
            if let Err(rm) = std::fs::remove_file(&overlay) {
                warn!(overlay = %overlay.display(), error = %rm, "failed to release overlay reservation");
            }
            return Err(e);
        }

        info!(machine = %self.cfg.machine_id, overlay = %overlay.display(), "created overlay");
        self.running_image = Some(overlay.clone());
        self.overlay = Some(overlay);
        Ok(())
    }

    async fn launch(&mut self) -> Result<(), SandboxError> {
        if self.child.is_some() {
            return Err(SandboxError::AlreadyLaunched);
        }
        let image = self.running_image.as_ref().ok_or(SandboxError::NotPrepared)?;

        let tokens = tokenize(&self.cfg.command).map_err(|source| SandboxError::Command {
            machine: self.cfg.machine_id.clone(),
            source,
        })?;
        let port = match self.cfg.ssh_port {
            Some(port) => port,
            None => free_port()?,
        };
        let argv = substitute(&tokens, &image.to_string_lossy(), port);
        let (program, args) = argv.split_first().ok_or_else(|| SandboxError::Command {
            machine: self.cfg.machine_id.clone(),
            source: crate::command::CommandError::Empty,
        })?;

        debug!(machine = %self.cfg.machine_id, ?argv, "spawning sandbox");
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn { program: program.clone(), source })?;

        info!(machine = %self.cfg.machine_id, pid = ?child.id(), ssh_port = port, "sandbox launched");
        self.ssh_port = Some(port);
        self.child = Some(child);
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | None => false,
            Some(Err(e)) => {
                warn!(machine = %self.cfg.machine_id, error = %e, "failed to poll sandbox");
                false
            }
        }
    }

    fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.as_mut().and_then(|c| c.stdout.take())
    }

    async fn wait(&mut self) -> Result<Option<ExitStatus>, SandboxError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        let status = child.wait().await.map_err(|e| SandboxError::io("waiting for sandbox", e))?;
        Ok(Some(status))
    }

    async fn terminate(&mut self) -> Result<(), SandboxError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        match child.start_kill() {
            Ok(()) => {}
            // Already exited and reaped.
            Err(e) if e.kind() == ErrorKind::InvalidInput => {}
            Err(e) => return Err(SandboxError::io("killing sandbox", e)),
        }
        let status = child.wait().await.map_err(|e| SandboxError::io("reaping sandbox", e))?;
        debug!(machine = %self.cfg.machine_id, %status, "sandbox terminated");
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<(), SandboxError> {
        if self.manage {
            return Ok(());
        }
        let Some(overlay) = self.overlay.take() else {
            return Ok(());
        };
        match tokio::fs::remove_file(&overlay).await {
            Ok(()) => {
                info!(overlay = %overlay.display(), "removed overlay");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                let context = format!("removing overlay {}", overlay.display());
                self.overlay = Some(overlay);
                Err(SandboxError::io(context, e))
            }
        }
    }
}

/// Ask the OS for an unused local TCP port.
fn free_port() -> Result<u16, SandboxError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| SandboxError::io("allocating ssh port", e))?;
    let addr = listener.local_addr().map_err(|e| SandboxError::io("allocating ssh port", e))?;
    Ok(addr.port())
}

#[cfg(test)]
#[path = "qemu_tests.rs"]
mod tests;
