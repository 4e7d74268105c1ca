// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::ContainerConfig;
use crate::error::SandboxError;
use async_trait::async_trait;
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::ChildStdout;

/// A disposable execution environment for one job.
#[async_trait]
pub trait Container: Send {
    fn config(&self) -> &ContainerConfig;

    /// Image the sandbox boots; set by [`prepare`](Self::prepare).
    fn running_image(&self) -> Option<&Path>;

    /// Port forwarded for remote access; set by [`launch`](Self::launch).
    fn ssh_port(&self) -> Option<u16>;

    /// Select the running image. With `manage` the base image itself is
    /// used; otherwise a fresh overlay backed by it is created.
    async fn prepare(&mut self, manage: bool) -> Result<(), SandboxError>;

    /// Spawn the sandbox process with no stdin and stdout piped.
    async fn launch(&mut self) -> Result<(), SandboxError>;

    /// Non-blocking liveness check.
    fn is_running(&mut self) -> bool;

    /// Take the process's stdout. Returns `None` after the first call.
    fn take_stdout(&mut self) -> Option<ChildStdout>;

    /// Wait for the process to exit. `None` if it was never launched.
    async fn wait(&mut self) -> Result<Option<ExitStatus>, SandboxError>;

    /// Kill the process and reap it. Idempotent.
    async fn terminate(&mut self) -> Result<(), SandboxError>;

    /// Delete the overlay, if one was created.
    async fn cleanup(&mut self) -> Result<(), SandboxError>;
}
