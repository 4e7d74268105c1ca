// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job sandbox driver.
//!
//! A [`JobRunner`] owns one sandbox for one job and runs on its own task:
//! provision, launch, turn each line the VM prints into an update, then
//! report the outcome and tear the sandbox down. Updates go to the build's
//! coordinator over a channel, so their order per job is preserved.
//!
//! The VM reports progress by printing update records (`{"class":
//! "StepState", ...}`) on stdout. `StepState`, `OutputItem` and `StdOut`
//! records are forwarded with the job name forced to this job; every other
//! line becomes `StdOut`.

use kiln_core::{Clock, JobState, StateValue, StdOut, Update};
use kiln_sandbox::Container;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a runner finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The sandbox ran to completion and its result was reported.
    Finished(StateValue),
    /// Cancelled before finishing; the coordinator decided the job state.
    Cancelled,
    /// The coordinator stopped listening.
    Detached,
}

pub struct JobRunner<C, K> {
    job_name: String,
    container: C,
    clock: K,
    manage: bool,
    updates: mpsc::Sender<Update>,
    cancel: CancellationToken,
}

impl<C: Container, K: Clock> JobRunner<C, K> {
    pub fn new(
        job_name: impl Into<String>,
        container: C,
        clock: K,
        updates: mpsc::Sender<Update>,
        cancel: CancellationToken,
    ) -> Self {
        Self { job_name: job_name.into(), container, clock, manage: false, updates, cancel }
    }

    /// Run on the base image itself instead of a throwaway overlay.
    pub fn managed(mut self, manage: bool) -> Self {
        self.manage = manage;
        self
    }

    pub async fn run(mut self) -> RunOutcome {
        let outcome = self.drive().await;
        if let Err(e) = self.container.terminate().await {
            warn!(job = %self.job_name, error = %e, "failed to terminate sandbox");
        }
        if let Err(e) = self.container.cleanup().await {
            warn!(job = %self.job_name, error = %e, "failed to clean up sandbox");
        }
        info!(job = %self.job_name, ?outcome, "job runner finished");
        outcome
    }

    async fn drive(&mut self) -> RunOutcome {
        if !self.report(StateValue::Pending, "provisioning sandbox").await {
            return RunOutcome::Detached;
        }
        if let Err(e) = self.container.prepare(self.manage).await {
            return self.finish(StateValue::Error, &format!("sandbox provisioning failed: {e}")).await;
        }
        if self.cancel.is_cancelled() {
            return RunOutcome::Cancelled;
        }
        if let Err(e) = self.container.launch().await {
            return self.finish(StateValue::Error, &format!("sandbox launch failed: {e}")).await;
        }
        if !self.report(StateValue::Pending, "running").await {
            return RunOutcome::Detached;
        }

        if let Some(stdout) = self.container.take_stdout() {
            let mut lines = BufReader::new(stdout).split(b'\n');
            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return RunOutcome::Cancelled,
                    line = lines.next_segment() => match line {
                        Ok(Some(raw)) => {
                            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
                            if !self.send(decode_line(&self.job_name, line)).await {
                                return RunOutcome::Detached;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(job = %self.job_name, error = %e, "failed to read sandbox output");
                            break;
                        }
                    },
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return RunOutcome::Cancelled,
            status = self.container.wait() => status,
        };
        match status {
            Ok(Some(status)) if status.success() => {
                self.finish(StateValue::Success, "sandbox finished successfully").await
            }
            Ok(Some(status)) => {
                self.finish(StateValue::Failure, &format!("sandbox exited with {status}")).await
            }
            Ok(None) => self.finish(StateValue::Error, "sandbox was never launched").await,
            Err(e) => self.finish(StateValue::Error, &format!("lost sandbox: {e}")).await,
        }
    }

    async fn finish(&mut self, state: StateValue, text: &str) -> RunOutcome {
        if self.cancel.is_cancelled() {
            return RunOutcome::Cancelled;
        }
        if self.report(state, text).await {
            RunOutcome::Finished(state)
        } else {
            RunOutcome::Detached
        }
    }

    async fn report(&mut self, state: StateValue, text: &str) -> bool {
        let text = printable(text);
        match JobState::with_time(&self.job_name, state, text, self.clock.epoch_secs()) {
            Ok(update) => self.send(Update::JobState(update)).await,
            Err(e) => {
                warn!(job = %self.job_name, error = %e, "cannot build job state");
                true
            }
        }
    }

    async fn send(&mut self, update: Update) -> bool {
        debug!(job = %self.job_name, kind = %update.kind(), "runner update");
        if self.updates.send(update).await.is_err() {
            warn!(job = %self.job_name, "coordinator gone, stopping runner");
            self.cancel.cancel();
            return false;
        }
        true
    }
}

/// Turn one line of sandbox output into an update for `job_name`.
pub fn decode_line(job_name: &str, line: String) -> Update {
    if line.trim_start().starts_with('{') {
        if let Ok(mut update) = Update::construct(&line) {
            let forwarded = match &mut update {
                Update::StepState(u) => Some(&mut u.job_name),
                Update::OutputItem(u) => Some(&mut u.job_name),
                Update::StdOut(u) => Some(&mut u.job_name),
                _ => None,
            };
            if let Some(name) = forwarded {
                if name != job_name {
                    *name = job_name.to_string();
                }
                return update;
            }
            debug!(job = job_name, kind = %update.kind(), "sandbox sent unforwardable record");
        }
    }
    Update::StdOut(StdOut { job_name: job_name.to_string(), data: line + "\n" })
}

/// Flatten error text into a single printable line.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() || (c.is_whitespace() && c != ' ') { ' ' } else { c })
        .collect()
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
