// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build coordinator: the single writer for one build.
//!
//! Job runners and external callers send input updates over one channel.
//! The coordinator folds each into the [`Build`], appends it to the update
//! log once accepted, and publishes it together with everything it derived
//! to watchers and the status notifier. Rejected updates are logged and
//! dropped; only log failures stop the build.

use crate::error::EngineError;
use crate::notify::{Status, StatusNotifier};
use crate::runner::{JobRunner, RunOutcome};
use crate::watch::{WatchHub, Watcher};
use kiln_core::{ApplyError, Build, BuildId, BuildSource, Clock, JobState, StateValue, Update};
use kiln_sandbox::{Container, SandboxError};
use kiln_storage::{replay, UpdateLog};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Text of the state given to jobs a previous process left running.
pub const RESTARTED_TEXT: &str = "engine restarted while job was running";

/// Text of the state given to jobs whose runner vanished without a result.
pub const ABANDONED_TEXT: &str = "runner exited without reporting";

pub struct BuildCoordinator<K, N> {
    build: Build,
    log: UpdateLog,
    hub: WatchHub,
    clock: K,
    notifier: N,
    statuses: mpsc::UnboundedSender<Status>,
    pending_statuses: Option<mpsc::UnboundedReceiver<Status>>,
    tx: mpsc::Sender<Update>,
    rx: mpsc::Receiver<Update>,
    runners: JoinSet<(String, RunOutcome)>,
    cancels: HashMap<String, CancellationToken>,
}

impl<K, N> BuildCoordinator<K, N>
where
    K: Clock + 'static,
    N: StatusNotifier,
{
    /// Open the build's log at `path` and replay it.
    ///
    /// Jobs the log shows as still pending belonged to a process that is
    /// gone, so they are failed with [`RESTARTED_TEXT`].
    pub fn open(
        id: BuildId,
        max_output_size: u64,
        path: &Path,
        clock: K,
        notifier: N,
    ) -> Result<Self, EngineError> {
        let mut log = UpdateLog::open(path)?;
        let replayed = replay(&mut log, Build::new(id, max_output_size))?;
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let (statuses, pending_statuses) = mpsc::unbounded_channel();

        let mut coordinator = Self {
            build: replayed.build,
            log,
            hub: WatchHub::new(replayed.history),
            clock,
            notifier,
            statuses,
            pending_statuses: Some(pending_statuses),
            tx,
            rx,
            runners: JoinSet::new(),
            cancels: HashMap::new(),
        };

        let stale: Vec<String> = coordinator
            .build
            .jobs
            .values()
            .filter(|job| !job.is_finished())
            .map(|job| job.name.clone())
            .collect();
        for job in stale {
            warn!(
                build_id = %coordinator.build.id,
                job = %job,
                "job left running by previous engine"
            );
            coordinator.fail_job(&job, RESTARTED_TEXT)?;
        }
        coordinator.log.flush()?;
        Ok(coordinator)
    }

    pub fn build(&self) -> &Build {
        &self.build
    }

    /// Sender for external inputs such as `JobAbort`.
    pub fn handle(&self) -> mpsc::Sender<Update> {
        self.tx.clone()
    }

    /// Watch this build: full history first, then live updates.
    pub fn watch(&self) -> Watcher {
        self.hub.watch()
    }

    /// The hub behind [`watch`](Self::watch); outlives the coordinator.
    pub fn watch_hub(&self) -> WatchHub {
        self.hub.clone()
    }

    pub fn add_source(&mut self, source: BuildSource) -> Result<(), EngineError> {
        if self.build.sources.contains(&source) {
            debug!(build_id = %self.build.id, clone_url = %source.clone_url, "source already recorded");
            return Ok(());
        }
        self.process(Update::BuildSource(source))?;
        self.log.flush()?;
        Ok(())
    }

    /// Accept the build into `queue`. Fails until a source is known.
    pub fn enqueue(&mut self, queue: &str) -> Result<(), EngineError> {
        let update = self.build.enqueue(queue).map_err(|e| self.rejected(e))?;
        info!(build_id = %self.build.id, queue, "build enqueued");
        self.publish(update);
        Ok(())
    }

    /// Record every job as pending, then launch one runner per job.
    pub fn start_jobs<C>(&mut self, jobs: Vec<(String, C)>, manage: bool) -> Result<(), EngineError>
    where
        C: Container + 'static,
    {
        let jobs: Vec<_> = jobs.into_iter().map(|(name, container)| (name, Ok(container))).collect();
        self.start_machines(jobs, manage)
    }

    /// Like [`start_jobs`](Self::start_jobs), for machines whose sandbox may
    /// have failed to configure. Such a job is recorded as pending and then
    /// errored; its siblings run normally.
    pub fn start_machines<C>(
        &mut self,
        jobs: Vec<(String, Result<C, SandboxError>)>,
        manage: bool,
    ) -> Result<(), EngineError>
    where
        C: Container + 'static,
    {
        if jobs.is_empty() {
            return Err(EngineError::NoJobs(self.build.id.clone()));
        }
        // Jobs known from the log already have their result.
        let jobs: Vec<(String, Result<C, SandboxError>)> = jobs
            .into_iter()
            .filter(|(name, _)| {
                let known = self.build.job(name).is_some();
                if known {
                    info!(build_id = %self.build.id, job = %name, "job already recorded, not restarting");
                }
                !known
            })
            .collect();
        for (name, _) in &jobs {
            let time = self.clock.epoch_secs();
            let state = JobState::with_time(name, StateValue::Pending, "waiting for sandbox", time)
                .map_err(|e| self.rejected(e.into()))?;
            self.process(Update::JobState(state))?;
        }

        let mut runnable = Vec::with_capacity(jobs.len());
        for (name, container) in jobs {
            match container {
                Ok(container) => runnable.push((name, container)),
                Err(e) => {
                    warn!(
                        build_id = %self.build.id,
                        job = %name,
                        error = %e,
                        "sandbox configuration failed"
                    );
                    self.fail_job(&name, &format!("sandbox configuration failed: {e}"))?;
                }
            }
        }
        self.log.flush()?;

        for (name, container) in runnable {
            let cancel = CancellationToken::new();
            self.cancels.insert(name.clone(), cancel.clone());
            let runner =
                JobRunner::new(name.clone(), container, self.clock.clone(), self.tx.clone(), cancel)
                    .managed(manage);
            info!(build_id = %self.build.id, job = %name, "starting job runner");
            self.runners.spawn(async move { (name, runner.run().await) });
        }
        Ok(())
    }

    /// Apply one input update, persist it, and publish it with what it derived.
    ///
    /// A rejected update leaves the build and log untouched. An output item
    /// over the job's quota additionally stops the job with an error.
    pub fn process(&mut self, update: Update) -> Result<(), EngineError> {
        if update.is_generated() {
            return Err(EngineError::Generated(update.kind()));
        }
        match self.build.apply(&update) {
            Ok(derived) => self.commit(update, derived),
            Err(ApplyError::OutputQuotaExceeded { job, item, size, remaining }) => {
                warn!(
                    build_id = %self.build.id,
                    job = %job,
                    item = %item,
                    size,
                    remaining,
                    "output quota exceeded"
                );
                let text =
                    format!("output quota exceeded by {item} ({size} bytes, {remaining} remaining)");
                self.fail_job(&job, &text)?;
                Err(self.rejected(ApplyError::OutputQuotaExceeded { job, item, size, remaining }))
            }
            Err(e) => Err(self.rejected(e)),
        }
    }

    /// Drive the build until every job has finished and every runner exited.
    pub async fn run(mut self) -> Result<Build, EngineError> {
        let delivery = self
            .pending_statuses
            .take()
            .map(|rx| tokio::spawn(deliver(self.notifier.clone(), rx)));

        loop {
            if self.build.is_finished() {
                break;
            }
            if self.runners.is_empty() {
                self.receive_ready()?;
                self.abandon_unfinished()?;
                break;
            }
            tokio::select! {
                Some(update) = self.rx.recv() => {
                    self.receive(update)?;
                    self.receive_ready()?;
                }
                Some(joined) = self.runners.join_next() => self.runner_exited(joined),
                else => break,
            }
        }

        for cancel in self.cancels.values() {
            cancel.cancel();
        }
        loop {
            tokio::select! {
                Some(update) = self.rx.recv() => self.receive(update)?,
                joined = self.runners.join_next() => match joined {
                    Some(joined) => self.runner_exited(joined),
                    None => break,
                },
            }
        }
        self.receive_ready()?;

        info!(build_id = %self.build.id, state = %self.build.state_value(), "build finished");
        let build = self.build;
        drop(self.statuses);
        if let Some(delivery) = delivery {
            if let Err(e) = delivery.await {
                warn!(error = %e, "status delivery task failed");
            }
        }
        Ok(build)
    }

    /// Process one update from the channel; rejections are logged, not fatal.
    fn receive(&mut self, update: Update) -> Result<(), EngineError> {
        let kind = update.kind();
        match self.process(update) {
            Ok(()) => Ok(()),
            Err(EngineError::Rejected { build, source }) => {
                warn!(build_id = %build, %kind, error = %source, "update rejected");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Process everything already queued, then make it durable.
    fn receive_ready(&mut self) -> Result<(), EngineError> {
        while let Ok(update) = self.rx.try_recv() {
            self.receive(update)?;
        }
        self.log.flush()?;
        Ok(())
    }

    fn runner_exited(&mut self, joined: Result<(String, RunOutcome), JoinError>) {
        match joined {
            Ok((job, outcome)) => {
                debug!(build_id = %self.build.id, job = %job, ?outcome, "job runner exited");
                self.cancels.remove(&job);
            }
            Err(e) => warn!(build_id = %self.build.id, error = %e, "job runner failed"),
        }
    }

    fn abandon_unfinished(&mut self) -> Result<(), EngineError> {
        let unfinished: Vec<String> = self
            .build
            .jobs
            .values()
            .filter(|job| !job.is_finished())
            .map(|job| job.name.clone())
            .collect();
        for job in unfinished {
            warn!(build_id = %self.build.id, job = %job, "job runner gone without a result");
            self.fail_job(&job, ABANDONED_TEXT)?;
        }
        self.log.flush()?;
        Ok(())
    }

    /// Record an error state for `job` on the coordinator's behalf.
    fn fail_job(&mut self, job: &str, text: &str) -> Result<(), EngineError> {
        let state = JobState::with_time(job, StateValue::Error, text, self.clock.epoch_secs())
            .map_err(|e| self.rejected(e.into()))?;
        let update = Update::JobState(state);
        let derived = self.build.apply(&update).map_err(|e| self.rejected(e))?;
        self.commit(update, derived)
    }

    fn commit(&mut self, update: Update, derived: Vec<Update>) -> Result<(), EngineError> {
        let seq = self.log.append(&update)?;
        debug!(build_id = %self.build.id, seq, kind = %update.kind(), "update persisted");

        if let Some(job) = update.job_name().and_then(|name| self.build.job(name)) {
            if job.is_finished() {
                if let Some(cancel) = self.cancels.get(&job.name) {
                    cancel.cancel();
                }
            }
        }

        self.publish(update);
        for update in derived {
            self.publish(update);
        }
        Ok(())
    }

    fn publish(&self, update: Update) {
        if let Some(status) = Status::from_update(&update) {
            // Receiver lives until the end of run.
            let _ = self.statuses.send(status);
        }
        self.hub.publish(update);
    }

    fn rejected(&self, source: ApplyError) -> EngineError {
        EngineError::Rejected { build: self.build.id.clone(), source }
    }
}

async fn deliver<N: StatusNotifier>(notifier: N, mut rx: mpsc::UnboundedReceiver<Status>) {
    while let Some(status) = rx.recv().await {
        if let Err(e) = notifier.notify(&status).await {
            warn!(
                context = %status.context,
                state = %status.state,
                error = %e,
                "status callback failed"
            );
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
