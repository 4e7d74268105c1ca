// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry points: run a build for a source, or for a pull-request event.

use crate::config::EngineConfig;
use crate::coordinator::BuildCoordinator;
use crate::error::EngineError;
use crate::notify::{HttpStatusNotifier, StatusNotifier};
use crate::trigger::Trigger;
use kiln_core::{Build, BuildId, BuildSource, Clock, SystemClock};
use kiln_sandbox::Qemu;
use tracing::info;

/// Runs builds, one job per configured machine.
pub struct Engine<K = SystemClock> {
    config: EngineConfig,
    clock: K,
}

impl Engine<SystemClock> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K: Clock + 'static> Engine<K> {
    pub fn with_clock(config: EngineConfig, clock: K) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open (and replay) the build's coordinator without starting anything.
    pub fn open_build<N: StatusNotifier>(
        &self,
        id: &BuildId,
        notifier: N,
    ) -> Result<BuildCoordinator<K, N>, EngineError> {
        let path = self.config.log_path(id)?;
        BuildCoordinator::open(
            id.clone(),
            self.config.max_output_size,
            &path,
            self.clock.clone(),
            notifier,
        )
    }

    /// Build `source` to completion.
    ///
    /// A build whose log already shows it finished is returned as replayed.
    pub async fn run_build<N: StatusNotifier>(
        &self,
        id: &BuildId,
        source: BuildSource,
        notifier: N,
    ) -> Result<Build, EngineError> {
        let coordinator = self.open_build(id, notifier)?;
        self.drive(coordinator, source).await
    }

    /// Start every machine's job on an opened coordinator and wait for the result.
    pub async fn drive<N: StatusNotifier>(
        &self,
        mut coordinator: BuildCoordinator<K, N>,
        source: BuildSource,
    ) -> Result<Build, EngineError> {
        if coordinator.build().is_finished() {
            info!(build_id = %coordinator.build().id, "build already finished, not rerunning");
            return Ok(coordinator.build().clone());
        }

        // A machine that cannot be configured errors its own job only.
        let jobs: Vec<_> = self
            .config
            .sandboxes()
            .map(|(id, config)| (id.to_string(), config.map(Qemu::new)))
            .collect();

        coordinator.add_source(source)?;
        coordinator.enqueue(&self.config.queue)?;
        coordinator.start_machines(jobs, self.config.manage)?;
        coordinator.run().await
    }

    /// Build the head of a pull request, reporting to its statuses URL.
    ///
    /// Returns `Ok(None)` when the event's action needs no build.
    pub async fn run_pull_request(&self, payload: &[u8]) -> Result<Option<Build>, EngineError> {
        let Some(trigger) = Trigger::from_pull_request(payload)? else {
            return Ok(None);
        };
        let mut notifier =
            HttpStatusNotifier::new(&trigger.statuses_url, self.config.status_timeout())?;
        if let Some(token) = &self.config.status_token {
            notifier = notifier.with_token(token);
        }
        self.run_trigger(&trigger, notifier).await.map(Some)
    }

    /// Build a parsed trigger, reporting through `notifier`.
    pub async fn run_trigger<N: StatusNotifier>(
        &self,
        trigger: &Trigger,
        notifier: N,
    ) -> Result<Build, EngineError> {
        let id = trigger.build_id();
        info!(build_id = %id, repo = %trigger.repo_name, branch = %trigger.branch, "build triggered");
        self.run_build(&id, trigger.build_source()?, notifier).await
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
