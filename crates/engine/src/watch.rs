// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Update fan-out to watchers.
//!
//! Every applied update (inputs and what they derive) is appended to the
//! build's history and broadcast. A new watcher first receives the history,
//! then live updates, with nothing lost or repeated in between.

use kiln_core::Update;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 1024;

struct HubState {
    history: Vec<Update>,
    tx: broadcast::Sender<Update>,
}

/// Shared history plus live channel for one build.
#[derive(Clone)]
pub struct WatchHub {
    inner: Arc<Mutex<HubState>>,
}

impl WatchHub {
    pub fn new(history: Vec<Update>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { inner: Arc::new(Mutex::new(HubState { history, tx })) }
    }

    pub fn publish(&self, update: Update) {
        let mut state = self.inner.lock();
        state.history.push(update.clone());
        // No receivers is fine.
        let _ = state.tx.send(update);
    }

    pub fn watch(&self) -> Watcher {
        let state = self.inner.lock();
        Watcher { backlog: state.history.iter().cloned().collect(), rx: state.tx.subscribe() }
    }

    pub fn history(&self) -> Vec<Update> {
        self.inner.lock().history.clone()
    }
}

/// Receives a build's history followed by its live updates.
pub struct Watcher {
    backlog: VecDeque<Update>,
    rx: broadcast::Receiver<Update>,
}

impl Watcher {
    /// Next update; `None` once the build's coordinator is gone.
    pub async fn recv(&mut self) -> Option<Update> {
        if let Some(update) = self.backlog.pop_front() {
            return Some(update);
        }
        loop {
            match self.rx.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watcher fell behind, updates dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next update if one is ready.
    pub fn try_recv(&mut self) -> Option<Update> {
        if let Some(update) = self.backlog.pop_front() {
            return Some(update);
        }
        loop {
            match self.rx.try_recv() {
                Ok(update) => return Some(update),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "watcher fell behind, updates dropped");
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
