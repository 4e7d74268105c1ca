// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status callbacks.
//!
//! Job and build state changes are reported to the URL the trigger supplied,
//! in the shape of a GitHub commit status. Delivery is bounded by a timeout
//! and never retried.

use async_trait::async_trait;
use kiln_core::{StateValue, Update};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Context reported for the build as a whole; jobs use `kiln/<job>`.
pub const BUILD_CONTEXT: &str = "kiln";

/// Longest description a status endpoint accepts.
const MAX_DESCRIPTION: usize = 140;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("cannot build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("status delivery failed: {0}")]
    Send(#[from] reqwest::Error),

    #[error("status endpoint answered {0}")]
    Rejected(u16),
}

/// One status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub state: StateValue,
    pub description: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl Status {
    /// The status an update reports, if it reports one.
    pub fn from_update(update: &Update) -> Option<Self> {
        let (context, state) = match update {
            Update::JobState(u) => (format!("{BUILD_CONTEXT}/{}", u.job_name), &u.state),
            Update::BuildState(u) => (BUILD_CONTEXT.to_string(), &u.state),
            _ => return None,
        };
        Some(Self {
            state: state.state,
            description: truncate(&state.text, MAX_DESCRIPTION),
            context,
            target_url: None,
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Receiver of status reports.
#[async_trait]
pub trait StatusNotifier: Clone + Send + Sync + 'static {
    async fn notify(&self, status: &Status) -> Result<(), NotifyError>;
}

/// Drops every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStatusNotifier;

#[async_trait]
impl StatusNotifier for NoopStatusNotifier {
    async fn notify(&self, _status: &Status) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// POSTs each status as JSON.
#[derive(Clone, Debug)]
pub struct HttpStatusNotifier {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    target_url: Option<String>,
}

impl HttpStatusNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kiln/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self { client, url: url.into(), token: None, target_url: None })
    }

    /// Authenticate with a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Link reports to a page showing the build.
    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusNotifier for HttpStatusNotifier {
    async fn notify(&self, status: &Status) -> Result<(), NotifyError> {
        let mut status = status.clone();
        if status.target_url.is_none() {
            status.target_url.clone_from(&self.target_url);
        }

        let mut request = self.client.post(&self.url).json(&status);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        tracing::debug!(context = %status.context, state = %status.state, "status delivered");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{NotifyError, Status, StatusNotifier};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake notifier for testing; records every status.
    #[derive(Clone, Default)]
    pub struct FakeStatusNotifier {
        calls: Arc<Mutex<Vec<Status>>>,
    }

    impl FakeStatusNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<Status> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl StatusNotifier for FakeStatusNotifier {
        async fn notify(&self, status: &Status) -> Result<(), NotifyError> {
            self.calls.lock().push(status.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStatusNotifier;

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
