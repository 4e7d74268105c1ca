// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build triggers.
//!
//! A trigger names the commit to build and where to report status. It is
//! parsed from a GitHub `pull_request` webhook payload whose signature has
//! already been checked by the receiver.

use kiln_core::{BuildId, BuildSource, UpdateError};
use serde::Deserialize;
use thiserror::Error;

/// Pull request actions that start a build.
const BUILD_ACTIONS: [&str; 3] = ["opened", "reopened", "synchronize"];

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("malformed pull_request payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("head sha {0:?} is not a commit hash")]
    InvalidSha(String),

    #[error(transparent)]
    Source(#[from] UpdateError),
}

/// A request to build one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub clone_url: String,
    pub repo_url: String,
    pub head_sha: String,
    pub statuses_url: String,
    /// Target repository, `owner/name`.
    pub repo_name: String,
    pub author: String,
    pub branch: String,
    pub title: Option<String>,
}

#[derive(Deserialize)]
struct PullRequestEvent {
    action: String,
    pull_request: PullRequest,
    repository: Repository,
    #[serde(default)]
    sender: Option<User>,
}

#[derive(Deserialize)]
struct PullRequest {
    head: Head,
    statuses_url: String,
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Deserialize)]
struct Head {
    sha: String,
    #[serde(default, rename = "ref")]
    branch: Option<String>,
    #[serde(default)]
    label: Option<String>,
    repo: HeadRepo,
}

#[derive(Deserialize)]
struct HeadRepo {
    clone_url: String,
    html_url: String,
}

#[derive(Deserialize)]
struct Repository {
    full_name: String,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

impl Trigger {
    /// Parse a `pull_request` event body.
    ///
    /// Returns `Ok(None)` for actions that do not need a build (closed,
    /// labeled, ...).
    pub fn from_pull_request(body: &[u8]) -> Result<Option<Self>, TriggerError> {
        let event: PullRequestEvent = serde_json::from_slice(body)?;
        if !BUILD_ACTIONS.contains(&event.action.as_str()) {
            return Ok(None);
        }

        let pr = event.pull_request;
        let sha = pr.head.sha;
        if sha.is_empty() || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TriggerError::InvalidSha(sha));
        }

        let author = pr.user.or(event.sender).map(|u| u.login).unwrap_or_default();
        let branch = pr.head.branch.or(pr.head.label).unwrap_or_default();
        let title = match (pr.number, pr.title) {
            (Some(n), Some(t)) => Some(format!("#{n}: {t}")),
            (Some(n), None) => Some(format!("#{n}")),
            (None, t) => t,
        };

        Ok(Some(Self {
            clone_url: pr.head.repo.clone_url,
            repo_url: pr.head.repo.html_url,
            head_sha: sha,
            statuses_url: pr.statuses_url,
            repo_name: event.repository.full_name,
            author,
            branch,
            title,
        }))
    }

    /// Builds are keyed by the commit they build.
    pub fn build_id(&self) -> BuildId {
        BuildId::from(self.head_sha.as_str())
    }

    pub fn build_source(&self) -> Result<BuildSource, TriggerError> {
        let comment = match &self.title {
            Some(title) => format!("{} pull request {title}", self.repo_name),
            None => format!("{} pull request", self.repo_name),
        };
        Ok(BuildSource::new(
            &self.clone_url,
            &self.repo_url,
            &self.author,
            &self.branch,
            comment,
        )?)
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
