// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn payload(action: &str, sha: &str) -> Vec<u8> {
    json!({
        "action": action,
        "sender": {"login": "rolf"},
        "pull_request": {
            "number": 42,
            "title": "Faster overlays",
            "head": {
                "repo": {
                    "clone_url": "https://github.com/rolf/kiln.git",
                    "html_url": "https://github.com/rolf/kiln",
                },
                "sha": sha,
                "ref": "fast-overlays",
                "label": "rolf:fast-overlays",
            },
            "statuses_url": format!("https://api.github.com/repos/kiln/kiln/statuses/{sha}"),
        },
        "repository": {"full_name": "kiln/kiln"},
    })
    .to_string()
    .into_bytes()
}

const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

#[test]
fn parses_pull_request() {
    let trigger = Trigger::from_pull_request(&payload("synchronize", SHA)).unwrap().unwrap();

    assert_eq!(trigger.clone_url, "https://github.com/rolf/kiln.git");
    assert_eq!(trigger.repo_url, "https://github.com/rolf/kiln");
    assert_eq!(trigger.head_sha, SHA);
    assert_eq!(trigger.repo_name, "kiln/kiln");
    assert_eq!(trigger.author, "rolf");
    assert_eq!(trigger.branch, "fast-overlays");
    assert_eq!(trigger.title.as_deref(), Some("#42: Faster overlays"));
    assert!(trigger.statuses_url.ends_with(SHA));
    assert_eq!(trigger.build_id(), SHA);
}

#[test]
fn build_source_carries_origin() {
    let trigger = Trigger::from_pull_request(&payload("opened", SHA)).unwrap().unwrap();

    let source = trigger.build_source().unwrap();

    assert_eq!(source.clone_url, trigger.clone_url);
    assert_eq!(source.repo_url, trigger.repo_url);
    assert_eq!(source.author, "rolf");
    assert_eq!(source.branch, "fast-overlays");
    assert_eq!(source.comment, "kiln/kiln pull request #42: Faster overlays");
}

#[yare::parameterized(
    closed   = { "closed" },
    labeled  = { "labeled" },
    assigned = { "assigned" },
)]
fn non_build_actions_are_ignored(action: &str) {
    assert!(Trigger::from_pull_request(&payload(action, SHA)).unwrap().is_none());
}

#[test]
fn minimal_payload_uses_label_and_sender() {
    let body = json!({
        "action": "synchronize",
        "sender": {"login": "rolf"},
        "pull_request": {
            "head": {
                "repo": {"clone_url": "/srv/repo", "html_url": "/srv/repo"},
                "sha": "abc123",
                "label": "lol:epic_update",
            },
            "statuses_url": "http://[::1]:8423/statuses",
        },
        "repository": {"full_name": "kiln/kiln"},
    });

    let trigger = Trigger::from_pull_request(body.to_string().as_bytes()).unwrap().unwrap();

    assert_eq!(trigger.branch, "lol:epic_update");
    assert_eq!(trigger.author, "rolf");
    assert_eq!(trigger.title, None);
    assert_eq!(trigger.build_source().unwrap().comment, "kiln/kiln pull request");
}

#[yare::parameterized(
    empty   = { "" },
    not_hex = { "../../etc" },
)]
fn bad_sha_is_rejected(sha: &str) {
    let err = Trigger::from_pull_request(&payload("opened", sha)).unwrap_err();
    assert!(matches!(err, TriggerError::InvalidSha(_)));
}

#[test]
fn missing_fields_are_malformed() {
    let err = Trigger::from_pull_request(br#"{"action": "opened"}"#).unwrap_err();
    assert!(matches!(err, TriggerError::Payload(_)));
}
