// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A pull request event becomes a build with one job per machine.

use crate::prelude::*;
use kiln_engine::Trigger;
use serde_json::json;

const SHA: &str = "feedfacefeedfacefeedfacefeedfacefeedface";

fn trigger(action: &str) -> Option<Trigger> {
    let body = json!({
        "action": action,
        "sender": {"login": "rolf"},
        "pull_request": {
            "number": 12,
            "title": "Parallel jobs",
            "head": {
                "repo": {"clone_url": "/srv/kiln.git", "html_url": "/srv/kiln"},
                "sha": SHA,
                "ref": "parallel",
            },
            "statuses_url": "http://127.0.0.1:9/statuses",
        },
        "repository": {"full_name": "kiln/kiln"},
    });
    Trigger::from_pull_request(body.to_string().as_bytes()).unwrap()
}

#[tokio::test]
async fn pull_request_builds_every_machine() {
    let scratch = Scratch::new();
    let linux = format!(
        "{}{}echo linking\n",
        emit(&updates::step("linux", "compile", StateValue::Success, 5.0)),
        emit(&updates::output("linux", "kiln", 10)),
    );
    let engine = scratch.engine(&[("linux", &linux), ("bsd", "echo hi\nexit 1\n")]);
    let notifier = FakeStatusNotifier::new();

    let build = engine.run_trigger(&trigger("opened").unwrap(), notifier.clone()).await.unwrap();

    assert_eq!(build.id.as_str(), SHA);
    assert_eq!(build.sources.len(), 1);
    assert_eq!(build.job("linux").unwrap().state_value(), StateValue::Success);
    assert_eq!(build.job("bsd").unwrap().state_value(), StateValue::Failure);
    assert_eq!(build.state_value(), StateValue::Failure);
    assert!(build.job("linux").unwrap().output_items.contains_key("kiln"));
    assert!(scratch.log_path(SHA).is_file());
    assert!(scratch.leftovers().is_empty());

    let last = notifier.calls().pop().unwrap();
    assert_eq!((last.context.as_str(), last.state), ("kiln", StateValue::Failure));
    assert_eq!(last.description, "1/2 jobs failed");
}

#[tokio::test]
async fn watcher_sees_the_whole_build() {
    let scratch = Scratch::new();
    let engine = scratch.engine(&[("linux", "echo hello\n")]);
    let trigger = trigger("synchronize").unwrap();
    let id = trigger.build_id();
    let coordinator = engine.open_build(&id, FakeStatusNotifier::new()).unwrap();
    let mut watcher = coordinator.watch();

    let build = engine.drive(coordinator, trigger.build_source().unwrap()).await.unwrap();

    let mut kinds = Vec::new();
    while let Some(update) = watcher.recv().await {
        kinds.push(update.kind().tag());
    }
    assert_eq!(build.state_value(), StateValue::Success);
    assert_eq!(kinds.first(), Some(&"BuildSource"));
    assert_eq!(kinds.last(), Some(&"BuildState"));
    for kind in ["Enqueued", "JobCreated", "JobState", "StdOut"] {
        assert!(kinds.contains(&kind), "{kind} missing from {kinds:?}");
    }
}

#[test]
fn closed_pull_requests_do_not_build() {
    assert!(trigger("closed").is_none());
}
