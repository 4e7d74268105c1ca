// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: a scratch directory with a base image, a fake image
//! tool, and machines whose "VM" is a shell script.

pub use kiln_core::test_support::updates;
pub use kiln_core::{Build, FakeClock, StateValue, Update};
pub use kiln_engine::{Engine, EngineConfig, FakeStatusNotifier};
pub use std::path::{Path, PathBuf};

use kiln_sandbox::ContainerSpec;
use std::os::unix::fs::PermissionsExt;
use tempfile::{tempdir, TempDir};

/// Image tool that creates its last argument.
const TOUCH_TOOL: &str = "#!/bin/sh\nfor last; do :; done\ntouch \"$last\"\n";

pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("base.qcow2"), b"base").unwrap();
        let tool = dir.path().join("qemu-img");
        std::fs::write(&tool, TOUCH_TOOL).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Machine whose VM runs `script` under `sh`.
    pub fn machine(&self, id: &str, script: &str) -> ContainerSpec {
        let script_path = self.path(&format!("{id}.sh"));
        std::fs::write(&script_path, script).unwrap();
        ContainerSpec {
            base_image: PathBuf::from("base.qcow2"),
            overlay_image: PathBuf::from(format!("{id}.qcow2")),
            command: format!("sh {}", script_path.display()),
            image_tool: Some(self.path("qemu-img").to_string_lossy().into_owned()),
            ssh_port: None,
        }
    }

    pub fn engine(&self, machines: &[(&str, &str)]) -> Engine<FakeClock> {
        let mut config = EngineConfig::parse("state_dir = \"state\"", self.root().to_path_buf())
            .unwrap();
        for (id, script) in machines {
            config.machines.insert(id.to_string(), self.machine(id, script));
        }
        Engine::with_clock(config, FakeClock::new())
    }

    pub fn log_path(&self, build_id: &str) -> PathBuf {
        self.path("state").join("builds").join(format!("{build_id}.log"))
    }

    /// Files left next to the base image, other than fixtures.
    pub fn leftovers(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".qcow2_"))
            .collect();
        names.sort();
        names
    }
}

/// Script line printing `update` as a record.
pub fn emit(update: &Update) -> String {
    format!("printf '%s\\n' '{}'\n", update.serialize().unwrap())
}
