// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overlay sandboxes never touch the base image and clean up after themselves.

use crate::prelude::*;
use kiln_sandbox::{Container, ContainerConfig, Qemu};

fn qemu(scratch: &Scratch, script: &str) -> Qemu {
    let mut spec = scratch.machine("linux", script);
    spec.overlay_image = PathBuf::from("ov.qcow2");
    Qemu::new(ContainerConfig::configure("linux", &spec, scratch.root()).unwrap())
}

#[tokio::test]
async fn overlay_takes_the_next_free_name() {
    let scratch = Scratch::new();
    std::fs::write(scratch.path("ov.qcow2_00"), b"busy").unwrap();
    let mut vm = qemu(&scratch, "true\n");

    vm.prepare(false).await.unwrap();
    assert_eq!(vm.running_image(), Some(scratch.path("ov.qcow2_01").as_path()));

    vm.cleanup().await.unwrap();
    assert_eq!(scratch.leftovers(), vec!["ov.qcow2_00".to_string()]);
    assert_eq!(std::fs::read(scratch.path("base.qcow2")).unwrap(), b"base");
}

#[tokio::test]
async fn managed_sandbox_boots_the_base_image() {
    let scratch = Scratch::new();
    let mut vm = qemu(&scratch, "true\n");

    vm.prepare(true).await.unwrap();
    assert_eq!(vm.running_image(), Some(scratch.path("base.qcow2").as_path()));

    vm.cleanup().await.unwrap();
    assert!(scratch.path("base.qcow2").is_file());
    assert!(scratch.leftovers().is_empty());
}

#[tokio::test]
async fn sandbox_runs_to_completion_and_tears_down() {
    let scratch = Scratch::new();
    let mut vm = qemu(&scratch, "echo booted\n");

    vm.prepare(false).await.unwrap();
    vm.launch().await.unwrap();
    let status = vm.wait().await.unwrap().unwrap();
    vm.terminate().await.unwrap();
    vm.terminate().await.unwrap();
    vm.cleanup().await.unwrap();

    assert!(status.success());
    assert!(vm.ssh_port().is_some());
    assert!(scratch.leftovers().is_empty());
}
