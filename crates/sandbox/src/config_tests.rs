// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::command::CommandError;
use tempfile::tempdir;

fn spec(base: &str, overlay: &str) -> ContainerSpec {
    ContainerSpec {
        base_image: base.into(),
        overlay_image: overlay.into(),
        command: "qemu-system-x86_64 -hda IMAGENAME".into(),
        image_tool: None,
        ssh_port: None,
    }
}

#[test]
fn relative_paths_resolve_against_base_dir() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("base.qcow2"), b"").unwrap();

    let cfg = ContainerConfig::configure("linux", &spec("base.qcow2", "ov.qcow2"), dir.path())
        .unwrap();

    assert_eq!(cfg.machine_id, "linux");
    assert_eq!(cfg.base_image, dir.path().join("base.qcow2"));
    assert_eq!(cfg.overlay_image, dir.path().join("ov.qcow2"));
    assert_eq!(cfg.image_tool, DEFAULT_IMAGE_TOOL);
    assert_eq!(cfg.ssh_port, None);
}

#[test]
fn absolute_paths_are_kept() {
    let images = tempdir().unwrap();
    let other = tempdir().unwrap();
    let base = images.path().join("base.qcow2");
    std::fs::write(&base, b"").unwrap();
    let overlay = images.path().join("ov.qcow2");

    let cfg = ContainerConfig::configure(
        "linux",
        &spec(base.to_str().unwrap(), overlay.to_str().unwrap()),
        other.path(),
    )
    .unwrap();

    assert_eq!(cfg.base_image, base);
    assert_eq!(cfg.overlay_image, overlay);
}

#[test]
fn missing_base_image_is_rejected() {
    let dir = tempdir().unwrap();
    let err = ContainerConfig::configure("linux", &spec("nope.qcow2", "ov.qcow2"), dir.path())
        .unwrap_err();
    assert!(matches!(err, SandboxError::BaseImageNotFound(p) if p == dir.path().join("nope.qcow2")));
}

#[test]
fn directory_is_not_a_base_image() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("base.qcow2")).unwrap();
    let err = ContainerConfig::configure("linux", &spec("base.qcow2", "ov.qcow2"), dir.path())
        .unwrap_err();
    assert!(matches!(err, SandboxError::BaseImageNotFound(_)));
}

#[test]
fn unparseable_command_is_rejected() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("base.qcow2"), b"").unwrap();
    let mut spec = spec("base.qcow2", "ov.qcow2");
    spec.command = "qemu -append 'console=ttyS0".into();

    let err = ContainerConfig::configure("linux", &spec, dir.path()).unwrap_err();

    assert!(matches!(
        err,
        SandboxError::Command { source: CommandError::UnterminatedSingleQuote, .. }
    ));
}

#[test]
fn spec_reads_from_toml() {
    let spec: ContainerSpec = toml::from_str(
        r#"
        base_image = "images/base.qcow2"
        overlay_image = "/var/tmp/ov.qcow2"
        command = "qemu-system-x86_64 -hda IMAGENAME -net user,hostfwd=tcp::SSHPORT-:22"
        image_tool = "/usr/local/bin/qemu-img"
        ssh_port = 2222
        "#,
    )
    .unwrap();

    assert_eq!(spec.base_image, PathBuf::from("images/base.qcow2"));
    assert_eq!(spec.image_tool.as_deref(), Some("/usr/local/bin/qemu-img"));
    assert_eq!(spec.ssh_port, Some(2222));
}
