// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox fixtures shared by runner, coordinator and engine tests.
//!
//! Machines run a shell script instead of a VM and use a fake image tool
//! that just creates the overlay file.

use kiln_core::Update;
use kiln_sandbox::{ContainerConfig, ContainerSpec};
use parking_lot::Mutex;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TOUCH_TOOL: &str = "#!/bin/sh\nfor last; do :; done\ntouch \"$last\"\n";
const FAILING_TOOL: &str = "#!/bin/sh\necho 'backing file missing' >&2\nexit 3\n";

pub(crate) struct VmFixture {
    dir: TempDir,
}

impl VmFixture {
    pub(crate) fn new() -> Self {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("base.qcow2"), b"base").unwrap();
        for (name, body) in [("touch-img", TOUCH_TOOL), ("failing-img", FAILING_TOOL)] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        Self { dir }
    }

    pub(crate) fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Machine config whose "VM" is `sh` running `script`.
    pub(crate) fn spec(&self, id: &str, script: &str) -> ContainerSpec {
        let script_path = self.path(&format!("{id}.sh"));
        std::fs::write(&script_path, script).unwrap();
        ContainerSpec {
            base_image: self.path("base.qcow2"),
            overlay_image: self.path(&format!("{id}.qcow2")),
            command: format!("sh {}", script_path.display()),
            image_tool: Some(self.path("touch-img").to_string_lossy().into_owned()),
            ssh_port: Some(2222),
        }
    }

    pub(crate) fn machine(&self, id: &str, script: &str) -> ContainerConfig {
        ContainerConfig::configure(id, &self.spec(id, script), self.dir.path()).unwrap()
    }

    /// Machine whose overlay can never be created.
    pub(crate) fn broken_machine(&self, id: &str) -> ContainerConfig {
        let mut spec = self.spec(id, "exit 0\n");
        spec.image_tool = Some(self.path("failing-img").to_string_lossy().into_owned());
        ContainerConfig::configure(id, &spec, self.dir.path()).unwrap()
    }

    /// Overlay files currently left in the fixture directory.
    pub(crate) fn overlays(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".qcow2_"))
            .collect();
        names.sort();
        names
    }
}

/// Route engine logs to the test harness; filter with `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Script line printing `update` as a record on stdout.
pub(crate) fn emit(update: &Update) -> String {
    format!("printf '%s\\n' '{}'\n", update.serialize().unwrap())
}

/// Read one HTTP request (headers plus content-length body).
pub(crate) async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse().ok())?
                })
                .unwrap_or(0usize);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8(buf).unwrap()
}

/// Status endpoint accepting every POST with 201, keeping the bodies.
pub(crate) struct StatusServer {
    pub(crate) url: String,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl StatusServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/statuses", listener.local_addr().unwrap());
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&bodies);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { return };
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let request = read_request(&mut stream).await;
                    if let Some((_, body)) = request.split_once("\r\n\r\n") {
                        if let Ok(value) = serde_json::from_str(body) {
                            seen.lock().push(value);
                        }
                    }
                    let response =
                        "HTTP/1.1 201 Created\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
                    let _ = stream.write_all(response.as_bytes()).await;
                });
            }
        });
        Self { url, bodies }
    }

    pub(crate) fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().clone()
    }
}
