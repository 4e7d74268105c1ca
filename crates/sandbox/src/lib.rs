// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-sandbox: disposable VM sandboxes booted from copy-on-write overlays
//!
//! A [`Container`] goes through `prepare` → `launch` → `is_running`/`wait`
//! → `terminate` → `cleanup`. [`Qemu`] is the only implementation.

pub mod command;
mod config;
mod container;
mod error;
mod qemu;

pub use command::{substitute, tokenize, CommandError, IMAGENAME, SSHPORT};
pub use config::{ContainerConfig, ContainerSpec, DEFAULT_IMAGE_TOOL};
pub use container::Container;
pub use error::SandboxError;
pub use qemu::{Qemu, MAX_OVERLAYS};
