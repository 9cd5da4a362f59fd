// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vg-daemon: configuration, built-in agents and lifecycle for `vigild`

pub mod agents;
pub mod config;
pub mod lifecycle;

pub use config::{DaemonSection, ProbeConfig, ValidatorSection, VigilConfig, DEFAULT_CONFIG_FILE};
pub use lifecycle::{startup, startup_with, Daemon, LifecycleError, OnceReport};
