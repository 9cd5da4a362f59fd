// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Vigil scheduling engine: smart scheduler, runner and monitoring loop

mod error;
mod metrics;
mod monitor;
mod registry;
mod runner;
mod scheduler;
mod startup;
mod status;
pub mod watch;

pub use error::RunError;
pub use metrics::SchedulerMetrics;
pub use monitor::{run_monitoring, run_tick, spawn_monitor, MonitorConfig, MonitorHandle, TickReport};
pub use registry::AgentRegistry;
pub use runner::{classify, OptimizedRunner, RunOutcome};
pub use scheduler::{Decision, NextRun, Reason, SmartScheduler};
pub use startup::{run_startup_checks, StartupCheck, StartupIssue, StartupReport, StartupStatus};
pub use status::{AgentStatus, MetricsView, NextRunView, SchedulerStatus};
