// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vg-core: data model for the vigil agent scheduler
//!
//! This crate provides:
//! - Clock abstraction for deterministic time in tests
//! - Schedule records and the interval adaptation rules
//! - Agent findings and execution results

pub mod agent;
pub mod clock;
pub mod schedule;

pub use agent::{AgentResult, ExecutionStatus, Finding, MetaValue, RunType, Severity};
pub use clock::{Clock, FakeClock, SystemClock};
pub use schedule::{
    default_schedules, CachedResult, HealthStatus, IntervalChange, Priority, ScheduleConfig,
    ScheduleError, ScheduleRecord,
};
