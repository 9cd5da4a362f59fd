// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serializable scheduler status export

use crate::metrics::SchedulerMetrics;
use crate::scheduler::NextRun;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use vg_core::{HealthStatus, Priority, ScheduleRecord};

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub global_health: HealthStatus,
    pub metrics: MetricsView,
    pub schedules: Vec<AgentStatus>,
    pub next_runs: Vec<NextRunView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsView {
    #[serde(flatten)]
    pub counters: SchedulerMetrics,
    pub avg_execution_time_ms: u64,
}

impl From<&SchedulerMetrics> for MetricsView {
    fn from(metrics: &SchedulerMetrics) -> Self {
        Self {
            counters: metrics.clone(),
            avg_execution_time_ms: metrics.avg_execution_time_ms(),
        }
    }
}

/// Per-agent view of a schedule record
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub agent: String,
    pub priority: Priority,
    pub current_interval_secs: u64,
    pub base_interval_secs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_status: HealthStatus,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    pub cache_valid: bool,
    pub watched_files: usize,
}

impl AgentStatus {
    pub fn from_record(record: &ScheduleRecord, now: Instant) -> Self {
        Self {
            agent: record.name().to_string(),
            priority: record.config.priority,
            current_interval_secs: record.current_interval.as_secs(),
            base_interval_secs: record.config.base_interval.as_secs(),
            last_run: record.last_run_at,
            last_status: record.last_status,
            consecutive_successes: record.consecutive_successes,
            consecutive_failures: record.consecutive_failures,
            cache_valid: record.fresh_cache_age(now).is_some(),
            watched_files: record.config.watch_files.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextRunView {
    pub agent: String,
    pub seconds_remaining: u64,
}

impl From<NextRun> for NextRunView {
    fn from(next: NextRun) -> Self {
        Self {
            agent: next.agent,
            seconds_remaining: next.remaining.as_secs(),
        }
    }
}
