// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

/// Scheduler-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerMetrics {
    pub total_runs: u64,
    /// Runs skipped because of system load
    pub skipped_runs: u64,
    pub cached_hits: u64,
    pub file_change_triggers: u64,
    /// Interval changes caused by health reports
    pub adaptive_adjustments: u64,
    pub total_execution_time_ms: u64,
}

impl SchedulerMetrics {
    pub fn avg_execution_time_ms(&self) -> u64 {
        self.total_execution_time_ms
            .checked_div(self.total_runs)
            .unwrap_or(0)
    }
}
