// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Smart scheduler: run decisions, interval adaptation and the result cache.
//!
//! All schedule records live behind one mutex. Every read-modify-write on a
//! record (health update, cache read/write, file-hash compare-and-update)
//! happens under it; file reads and load sampling happen outside it.

use crate::metrics::SchedulerMetrics;
use crate::status::{AgentStatus, NextRunView, SchedulerStatus};
use crate::watch;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use vg_adapters::{LoadProbe, SystemLoad};
use vg_core::{
    AgentResult, Clock, HealthStatus, IntervalChange, Priority, ScheduleConfig, ScheduleError,
    ScheduleRecord, SystemClock,
};

/// Why a run decision came out the way it did
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// No schedule registered for the agent
    NoSchedule,
    FileChanged,
    IntervalNotReached { elapsed: Duration, interval: Duration },
    /// Watched files are unchanged and the healthy window has not passed
    FilesUnchanged,
    HighLoad { load: f64 },
    CacheValid { age: Duration },
    /// Another execution of the agent is in progress (runner only)
    InFlight,
    Scheduled,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::NoSchedule => write!(f, "no_schedule"),
            Reason::FileChanged => write!(f, "file_changed"),
            Reason::IntervalNotReached { elapsed, interval } => write!(
                f,
                "interval_not_reached ({}s < {}s)",
                elapsed.as_secs(),
                interval.as_secs()
            ),
            Reason::FilesUnchanged => write!(f, "files_unchanged"),
            Reason::HighLoad { load } => write!(f, "high_load ({:.1}%)", load * 100.0),
            Reason::CacheValid { age } => write!(f, "cache_valid ({}s old)", age.as_secs()),
            Reason::InFlight => write!(f, "in_flight"),
            Reason::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Outcome of [`SmartScheduler::should_run`]
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub run: bool,
    pub reason: Reason,
}

impl Decision {
    fn run(reason: Reason) -> Self {
        Self { run: true, reason }
    }

    fn skip(reason: Reason) -> Self {
        Self { run: false, reason }
    }
}

/// One entry of [`SmartScheduler::get_next_scheduled`]
#[derive(Debug, Clone, PartialEq)]
pub struct NextRun {
    pub agent: String,
    pub priority: Priority,
    /// Zero for agents that never ran or whose interval has elapsed
    pub remaining: Duration,
}

impl NextRun {
    pub fn is_due(&self) -> bool {
        self.remaining.is_zero()
    }
}

#[derive(Default)]
struct SchedulerState {
    records: HashMap<String, ScheduleRecord>,
    metrics: SchedulerMetrics,
}

/// Adaptive, priority-aware scheduler for a fleet of agents
pub struct SmartScheduler<C: Clock = SystemClock> {
    clock: C,
    load: Arc<dyn LoadProbe>,
    project_root: PathBuf,
    state: Mutex<SchedulerState>,
}

impl SmartScheduler<SystemClock> {
    /// Scheduler on the system clock and system load average
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_parts(SystemClock, Arc::new(SystemLoad::new()), project_root)
    }
}

impl<C: Clock> SmartScheduler<C> {
    pub fn with_parts(
        clock: C,
        load: Arc<dyn LoadProbe>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clock,
            load,
            project_root: project_root.into(),
            state: Mutex::new(SchedulerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Install or replace the schedule for an agent
    pub fn register_agent(&self, config: ScheduleConfig) -> Result<(), ScheduleError> {
        config.validate()?;
        tracing::info!(
            agent = %config.agent_name,
            priority = %config.priority,
            interval_secs = config.base_interval.as_secs(),
            "registered schedule"
        );
        let name = config.agent_name.clone();
        self.lock().records.insert(name, ScheduleRecord::new(config));
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().records.contains_key(name)
    }

    /// Snapshot of an agent's schedule record
    pub fn record(&self, name: &str) -> Option<ScheduleRecord> {
        self.lock().records.get(name).cloned()
    }

    /// Schedule configuration for an agent
    pub fn schedule(&self, name: &str) -> Option<ScheduleConfig> {
        self.lock().records.get(name).map(|r| r.config.clone())
    }

    /// Decide whether an agent should run now.
    ///
    /// Gates, in order: file changes (may override the interval), the
    /// adapted interval, the unchanged-files window, system load for
    /// agents below High priority, and the result cache. A skip caused by
    /// the interval reports `cache_valid` when a fresh result is cached,
    /// since that is what the caller should serve.
    pub fn should_run(&self, name: &str) -> Decision {
        let (watch_files, priority, threshold) = {
            let state = self.lock();
            match state.records.get(name) {
                Some(record) => (
                    record.config.watch_files.clone(),
                    record.config.priority,
                    record.config.load_threshold,
                ),
                None => return Decision::run(Reason::NoSchedule),
            }
        };

        let observed = if watch_files.is_empty() {
            Vec::new()
        } else {
            watch::observe(&self.project_root, &watch_files)
        };
        let load = priority.yields_to_load().then(|| self.load.sample());

        let now = self.clock.now();
        let mut guard = self.lock();
        let SchedulerState { records, metrics } = &mut *guard;
        let Some(record) = records.get_mut(name) else {
            return Decision::run(Reason::NoSchedule);
        };

        if !watch_files.is_empty() {
            let changed = watch::apply_observations(&mut record.file_hashes, observed);
            if !changed.is_empty() {
                metrics.file_change_triggers += 1;
                tracing::info!(agent = name, files = ?changed, "watched files changed");
                return Decision::run(Reason::FileChanged);
            }
        }

        if let Some(elapsed) = record.elapsed(now) {
            if elapsed < record.current_interval {
                if let Some(age) = record.fresh_cache_age(now) {
                    metrics.cached_hits += 1;
                    return Decision::skip(Reason::CacheValid { age });
                }
                return Decision::skip(Reason::IntervalNotReached {
                    elapsed,
                    interval: record.current_interval,
                });
            }
            // keyed off the healthy interval whatever the current health
            if !watch_files.is_empty() && elapsed < record.config.healthy_interval {
                return Decision::skip(Reason::FilesUnchanged);
            }
        }

        if let Some(load) = load {
            if load > threshold {
                metrics.skipped_runs += 1;
                return Decision::skip(Reason::HighLoad { load });
            }
        }

        if let Some(age) = record.fresh_cache_age(now) {
            metrics.cached_hits += 1;
            return Decision::skip(Reason::CacheValid { age });
        }

        Decision::run(Reason::Scheduled)
    }

    /// Report an execution outcome and adapt the agent's interval.
    ///
    /// Returns `None` for unregistered agents.
    pub fn update_health(
        &self,
        name: &str,
        status: HealthStatus,
        findings_count: usize,
    ) -> Option<IntervalChange> {
        let now = self.clock.now();
        let at = self.clock.utc_now();
        let mut guard = self.lock();
        let SchedulerState { records, metrics } = &mut *guard;
        let record = records.get_mut(name)?;
        let change = record.apply_health(status, findings_count, now, at);

        if change.changed() {
            metrics.adaptive_adjustments += 1;
            tracing::info!(
                agent = name,
                from_secs = change.from.as_secs(),
                to_secs = change.to.as_secs(),
                previous = %change.previous_status,
                status = %status,
                "adaptive interval changed"
            );
        }
        Some(change)
    }

    pub fn cache_result(&self, name: &str, result: AgentResult) {
        let now = self.clock.now();
        if let Some(record) = self.lock().records.get_mut(name) {
            record.store_cache(result, now);
        }
    }

    /// Cached result, only while it is inside its TTL
    pub fn get_cached_result(&self, name: &str) -> Option<AgentResult> {
        let now = self.clock.now();
        self.lock()
            .records
            .get(name)
            .and_then(|record| record.fresh_cache(now).cloned())
    }

    pub fn invalidate_cache(&self, name: &str) {
        if let Some(record) = self.lock().records.get_mut(name) {
            record.clear_cache();
            tracing::debug!(agent = name, "cache invalidated");
        }
    }

    /// Agents ordered by priority, then by time until their next run
    pub fn get_next_scheduled(&self) -> Vec<NextRun> {
        let now = self.clock.now();
        let mut next: Vec<NextRun> = self
            .lock()
            .records
            .values()
            .map(|record| NextRun {
                agent: record.name().to_string(),
                priority: record.config.priority,
                remaining: record.remaining(now),
            })
            .collect();
        next.sort_by(|a, b| {
            (a.priority, a.remaining, &a.agent).cmp(&(b.priority, b.remaining, &b.agent))
        });
        next
    }

    /// Count an execution and its duration; also stamps the last run
    pub fn record_execution(&self, name: &str, execution_time_ms: u64) {
        let now = self.clock.now();
        let at = self.clock.utc_now();
        let mut guard = self.lock();
        guard.metrics.total_runs += 1;
        guard.metrics.total_execution_time_ms = guard
            .metrics
            .total_execution_time_ms
            .saturating_add(execution_time_ms);
        if let Some(record) = guard.records.get_mut(name) {
            record.mark_run(now, at);
        }
    }

    /// Worst last status across agents; Unknown until something has run
    pub fn global_health(&self) -> HealthStatus {
        self.lock()
            .records
            .values()
            .fold(HealthStatus::Unknown, |acc, r| acc.worst(r.last_status))
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        self.lock().metrics.clone()
    }

    /// Serializable snapshot of the whole scheduler
    pub fn status(&self) -> SchedulerStatus {
        let now = self.clock.now();
        let next_runs = self
            .get_next_scheduled()
            .into_iter()
            .map(NextRunView::from)
            .collect();

        let state = self.lock();
        let global_health = state
            .records
            .values()
            .fold(HealthStatus::Unknown, |acc, r| acc.worst(r.last_status));
        let mut schedules: Vec<AgentStatus> = state
            .records
            .values()
            .map(|record| AgentStatus::from_record(record, now))
            .collect();
        schedules.sort_by(|a, b| a.agent.cmp(&b.agent));

        SchedulerStatus {
            global_health,
            metrics: (&state.metrics).into(),
            schedules,
            next_runs,
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
