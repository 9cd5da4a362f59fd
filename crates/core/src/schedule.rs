// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent schedule state and the interval adaptation rules
//!
//! A [`ScheduleRecord`] is pure data plus pure transitions. The engine's
//! scheduler owns the records, serializes access to them, and supplies the
//! clock readings; nothing in here touches the filesystem or the clock.

use crate::agent::AgentResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Step added to the interval on each early healthy report
pub const GRADUAL_EXTENSION: Duration = Duration::from_secs(30);

/// Consecutive clean runs needed before jumping straight to the healthy interval
pub const HEALTHY_STREAK: u32 = 3;

/// Execution priority. Lower ordinal runs first when several agents are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical = 1,
    High = 2,
    Normal = 3,
    Low = 4,
    Idle = 5,
}

impl Priority {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Agents below High give way to system load
    pub fn yields_to_load(self) -> bool {
        self > Priority::High
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
            Priority::Low => "LOW",
            Priority::Idle => "IDLE",
        };
        write!(f, "{}", s)
    }
}

/// Observed health of an agent's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Severity rank used to fold many statuses into one
    fn rank(self) -> u8 {
        match self {
            HealthStatus::Unknown => 0,
            HealthStatus::Healthy => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Critical => 3,
        }
    }

    /// Worst of two statuses; Unknown only wins against Unknown
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Static schedule settings for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub agent_name: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default = "default_base", with = "humantime_serde")]
    pub base_interval: Duration,
    #[serde(default = "default_healthy", with = "humantime_serde")]
    pub healthy_interval: Duration,
    #[serde(default = "default_degraded", with = "humantime_serde")]
    pub degraded_interval: Duration,
    #[serde(default = "default_critical", with = "humantime_serde")]
    pub critical_interval: Duration,
    /// Files whose content participates in the run decision
    #[serde(default)]
    pub watch_files: Vec<PathBuf>,
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Soft execution budget; the agent is expected to honor it
    #[serde(default = "default_budget", with = "humantime_serde")]
    pub max_execution_time: Duration,
    /// Normalized load above which low-priority agents are skipped
    #[serde(default = "default_load_threshold")]
    pub load_threshold: f64,
}

fn default_priority() -> Priority {
    Priority::Normal
}
fn default_base() -> Duration {
    Duration::from_secs(60)
}
fn default_healthy() -> Duration {
    Duration::from_secs(300)
}
fn default_degraded() -> Duration {
    Duration::from_secs(30)
}
fn default_critical() -> Duration {
    Duration::from_secs(10)
}
fn default_cache_ttl() -> Duration {
    Duration::from_secs(300)
}
fn default_budget() -> Duration {
    Duration::from_secs(30)
}
fn default_load_threshold() -> f64 {
    0.8
}

/// Rejected schedule settings
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("schedule for {agent}: intervals must satisfy critical <= degraded <= base <= healthy")]
    IntervalOrder { agent: String },
    #[error("schedule for {agent}: critical interval must be non-zero")]
    ZeroInterval { agent: String },
    #[error("schedule for {agent}: load threshold {value} outside 0.0..=1.0")]
    LoadThreshold { agent: String, value: f64 },
}

impl ScheduleConfig {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            priority: default_priority(),
            base_interval: default_base(),
            healthy_interval: default_healthy(),
            degraded_interval: default_degraded(),
            critical_interval: default_critical(),
            watch_files: Vec::new(),
            cache_ttl: default_cache_ttl(),
            max_execution_time: default_budget(),
            load_threshold: default_load_threshold(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set base, healthy, degraded and critical intervals in seconds
    pub fn with_intervals(mut self, base: u64, healthy: u64, degraded: u64, critical: u64) -> Self {
        self.base_interval = Duration::from_secs(base);
        self.healthy_interval = Duration::from_secs(healthy);
        self.degraded_interval = Duration::from_secs(degraded);
        self.critical_interval = Duration::from_secs(critical);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_watch_files<P: Into<PathBuf>>(mut self, files: impl IntoIterator<Item = P>) -> Self {
        self.watch_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_execution_time(mut self, budget: Duration) -> Self {
        self.max_execution_time = budget;
        self
    }

    pub fn with_load_threshold(mut self, threshold: f64) -> Self {
        self.load_threshold = threshold;
        self
    }

    /// Check the ordering the interval adaptation relies on
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.critical_interval.is_zero() {
            return Err(ScheduleError::ZeroInterval {
                agent: self.agent_name.clone(),
            });
        }
        let ordered = self.critical_interval <= self.degraded_interval
            && self.degraded_interval <= self.base_interval
            && self.base_interval <= self.healthy_interval;
        if !ordered {
            return Err(ScheduleError::IntervalOrder {
                agent: self.agent_name.clone(),
            });
        }
        if !(0.0..=1.0).contains(&self.load_threshold) {
            return Err(ScheduleError::LoadThreshold {
                agent: self.agent_name.clone(),
                value: self.load_threshold,
            });
        }
        Ok(())
    }
}

/// Built-in schedules for the stock agents
pub fn default_schedules() -> Vec<ScheduleConfig> {
    vec![
        ScheduleConfig::new("connection_tester")
            .with_priority(Priority::Critical)
            .with_intervals(60, 120, 30, 10)
            .with_cache_ttl(Duration::from_secs(30))
            .with_max_execution_time(Duration::from_secs(5)),
        ScheduleConfig::new("config_validator")
            .with_priority(Priority::Normal)
            .with_intervals(300, 600, 120, 60)
            .with_cache_ttl(Duration::from_secs(300))
            .with_watch_files([".env", ".env.example"])
            .with_max_execution_time(Duration::from_secs(10)),
        ScheduleConfig::new("auth_flow_tester")
            .with_priority(Priority::High)
            .with_intervals(600, 1800, 300, 60)
            .with_cache_ttl(Duration::from_secs(600))
            .with_max_execution_time(Duration::from_secs(15)),
    ]
}

/// A cached agent result and when it was produced
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub result: AgentResult,
    pub cached_at: Instant,
}

/// Outcome of a health report on a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalChange {
    pub from: Duration,
    pub to: Duration,
    pub previous_status: HealthStatus,
}

impl IntervalChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Live per-agent schedule state
#[derive(Debug, Clone)]
pub struct ScheduleRecord {
    pub config: ScheduleConfig,
    pub current_interval: Duration,
    pub last_run: Option<Instant>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_status: HealthStatus,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    /// Last observed content hash per watched file
    pub file_hashes: HashMap<PathBuf, String>,
    pub cached: Option<CachedResult>,
}

impl ScheduleRecord {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            current_interval: config.base_interval,
            config,
            last_run: None,
            last_run_at: None,
            last_status: HealthStatus::Unknown,
            consecutive_successes: 0,
            consecutive_failures: 0,
            file_hashes: HashMap::new(),
            cached: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.agent_name
    }

    /// Time since the last completed run
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_run.map(|at| now.saturating_duration_since(at))
    }

    /// Time until the current interval elapses; zero if never run
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.elapsed(now) {
            Some(elapsed) => self.current_interval.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }

    /// Stamp a completed execution
    pub fn mark_run(&mut self, now: Instant, at: DateTime<Utc>) {
        self.last_run = Some(now);
        self.last_run_at = Some(at);
    }

    /// Record an execution outcome and adapt the interval.
    ///
    /// A run is a success only when it is Healthy with zero findings; every
    /// other report counts as a failure. Exactly one counter moves per call.
    pub fn apply_health(
        &mut self,
        status: HealthStatus,
        findings_count: usize,
        now: Instant,
        at: DateTime<Utc>,
    ) -> IntervalChange {
        let from = self.current_interval;
        let previous_status = self.last_status;
        self.last_status = status;
        self.mark_run(now, at);

        let clean = status == HealthStatus::Healthy && findings_count == 0;
        if clean {
            self.consecutive_successes = self.consecutive_successes.saturating_add(1);
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            self.consecutive_successes = 0;
        }

        self.current_interval = match status {
            HealthStatus::Healthy if clean => {
                if self.consecutive_successes >= HEALTHY_STREAK {
                    self.config.healthy_interval
                } else {
                    (self.current_interval + GRADUAL_EXTENSION).min(self.config.healthy_interval)
                }
            }
            HealthStatus::Degraded => self.config.degraded_interval,
            HealthStatus::Critical => self.config.critical_interval,
            HealthStatus::Healthy | HealthStatus::Unknown => self.config.base_interval,
        };

        IntervalChange {
            from,
            to: self.current_interval,
            previous_status,
        }
    }

    /// Age of the cached result if it is still inside its TTL
    pub fn fresh_cache_age(&self, now: Instant) -> Option<Duration> {
        let cached = self.cached.as_ref()?;
        let age = now.saturating_duration_since(cached.cached_at);
        (age < self.config.cache_ttl).then_some(age)
    }

    /// Cached result if it is still inside its TTL
    pub fn fresh_cache(&self, now: Instant) -> Option<&AgentResult> {
        self.fresh_cache_age(now)?;
        self.cached.as_ref().map(|c| &c.result)
    }

    pub fn store_cache(&mut self, result: AgentResult, now: Instant) {
        self.cached = Some(CachedResult {
            result,
            cached_at: now,
        });
    }

    pub fn clear_cache(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
