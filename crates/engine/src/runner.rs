// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optimized runner: drives agents through the scheduler's decisions

use crate::error::RunError;
use crate::registry::AgentRegistry;
use crate::scheduler::{Reason, SmartScheduler};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use vg_adapters::{Agent, AgentError};
use vg_core::{AgentResult, Clock, ExecutionStatus, HealthStatus, RunType};

/// What a call to the runner produced
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The agent executed
    Fresh(AgentResult),
    /// The run was skipped and a cached result is still valid
    Cached { result: AgentResult, reason: Reason },
    /// The run was skipped and nothing is cached
    Skipped { reason: Reason },
}

impl RunOutcome {
    /// Result to hand to the caller, fresh or cached
    pub fn result(&self) -> Option<&AgentResult> {
        match self {
            RunOutcome::Fresh(result) | RunOutcome::Cached { result, .. } => Some(result),
            RunOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, RunOutcome::Fresh(_))
    }
}

/// Health signal for a completed execution
pub fn classify(result: &AgentResult) -> HealthStatus {
    if result.status == ExecutionStatus::Failed || result.has_critical_findings() {
        HealthStatus::Critical
    } else if !result.findings.is_empty() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Marks an agent in flight until dropped
struct InFlight<'a> {
    running: &'a Mutex<HashSet<String>>,
    agent: String,
}

impl<'a> InFlight<'a> {
    fn acquire(running: &'a Mutex<HashSet<String>>, agent: &str) -> Option<Self> {
        let inserted = running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(agent.to_string());
        inserted.then(|| Self {
            running,
            agent: agent.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.agent);
    }
}

/// Bridges scheduler decisions to agent execution.
///
/// At most one execution per agent is in flight; a concurrent request for
/// the same agent is served from cache or skipped.
pub struct OptimizedRunner<C: Clock> {
    scheduler: Arc<SmartScheduler<C>>,
    registry: AgentRegistry,
    running: Mutex<HashSet<String>>,
    enforce_timeouts: bool,
}

impl<C: Clock> OptimizedRunner<C> {
    pub fn new(scheduler: Arc<SmartScheduler<C>>, registry: AgentRegistry) -> Self {
        Self {
            scheduler,
            registry,
            running: Mutex::new(HashSet::new()),
            enforce_timeouts: false,
        }
    }

    /// Bound each execution by the schedule's `max_execution_time`
    pub fn enforce_timeouts(mut self, enforce: bool) -> Self {
        self.enforce_timeouts = enforce;
        self
    }

    pub fn scheduler(&self) -> &Arc<SmartScheduler<C>> {
        &self.scheduler
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn is_running(&self, agent: &str) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(agent)
    }

    /// Run an agent if the scheduler says so, or unconditionally when forced.
    ///
    /// A skip returns the cached result when one is still valid. Agent
    /// failures are reported to the scheduler as Critical and returned as
    /// [`RunError::Agent`]. The gates are evaluated only after the agent is
    /// claimed; a busy agent leaves watched-file changes pending.
    pub async fn run_agent_if_needed(&self, name: &str, force: bool) -> Result<RunOutcome, RunError> {
        let Some(in_flight) = InFlight::acquire(&self.running, name) else {
            tracing::debug!(agent = name, "agent already running");
            return Ok(self.serve_cached(name, Reason::InFlight));
        };
        if !force {
            let decision = self.scheduler.should_run(name);
            if !decision.run {
                tracing::debug!(agent = name, reason = %decision.reason, "skipping agent");
                return Ok(self.serve_cached(name, decision.reason));
            }
        }
        let run_type = if force {
            RunType::Manual
        } else {
            RunType::Scheduled
        };
        self.execute_claimed(name, run_type, in_flight).await
    }

    /// Execute an agent now, bypassing the scheduler's gates
    pub async fn run_now(&self, name: &str, run_type: RunType) -> Result<RunOutcome, RunError> {
        let Some(in_flight) = InFlight::acquire(&self.running, name) else {
            tracing::debug!(agent = name, "agent already running");
            return Ok(self.serve_cached(name, Reason::InFlight));
        };
        self.execute_claimed(name, run_type, in_flight).await
    }

    async fn execute_claimed(
        &self,
        name: &str,
        run_type: RunType,
        _in_flight: InFlight<'_>,
    ) -> Result<RunOutcome, RunError> {
        let Some(agent) = self.registry.get(name) else {
            tracing::warn!(agent = name, "agent not found in registry");
            return Err(RunError::UnknownAgent(name.to_string()));
        };

        let budget = self
            .scheduler
            .schedule(name)
            .map(|s| s.max_execution_time)
            .filter(|_| self.enforce_timeouts);

        let started = Instant::now();
        let result = execute(agent, run_type, budget).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.scheduler.record_execution(name, elapsed_ms);

        match result {
            Ok(result) => {
                let status = classify(&result);
                self.scheduler
                    .update_health(name, status, result.findings.len());
                self.scheduler.cache_result(name, result.clone());
                tracing::debug!(agent = name, %status, elapsed_ms, "agent run recorded");
                Ok(RunOutcome::Fresh(result))
            }
            Err(e) => {
                tracing::error!(agent = name, error = %e, elapsed_ms, "agent execution failed");
                self.scheduler.update_health(name, HealthStatus::Critical, 0);
                Err(RunError::Agent {
                    agent: name.to_string(),
                    source: e,
                })
            }
        }
    }

    fn serve_cached(&self, name: &str, reason: Reason) -> RunOutcome {
        match self.scheduler.get_cached_result(name) {
            Some(result) => RunOutcome::Cached { result, reason },
            None => RunOutcome::Skipped { reason },
        }
    }
}

/// Run the agent on its own task so a panic surfaces as an error
async fn execute(
    agent: Arc<dyn Agent>,
    run_type: RunType,
    budget: Option<Duration>,
) -> Result<AgentResult, AgentError> {
    let mut handle = tokio::spawn(async move { agent.execute(run_type).await });
    let joined = match budget {
        Some(budget) => match tokio::time::timeout(budget, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                return Err(AgentError::Timeout { budget });
            }
        },
        None => handle.await,
    };
    joined.unwrap_or_else(|e| Err(AgentError::Aborted(e.to_string())))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
