// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced agent wrapper for consistent observability

use crate::agent::{Agent, AgentError};
use async_trait::async_trait;
use tracing::Instrument;
use vg_core::{AgentResult, ExecutionStatus, RunType, Severity};

/// Wrapper that adds tracing to any Agent
#[derive(Clone)]
pub struct TracedAgent<A> {
    inner: A,
}

impl<A> TracedAgent<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: Agent> Agent for TracedAgent<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_critical(&self) -> bool {
        self.inner.is_critical()
    }

    async fn execute(&self, run_type: RunType) -> Result<AgentResult, AgentError> {
        let span = tracing::info_span!("agent.execute", agent = self.inner.name(), %run_type);

        async {
            tracing::info!("starting");

            let start = std::time::Instant::now();
            let result = self.inner.execute(run_type).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(r) if r.status == ExecutionStatus::Failed => tracing::error!(
                    elapsed_ms,
                    error = r.error_message.as_deref().unwrap_or("unknown"),
                    "failed"
                ),
                Ok(r) => {
                    let critical = r.count_severity(Severity::Critical);
                    let warnings = r.count_severity(Severity::Warning);
                    if critical > 0 {
                        tracing::error!(critical, warnings, elapsed_ms, "critical findings");
                    } else if warnings > 0 {
                        tracing::warn!(warnings, elapsed_ms, "completed with warnings");
                    } else {
                        tracing::info!(
                            findings = r.findings.len(),
                            remediations = r.remediations_count,
                            elapsed_ms,
                            "completed"
                        );
                    }
                }
                Err(e) => tracing::error!(elapsed_ms, error = %e, "execution error"),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
