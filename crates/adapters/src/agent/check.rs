// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared execution driver for check-based agents

use super::{Agent, AgentError};
use async_trait::async_trait;
use std::time::Instant;
use vg_core::{AgentResult, Finding, RunType};

/// The checks an agent performs, without the execution bookkeeping
#[async_trait]
pub trait CheckSuite: Send + Sync {
    fn name(&self) -> &str;

    fn is_critical(&self) -> bool {
        false
    }

    async fn run_checks(&self) -> Result<Vec<Finding>, AgentError>;

    /// Try to repair an auto-fixable finding. Returns whether it was fixed.
    async fn auto_fix(&self, _finding: &Finding) -> Result<bool, AgentError> {
        Ok(false)
    }
}

/// Adapts a [`CheckSuite`] to the [`Agent`] contract
#[derive(Clone)]
pub struct CheckAgent<S> {
    suite: S,
}

impl<S> CheckAgent<S> {
    pub fn new(suite: S) -> Self {
        Self { suite }
    }

    pub fn suite(&self) -> &S {
        &self.suite
    }
}

impl<S: CheckSuite> CheckAgent<S> {
    async fn remediate(&self, findings: &mut [Finding]) -> u32 {
        let mut fixed = 0;
        for finding in findings
            .iter_mut()
            .filter(|f| f.auto_fixable && !f.auto_fixed)
        {
            match self.suite.auto_fix(finding).await {
                Ok(true) => {
                    finding.auto_fixed = true;
                    fixed += 1;
                    tracing::info!(
                        agent = self.suite.name(),
                        finding = %finding.name,
                        fix = finding.fix_action.as_deref().unwrap_or(""),
                        "auto-fixed"
                    );
                }
                Ok(false) => {}
                Err(e) => tracing::error!(
                    agent = self.suite.name(),
                    finding = %finding.name,
                    error = %e,
                    "auto-fix failed"
                ),
            }
        }
        fixed
    }
}

#[async_trait]
impl<S: CheckSuite> Agent for CheckAgent<S> {
    fn name(&self) -> &str {
        self.suite.name()
    }

    fn is_critical(&self) -> bool {
        self.suite.is_critical()
    }

    async fn execute(&self, run_type: RunType) -> Result<AgentResult, AgentError> {
        let start = Instant::now();
        let name = self.suite.name();

        match self.suite.run_checks().await {
            Ok(mut findings) => {
                let remediations = self.remediate(&mut findings).await;
                let mut result = AgentResult::completed(name, run_type, findings);
                result.remediations_count = remediations;
                result.execution_time_ms = start.elapsed().as_millis() as u64;
                Ok(result)
            }
            Err(e) => {
                tracing::error!(agent = name, %run_type, error = %e, "checks failed");
                let mut result = AgentResult::failed(name, run_type, e.to_string());
                result.execution_time_ms = start.elapsed().as_millis() as u64;
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
