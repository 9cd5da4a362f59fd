// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking startup validation of critical agents

use crate::runner::{OptimizedRunner, RunOutcome};
use serde::Serialize;
use vg_core::{Clock, ExecutionStatus, RunType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupStatus {
    Healthy,
    Failed,
}

/// Critical finding surfaced at startup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupIssue {
    pub name: String,
    pub title: String,
    pub description: String,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupCheck {
    pub agent: String,
    pub status: StartupStatus,
    pub findings: usize,
    pub critical_findings: usize,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<StartupIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StartupReport {
    pub checks: Vec<StartupCheck>,
}

impl StartupReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.status == StartupStatus::Healthy)
    }

    pub fn failed(&self) -> impl Iterator<Item = &StartupCheck> {
        self.checks.iter().filter(|c| c.status == StartupStatus::Failed)
    }
}

/// Execute every critical agent once and report the outcome.
///
/// Results feed the scheduler like any other run.
pub async fn run_startup_checks<C: Clock>(runner: &OptimizedRunner<C>) -> StartupReport {
    let names: Vec<String> = runner
        .registry()
        .critical()
        .map(|a| a.name().to_string())
        .collect();
    tracing::info!(agents = names.len(), "running startup checks");

    let mut report = StartupReport::default();
    for agent in names {
        let check = match runner.run_now(&agent, RunType::Startup).await {
            Ok(RunOutcome::Fresh(result)) => {
                let issues: Vec<StartupIssue> = result
                    .critical_findings()
                    .map(|f| StartupIssue {
                        name: f.name.clone(),
                        title: f.title.clone(),
                        description: f.description.clone(),
                        fix: f.fix_action.clone(),
                    })
                    .collect();
                let failed = !issues.is_empty() || result.status == ExecutionStatus::Failed;
                StartupCheck {
                    agent,
                    status: if failed {
                        StartupStatus::Failed
                    } else {
                        StartupStatus::Healthy
                    },
                    findings: result.findings.len(),
                    critical_findings: issues.len(),
                    execution_time_ms: result.execution_time_ms,
                    issues,
                    error: result.error_message.clone(),
                }
            }
            Ok(other) => {
                tracing::warn!(agent = %agent, ?other, "startup check did not execute");
                StartupCheck {
                    agent,
                    status: StartupStatus::Failed,
                    findings: 0,
                    critical_findings: 0,
                    execution_time_ms: 0,
                    issues: Vec::new(),
                    error: Some("check did not execute".to_string()),
                }
            }
            Err(e) => {
                tracing::error!(agent = %agent, error = %e, "critical startup check failed");
                StartupCheck {
                    agent,
                    status: StartupStatus::Failed,
                    findings: 0,
                    critical_findings: 0,
                    execution_time_ms: 0,
                    issues: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        if check.status == StartupStatus::Failed {
            tracing::error!(agent = %check.agent, critical = check.critical_findings, "startup check failed");
        }
        report.checks.push(check);
    }
    report
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
