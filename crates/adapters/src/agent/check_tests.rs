// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vg_core::ExecutionStatus;

#[derive(Clone, Default)]
struct ScriptedSuite {
    fail: bool,
    fix_attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl CheckSuite for ScriptedSuite {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run_checks(&self) -> Result<Vec<Finding>, AgentError> {
        if self.fail {
            return Err(AgentError::Failed("database unreachable".into()));
        }
        Ok(vec![
            Finding::warning("pool_exhausted", "database", "Pool exhausted")
                .with_fix("reset pool", true),
            Finding::warning("unfixable", "database", "Unfixable").with_fix("manual", true),
            Finding::critical("port_mismatch", "configuration", "Port mismatch"),
        ])
    }

    async fn auto_fix(&self, finding: &Finding) -> Result<bool, AgentError> {
        self.fix_attempts.fetch_add(1, Ordering::SeqCst);
        match finding.name.as_str() {
            "pool_exhausted" => Ok(true),
            _ => Err(AgentError::Failed("no fix".into())),
        }
    }
}

#[tokio::test]
async fn check_agent_attempts_fixes_for_fixable_findings_only() {
    let suite = ScriptedSuite::default();
    let agent = CheckAgent::new(suite.clone());

    let result = agent.execute(RunType::Scheduled).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.findings.len(), 3);
    assert_eq!(result.remediations_count, 1);
    assert_eq!(suite.fix_attempts.load(Ordering::SeqCst), 2);
    assert!(result.findings[0].auto_fixed);
    assert!(!result.findings[1].auto_fixed);
}

#[tokio::test]
async fn check_errors_become_failed_results() {
    let agent = CheckAgent::new(ScriptedSuite {
        fail: true,
        ..Default::default()
    });

    let result = agent.execute(RunType::Manual).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.agent_name, "scripted");
    assert!(result
        .error_message
        .as_deref()
        .unwrap()
        .contains("database unreachable"));
}
