// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::AgentRegistry;
use crate::scheduler::SmartScheduler;
use std::sync::Arc;
use vg_adapters::{FakeAgent, FakeLoadProbe};
use vg_core::{FakeClock, Finding, HealthStatus, ScheduleConfig};

fn runner(agents: Vec<FakeAgent>) -> OptimizedRunner<FakeClock> {
    let scheduler = Arc::new(SmartScheduler::with_parts(
        FakeClock::new(),
        Arc::new(FakeLoadProbe::default()),
        ".",
    ));
    let mut registry = AgentRegistry::new();
    for agent in agents {
        scheduler
            .register_agent(ScheduleConfig::new(vg_adapters::Agent::name(&agent)))
            .unwrap();
        registry.register(Arc::new(agent));
    }
    OptimizedRunner::new(scheduler, registry)
}

#[tokio::test]
async fn only_critical_agents_run_at_startup() {
    let critical = FakeAgent::new("connection_tester").critical();
    let normal = FakeAgent::new("config_validator");
    let runner = runner(vec![critical.clone(), normal.clone()]);

    let report = run_startup_checks(&runner).await;
    assert_eq!(report.checks.len(), 1);
    assert!(report.all_passed());
    assert_eq!(critical.calls(), vec![RunType::Startup]);
    assert_eq!(normal.call_count(), 0);

    let record = runner.scheduler().record("connection_tester").unwrap();
    assert_eq!(record.last_status, HealthStatus::Healthy);
}

#[tokio::test]
async fn critical_findings_fail_the_check() {
    let agent = FakeAgent::new("connection_tester").critical();
    agent.push_findings(vec![
        Finding::critical("postgres_unreachable", "database", "PostgreSQL unreachable")
            .with_description("connection refused")
            .with_fix("start the database", false),
        Finding::warning("slow", "database", "Slow handshake"),
    ]);
    let runner = runner(vec![agent]);

    let report = run_startup_checks(&runner).await;
    let check = &report.checks[0];
    assert_eq!(check.status, StartupStatus::Failed);
    assert_eq!(check.findings, 2);
    assert_eq!(check.critical_findings, 1);
    assert_eq!(check.issues[0].fix.as_deref(), Some("start the database"));
    assert_eq!(report.failed().count(), 1);
}

#[tokio::test]
async fn agent_errors_are_reported_not_raised() {
    let agent = FakeAgent::new("connection_tester").critical();
    agent.push_error("pool exhausted");
    let runner = runner(vec![agent]);

    let report = run_startup_checks(&runner).await;
    let check = &report.checks[0];
    assert_eq!(check.status, StartupStatus::Failed);
    assert!(check.error.as_deref().unwrap().contains("pool exhausted"));
}
