// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use vg_adapters::{FakeAgent, FakeLoadProbe};
use vg_core::{FakeClock, Finding, ScheduleConfig};
use yare::parameterized;

fn runner_with(agent: FakeAgent, config: ScheduleConfig) -> (OptimizedRunner<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let scheduler = Arc::new(SmartScheduler::with_parts(
        clock.clone(),
        Arc::new(FakeLoadProbe::default()),
        ".",
    ));
    scheduler.register_agent(config).unwrap();
    let registry = AgentRegistry::new().with(agent);
    (OptimizedRunner::new(scheduler, registry), clock)
}

fn schedule(name: &str) -> ScheduleConfig {
    ScheduleConfig::new(name).with_cache_ttl(Duration::from_secs(30))
}

#[parameterized(
    clean = { vec![], HealthStatus::Healthy },
    warning = { vec![Finding::warning("w", "config", "Missing example")], HealthStatus::Degraded },
    info_only = { vec![Finding::info("i", "config", "Note")], HealthStatus::Degraded },
    critical = { vec![Finding::warning("w", "db", "Slow"), Finding::critical("c", "db", "Down")], HealthStatus::Critical },
)]
fn classify_findings(findings: Vec<Finding>, expected: HealthStatus) {
    let result = AgentResult::completed("x", RunType::Scheduled, findings);
    assert_eq!(classify(&result), expected);
}

#[test]
fn failed_result_classifies_critical() {
    let result = AgentResult::failed("x", RunType::Scheduled, "boom");
    assert_eq!(classify(&result), HealthStatus::Critical);
}

#[tokio::test]
async fn due_agent_runs_and_feeds_scheduler() {
    let agent = FakeAgent::new("x");
    agent.push_findings(vec![Finding::warning("w", "config", "Missing key")]);
    let (runner, _) = runner_with(agent.clone(), schedule("x"));

    let outcome = runner.run_agent_if_needed("x", false).await.unwrap();
    assert!(outcome.is_fresh());
    assert_eq!(agent.calls(), vec![RunType::Scheduled]);

    let record = runner.scheduler().record("x").unwrap();
    assert_eq!(record.last_status, HealthStatus::Degraded);
    assert_eq!(record.current_interval, Duration::from_secs(30));
    assert!(runner.scheduler().get_cached_result("x").is_some());
    assert_eq!(runner.scheduler().metrics().total_runs, 1);
}

#[tokio::test]
async fn skipped_run_serves_cache() {
    let agent = FakeAgent::new("x");
    let (runner, clock) = runner_with(agent.clone(), schedule("x"));
    runner.run_agent_if_needed("x", false).await.unwrap();

    clock.advance_secs(10);
    let outcome = runner.run_agent_if_needed("x", false).await.unwrap();
    match outcome {
        RunOutcome::Cached { reason, result } => {
            assert_eq!(reason, Reason::CacheValid { age: Duration::from_secs(10) });
            assert_eq!(result.agent_name, "x");
        }
        other => panic!("expected cached outcome, got {other:?}"),
    }
    assert_eq!(agent.call_count(), 1);
}

#[tokio::test]
async fn skipped_run_without_cache_is_not_an_error() {
    let agent = FakeAgent::new("x");
    let (runner, clock) = runner_with(agent.clone(), schedule("x"));
    runner.run_agent_if_needed("x", false).await.unwrap();

    clock.advance_secs(40);
    let outcome = runner.run_agent_if_needed("x", false).await.unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Skipped { reason: Reason::IntervalNotReached { .. } }
    ));
    assert!(outcome.result().is_none());
}

#[tokio::test]
async fn forced_run_bypasses_gates() {
    let agent = FakeAgent::new("x");
    let (runner, _) = runner_with(agent.clone(), schedule("x"));
    runner.run_agent_if_needed("x", false).await.unwrap();
    runner.run_agent_if_needed("x", true).await.unwrap();
    assert_eq!(agent.calls(), vec![RunType::Scheduled, RunType::Manual]);
}

#[tokio::test]
async fn agent_error_is_critical_and_not_cached() {
    let agent = FakeAgent::new("x");
    agent.push_error("database unreachable");
    let (runner, _) = runner_with(agent, schedule("x"));

    let err = runner.run_agent_if_needed("x", false).await.unwrap_err();
    assert!(matches!(err, RunError::Agent { ref agent, .. } if agent == "x"));

    let record = runner.scheduler().record("x").unwrap();
    assert_eq!(record.last_status, HealthStatus::Critical);
    assert_eq!(record.current_interval, Duration::from_secs(10));
    assert!(runner.scheduler().get_cached_result("x").is_none());
    assert_eq!(runner.scheduler().metrics().total_runs, 1);
}

#[tokio::test]
async fn unknown_agent_is_an_error() {
    let (runner, _) = runner_with(FakeAgent::new("x"), schedule("x"));
    let err = runner.run_agent_if_needed("ghost", false).await.unwrap_err();
    assert!(matches!(err, RunError::UnknownAgent(name) if name == "ghost"));
}

#[tokio::test]
async fn concurrent_requests_execute_once() {
    let agent = FakeAgent::new("x").with_delay(Duration::from_millis(50));
    let (runner, _) = runner_with(agent.clone(), schedule("x"));

    let (a, b) = tokio::join!(
        runner.run_agent_if_needed("x", true),
        runner.run_agent_if_needed("x", true)
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(agent.call_count(), 1);
    assert_eq!(outcomes.iter().filter(|o| o.is_fresh()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, RunOutcome::Skipped { reason: Reason::InFlight })));
    assert!(!runner.is_running("x"));
}

#[tokio::test]
async fn file_change_during_run_stays_pending() {
    let dir = tempfile::tempdir().unwrap();
    let watched = dir.path().join("settings.env");
    std::fs::write(&watched, "A=1\n").unwrap();

    let scheduler = Arc::new(SmartScheduler::with_parts(
        FakeClock::new(),
        Arc::new(FakeLoadProbe::default()),
        dir.path(),
    ));
    scheduler
        .register_agent(schedule("x").with_watch_files(["settings.env"]))
        .unwrap();
    // seeds the baseline hash
    assert!(scheduler.should_run("x").run);

    let agent = FakeAgent::new("x").with_delay(Duration::from_millis(200));
    let runner = OptimizedRunner::new(scheduler, AgentRegistry::new().with(agent.clone()));

    let (forced, concurrent) = tokio::join!(runner.run_agent_if_needed("x", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&watched, "A=2\n").unwrap();
        runner.run_agent_if_needed("x", false).await
    });

    assert!(forced.unwrap().is_fresh());
    assert!(matches!(
        concurrent.unwrap(),
        RunOutcome::Skipped { reason: Reason::InFlight } | RunOutcome::Cached { reason: Reason::InFlight, .. }
    ));
    assert_eq!(agent.call_count(), 1);
    assert_eq!(runner.scheduler().metrics().file_change_triggers, 0);

    let decision = runner.scheduler().should_run("x");
    assert_eq!(decision.reason, Reason::FileChanged);
    assert!(decision.run);
}

struct PanickingAgent;

#[async_trait]
impl Agent for PanickingAgent {
    fn name(&self) -> &str {
        "panicky"
    }

    async fn execute(&self, _run_type: RunType) -> Result<AgentResult, AgentError> {
        panic!("check blew up");
    }
}

#[tokio::test]
async fn panicking_agent_becomes_aborted_error() {
    let clock = FakeClock::new();
    let scheduler = Arc::new(SmartScheduler::with_parts(
        clock,
        Arc::new(FakeLoadProbe::default()),
        ".",
    ));
    scheduler.register_agent(ScheduleConfig::new("panicky")).unwrap();
    let runner = OptimizedRunner::new(scheduler, AgentRegistry::new().with(PanickingAgent));

    let err = runner.run_agent_if_needed("panicky", false).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Agent { source: AgentError::Aborted(_), .. }
    ));
    assert!(!runner.is_running("panicky"));
}

#[tokio::test]
async fn timeouts_are_enforced_when_enabled() {
    let agent = FakeAgent::new("slow").with_delay(Duration::from_secs(5));
    let config = schedule("slow").with_max_execution_time(Duration::from_millis(20));
    let (runner, _) = runner_with(agent, config);
    let runner = runner.enforce_timeouts(true);

    let err = runner.run_agent_if_needed("slow", false).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Agent { source: AgentError::Timeout { .. }, .. }
    ));
    let record = runner.scheduler().record("slow").unwrap();
    assert_eq!(record.last_status, HealthStatus::Critical);
}

#[tokio::test]
async fn budget_is_only_recorded_by_default() {
    let agent = FakeAgent::new("slow").with_delay(Duration::from_millis(40));
    let config = schedule("slow").with_max_execution_time(Duration::from_millis(10));
    let (runner, _) = runner_with(agent, config);

    let outcome = runner.run_agent_if_needed("slow", false).await.unwrap();
    assert!(outcome.is_fresh());
}
