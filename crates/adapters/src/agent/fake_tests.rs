// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_agent_replays_script_then_reports_clean() {
    let agent = FakeAgent::new("probe");
    agent.push_findings(vec![Finding::warning("slow", "db", "Slow")]);
    agent.push_error("boom");

    let first = agent.execute(RunType::Scheduled).await.unwrap();
    assert_eq!(first.findings.len(), 1);

    let second = agent.execute(RunType::Manual).await;
    assert!(matches!(second, Err(AgentError::Failed(msg)) if msg == "boom"));

    let third = agent.execute(RunType::Scheduled).await.unwrap();
    assert!(third.findings.is_empty());

    assert_eq!(
        agent.calls(),
        vec![RunType::Scheduled, RunType::Manual, RunType::Scheduled]
    );
}

#[tokio::test]
async fn fake_agent_clones_share_state() {
    let agent = FakeAgent::new("probe").critical();
    let clone = agent.clone();
    clone.execute(RunType::Startup).await.unwrap();
    assert_eq!(agent.call_count(), 1);
    assert!(agent.is_critical());
}
