// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::TempDir;
use vg_core::{HealthStatus, ScheduleConfig};
use vg_pool::{ConnectFailure, FakeConnector, PoolConfig};

fn config_in(dir: &TempDir) -> VigilConfig {
    let mut config = VigilConfig::default();
    config.daemon.project_root = dir.path().to_path_buf();
    config.daemon.tick = Duration::from_millis(10);
    config
}

fn fake_pool() -> (ConnectionPool<FakeConnector>, FakeConnector) {
    let db = FakeConnector::new();
    let config = PoolConfig {
        min_connections: 1,
        max_connections: 2,
        connection_timeout: Duration::from_millis(100),
        ..PoolConfig::default()
    };
    (ConnectionPool::new(db.clone(), config).unwrap(), db)
}

#[tokio::test]
async fn startup_registers_builtin_agents_only() {
    let dir = TempDir::new().unwrap();
    let daemon = startup_with::<FakeConnector>(config_in(&dir), None)
        .await
        .unwrap();

    let scheduler = daemon.runner().scheduler();
    assert!(scheduler.is_registered("connection_tester"));
    assert!(scheduler.is_registered("config_validator"));
    assert!(!scheduler.is_registered("auth_flow_tester"));
    assert!(daemon.pool().is_none());
}

#[tokio::test]
async fn startup_checks_run_critical_agents() {
    let dir = TempDir::new().unwrap();
    let (pool, _db) = fake_pool();
    let daemon = startup_with(config_in(&dir), Some(pool)).await.unwrap();

    let report = daemon.startup_report();
    assert_eq!(report.checks.len(), 1);
    assert_eq!(report.checks[0].agent, "connection_tester");
    assert!(report.all_passed());
    assert!(daemon.pool().unwrap().is_initialized());
}

#[tokio::test]
async fn pool_initialization_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let (pool, db) = fake_pool();
    db.fail_connects(ConnectFailure::ServerDown);

    let err = startup_with(config_in(&dir), Some(pool)).await.err().unwrap();
    assert!(matches!(err, LifecycleError::Pool(PoolError::Initialization(_))));
}

#[tokio::test]
async fn run_once_reports_missing_env_file() {
    let dir = TempDir::new().unwrap();
    let daemon = startup_with::<FakeConnector>(config_in(&dir), None)
        .await
        .unwrap();

    let report = daemon.run_once().await;
    assert_eq!(report.status.global_health, HealthStatus::Degraded);
    let validator = report
        .status
        .schedules
        .iter()
        .find(|s| s.agent == "config_validator")
        .unwrap();
    assert_eq!(validator.last_status, HealthStatus::Degraded);
}

#[tokio::test]
async fn run_once_is_healthy_with_clean_env() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "API_KEY=abc\n").unwrap();
    let mut config = config_in(&dir);
    config.config_validator.required_keys = vec!["API_KEY".to_string()];

    let daemon = startup_with::<FakeConnector>(config, None).await.unwrap();
    let report = daemon.run_once().await;

    assert_eq!(report.status.global_health, HealthStatus::Healthy);
    assert_eq!(report.status.metrics.counters.total_runs, 3);
}

#[tokio::test]
async fn schedule_override_replaces_default() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.schedules.push(
        ScheduleConfig::new("config_validator").with_intervals(30, 60, 20, 10),
    );
    config.schedules.push(ScheduleConfig::new("unknown_agent"));

    let daemon = startup_with::<FakeConnector>(config, None).await.unwrap();
    let scheduler = daemon.runner().scheduler();

    let schedule = scheduler.schedule("config_validator").unwrap();
    assert_eq!(schedule.base_interval, Duration::from_secs(30));
    assert!(!scheduler.is_registered("unknown_agent"));
}

#[tokio::test]
async fn shutdown_stops_monitoring_and_closes_pool() {
    let dir = TempDir::new().unwrap();
    let (pool, _db) = fake_pool();
    let mut daemon = startup_with(config_in(&dir), Some(pool)).await.unwrap();

    daemon.start_monitoring();
    assert!(daemon.is_monitoring());
    tokio::time::sleep(Duration::from_millis(30)).await;

    daemon.shutdown().await;
    assert!(!daemon.is_monitoring());
    let err = daemon.pool().unwrap().get_connection(true).await.err().unwrap();
    assert!(matches!(err, PoolError::Closed));
}
