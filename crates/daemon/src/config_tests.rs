// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use tempfile::TempDir;
use vg_core::Priority;

#[test]
fn empty_file_gives_defaults() {
    let config = VigilConfig::parse("").unwrap();
    assert_eq!(config, VigilConfig::default());
    assert_eq!(config.daemon.tick, Duration::from_secs(5));
    assert_eq!(config.config_validator.env_files, vec![PathBuf::from(".env")]);
    assert!(config.database.is_none());
}

#[test]
fn parses_all_sections() {
    let config = VigilConfig::parse(
        r#"
[daemon]
tick = "2s"
error_backoff = "1m"
enforce_timeouts = true

[database]
host = "db.internal"
database = "app"
max_connections = 4

[[schedule]]
agent_name = "config_validator"
priority = "high"
base_interval = "1m"
healthy_interval = "2m"
degraded_interval = "30s"
critical_interval = "10s"

[config_validator]
env_files = [".env.local"]
required_keys = ["API_KEY"]

[[probe]]
name = "redis"
address = "127.0.0.1:6379"
critical = false
"#,
    )
    .unwrap();

    assert_eq!(config.daemon.tick, Duration::from_secs(2));
    assert_eq!(config.daemon.error_backoff, Duration::from_secs(60));
    assert!(config.daemon.enforce_timeouts);
    let db = config.database.as_ref().unwrap();
    assert_eq!(db.host, "db.internal");
    assert_eq!(db.max_connections, 4);
    assert_eq!(config.schedules[0].priority, Priority::High);
    assert_eq!(config.config_validator.required_keys, vec!["API_KEY"]);
    assert_eq!(config.probes[0].timeout, Duration::from_secs(3));
    assert!(!config.probes[0].critical);
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(VigilConfig::parse("[daemon]\ntick_rate = \"1s\"\n").is_err());
}

#[test]
fn effective_schedules_override_by_name() {
    let mut config = VigilConfig::default();
    config
        .schedules
        .push(ScheduleConfig::new("connection_tester").with_priority(Priority::Low));
    config.schedules.push(ScheduleConfig::new("disk_space"));

    let schedules = config.effective_schedules();
    let names: Vec<&str> = schedules.iter().map(|s| s.agent_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["connection_tester", "config_validator", "auth_flow_tester", "disk_space"]
    );
    assert_eq!(schedules[0].priority, Priority::Low);
}

#[test]
fn load_resolves_project_root_against_config_dir() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vigil.toml");
    std::fs::write(&path, "[daemon]\nproject_root = \"app\"\n").unwrap();

    let config = VigilConfig::load(&path).unwrap();
    assert_eq!(config.daemon.project_root, dir.path().join("app"));
}

#[test]
fn load_reports_parse_errors_with_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vigil.toml");
    std::fs::write(&path, "[daemon\n").unwrap();

    let err = VigilConfig::load(&path).unwrap_err();
    assert!(matches!(err, LifecycleError::ParseConfig { .. }));
    assert!(err.to_string().contains("vigil.toml"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = VigilConfig::discover(Some(&dir.path().join("nope.toml"))).unwrap_err();
    assert!(matches!(err, LifecycleError::ReadConfig { .. }));
}

#[test]
fn rendered_config_parses_back() {
    let mut config = VigilConfig::default();
    config.probes.push(ProbeConfig {
        name: "api".into(),
        address: "localhost:8080".into(),
        timeout: Duration::from_millis(1500),
        critical: true,
    });

    let rendered = config.to_toml().unwrap();
    assert!(rendered.contains("[daemon]"));
    assert_eq!(VigilConfig::parse(&rendered).unwrap(), config);
}

#[test]
fn database_comes_from_env_only_when_named() {
    let config = VigilConfig::default();
    assert!(config.database_config_from(|_| None).unwrap().is_none());

    let env: HashMap<&str, &str> = [("DB_HOST", "pg.internal"), ("DB_NAME", "app")].into();
    let db = config
        .database_config_from(|k| env.get(k).map(|v| v.to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(db.host, "pg.internal");
    assert_eq!(db.database, "app");
}

#[test]
fn database_section_url_is_resolved() {
    let config =
        VigilConfig::parse("[database]\nurl = \"postgres://app:pw@pg:6543/orders\"\n").unwrap();
    let db = config.database_config_from(|_| None).unwrap().unwrap();
    assert_eq!(db.host, "pg");
    assert_eq!(db.port, 6543);
    assert_eq!(db.database, "orders");
}
