//! `--once` specs
//!
//! A single forced pass prints the scheduler status as JSON.

use crate::prelude::*;

#[test]
fn clean_project_is_healthy() {
    let temp = Project::empty();
    temp.file(".env", "API_KEY=abc\n");
    temp.file(
        "vigil.toml",
        "[config_validator]\nrequired_keys = [\"API_KEY\"]\n",
    );

    let run = temp.vigild().args(&["--once"]).passes();
    let report = run.json();

    assert_eq!(report["status"]["global_health"], "healthy");
    assert_eq!(report["startup"]["checks"][0]["agent"], "connection_tester");
    assert_eq!(report["startup"]["checks"][0]["status"], "healthy");
    let agents: Vec<&str> = report["status"]["schedules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["agent"].as_str().unwrap())
        .collect();
    assert!(agents.contains(&"connection_tester"));
    assert!(agents.contains(&"config_validator"));
}

#[test]
fn missing_env_file_degrades_health() {
    let temp = Project::empty();

    temp.vigild()
        .args(&["--once"])
        .passes()
        .stdout_has("\"global_health\": \"degraded\"");
}

#[test]
fn missing_required_key_is_critical() {
    let temp = Project::empty();
    temp.file(".env", "OTHER=1\n");
    temp.file(
        "vigil.toml",
        "[config_validator]\nrequired_keys = [\"SECRET_KEY\"]\n",
    );

    temp.vigild()
        .args(&["--once"])
        .passes()
        .stdout_has("\"global_health\": \"critical\"");
}

#[test]
fn explicit_config_resolves_project_root_from_its_directory() {
    let temp = Project::empty();
    temp.file("app/.env", "API_KEY=abc\n");
    temp.file(
        "conf/vigil.toml",
        "[daemon]\nproject_root = \"../app\"\n\n[config_validator]\nrequired_keys = [\"API_KEY\"]\n",
    );

    temp.vigild()
        .args(&["--once", "--config", "conf/vigil.toml"])
        .passes()
        .stdout_has("\"global_health\": \"healthy\"");
}
