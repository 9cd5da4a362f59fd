//! Startup error specs

use crate::prelude::*;

#[test]
fn missing_explicit_config_fails() {
    let temp = Project::empty();

    temp.vigild()
        .args(&["--config", "absent.toml", "--once"])
        .fails()
        .stderr_has("Failed to read config");
}

#[test]
fn malformed_config_fails() {
    let temp = Project::empty();
    temp.file("vigil.toml", "[daemon\n");

    temp.vigild()
        .args(&["--once"])
        .fails()
        .stderr_has("Failed to parse config");
}

#[test]
fn invalid_schedule_fails() {
    let temp = Project::empty();
    temp.file(
        "vigil.toml",
        "[[schedule]]\nagent_name = \"config_validator\"\nbase_interval = \"10s\"\nhealthy_interval = \"5s\"\n",
    );

    temp.vigild()
        .args(&["--once"])
        .fails()
        .stderr_has("Invalid schedule");
}

#[test]
fn once_and_print_config_conflict() {
    let temp = Project::empty();

    temp.vigild().args(&["--once", "--print-config"]).fails();
}

#[test]
fn invalid_pool_config_fails() {
    let temp = Project::empty();
    temp.file(
        "vigil.toml",
        "[database]\nmin_connections = 5\nmax_connections = 2\n",
    );

    temp.vigild()
        .args(&["--once"])
        .fails()
        .stderr_has("invalid pool configuration");
}
