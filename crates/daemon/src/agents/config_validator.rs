// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment file checks

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use vg_adapters::{AgentError, CheckSuite};
use vg_core::Finding;

pub const NAME: &str = "config_validator";

const CATEGORY: &str = "configuration";
const PASSWORD_KEY: &str = "DB_PASSWORD";
const MIN_PASSWORD_LEN: usize = 8;
const WEAK_PASSWORDS: &[&str] = &["password", "postgres", "admin", "changeme", "secret", "123456"];

/// Checks that env files exist and carry the required keys
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    project_root: PathBuf,
    env_files: Vec<PathBuf>,
    required_keys: Vec<String>,
}

impl ConfigValidator {
    pub fn new(
        project_root: impl Into<PathBuf>,
        env_files: Vec<PathBuf>,
        required_keys: Vec<String>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            env_files,
            required_keys,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Parse `KEY=value` lines.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is dropped and
/// matching surrounding quotes are removed. Later keys win.
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn is_weak_password(password: &str) -> bool {
    password.len() < MIN_PASSWORD_LEN
        || WEAK_PASSWORDS.iter().any(|w| password.eq_ignore_ascii_case(w))
}

#[async_trait]
impl CheckSuite for ConfigValidator {
    fn name(&self) -> &str {
        NAME
    }

    async fn run_checks(&self) -> Result<Vec<Finding>, AgentError> {
        let mut findings = Vec::new();
        let mut vars = BTreeMap::new();

        for file in &self.env_files {
            let path = self.resolve(file);
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => vars.extend(parse_env(&content)),
                Err(e) if e.kind() == ErrorKind::NotFound => findings.push(
                    Finding::warning("env_file_missing", CATEGORY, "Environment file missing")
                        .with_description(format!("{} does not exist", path.display()))
                        .with_fix(format!("create {}", file.display()), false)
                        .with_meta("path", path.display().to_string()),
                ),
                Err(e) => {
                    return Err(AgentError::Failed(format!(
                        "failed to read {}: {e}",
                        path.display()
                    )))
                }
            }
        }

        for key in &self.required_keys {
            match vars.get(key) {
                None => findings.push(
                    Finding::critical("missing_required_key", CATEGORY, "Required key missing")
                        .with_description(format!("{key} is not set in any env file"))
                        .with_fix(format!("add {key} to the env file"), false)
                        .with_meta("key", key.as_str()),
                ),
                Some(value) if value.is_empty() => findings.push(
                    Finding::warning("empty_required_key", CATEGORY, "Required key is empty")
                        .with_description(format!("{key} is set but empty"))
                        .with_meta("key", key.as_str()),
                ),
                Some(_) => {}
            }
        }

        if let Some(password) = vars.get(PASSWORD_KEY).filter(|p| !p.is_empty()) {
            if is_weak_password(password) {
                findings.push(
                    Finding::critical("weak_database_password", CATEGORY, "Weak database password")
                        .with_description(format!(
                            "{PASSWORD_KEY} is a common password or shorter than {MIN_PASSWORD_LEN} characters"
                        ))
                        .with_fix("set a strong DB_PASSWORD", false),
                );
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
#[path = "config_validator_tests.rs"]
mod tests;
