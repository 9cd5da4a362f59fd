// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vigil.toml` configuration

use crate::lifecycle::LifecycleError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vg_core::{default_schedules, ScheduleConfig};
use vg_engine::MonitorConfig;
use vg_pool::PoolConfig;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "vigil.toml";

/// Whole daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VigilConfig {
    pub daemon: DaemonSection,
    /// Connection pool settings; without it the database checks are off
    /// unless `DATABASE_URL` or `DB_HOST` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PoolConfig>,
    /// Per-agent schedule overrides
    #[serde(rename = "schedule", skip_serializing_if = "Vec::is_empty")]
    pub schedules: Vec<ScheduleConfig>,
    pub config_validator: ValidatorSection,
    /// TCP endpoints checked by the connection tester
    #[serde(rename = "probe", skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSection {
    /// Base directory for watched and validated files
    pub project_root: PathBuf,
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
    #[serde(with = "humantime_serde")]
    pub error_backoff: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    /// Cancel agents that overrun `max_execution_time`
    pub enforce_timeouts: bool,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            tick: Duration::from_secs(5),
            error_backoff: Duration::from_secs(10),
            log_path: None,
            enforce_timeouts: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorSection {
    pub env_files: Vec<PathBuf>,
    pub required_keys: Vec<String>,
}

impl Default for ValidatorSection {
    fn default() -> Self {
        Self {
            env_files: vec![PathBuf::from(".env")],
            required_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    pub name: String,
    /// `host:port`
    pub address: String,
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Unreachable critical probes are Critical findings, others Info
    #[serde(default = "default_true")]
    pub critical: bool,
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_true() -> bool {
    true
}

impl VigilConfig {
    /// Load a config file. A relative `project_root` is taken relative to
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let content = std::fs::read_to_string(path).map_err(|source| LifecycleError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content).map_err(|source| LifecycleError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(dir) = path.parent() {
            if config.daemon.project_root.is_relative() {
                config.daemon.project_root = dir.join(&config.daemon.project_root);
            }
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `path`, or `vigil.toml` in the working directory if present,
    /// or fall back to defaults
    pub fn discover(path: Option<&Path>) -> Result<Self, LifecycleError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, LifecycleError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            tick: self.daemon.tick,
            error_backoff: self.daemon.error_backoff,
        }
    }

    /// Built-in schedules with `[[schedule]]` entries replacing same-named
    /// defaults and adding new ones
    pub fn effective_schedules(&self) -> Vec<ScheduleConfig> {
        let mut schedules = default_schedules();
        for custom in &self.schedules {
            match schedules
                .iter_mut()
                .find(|s| s.agent_name == custom.agent_name)
            {
                Some(existing) => *existing = custom.clone(),
                None => schedules.push(custom.clone()),
            }
        }
        schedules
    }

    /// Pool settings from the file, or from the environment when it names a
    /// database
    pub fn database_config(&self) -> Result<Option<PoolConfig>, LifecycleError> {
        self.database_config_from(|key| std::env::var(key).ok())
    }

    pub fn database_config_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<PoolConfig>, LifecycleError> {
        if let Some(database) = &self.database {
            return Ok(Some(database.clone().resolved()?));
        }
        if lookup("DATABASE_URL").is_some() || lookup("DB_HOST").is_some() {
            return Ok(Some(PoolConfig::from_lookup(lookup)?));
        }
        Ok(None)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
