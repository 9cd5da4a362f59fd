// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent execution results: findings, severities and run outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Why an agent is being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Startup,
    Scheduled,
    Manual,
    Event,
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunType::Startup => "startup",
            RunType::Scheduled => "scheduled",
            RunType::Manual => "manual",
            RunType::Event => "event",
        };
        write!(f, "{}", s)
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Primitive metadata value attached to a finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<u32> for MetaValue {
    fn from(v: u32) -> Self {
        MetaValue::Int(i64::from(v))
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Text(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Text(v.to_string())
    }
}

/// A single reported issue or observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub name: String,
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub auto_fixable: bool,
    #[serde(default)]
    pub auto_fixed: bool,
    #[serde(default)]
    pub fix_action: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetaValue>,
    pub detected_at: DateTime<Utc>,
}

impl Finding {
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            severity,
            category: category.into(),
            title: title.into(),
            description: description.into(),
            auto_fixable: false,
            auto_fixed: false,
            fix_action: None,
            metadata: BTreeMap::new(),
            detected_at: Utc::now(),
        }
    }

    pub fn critical(name: impl Into<String>, category: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self::new(name, Severity::Critical, category, title.clone(), title)
    }

    pub fn warning(name: impl Into<String>, category: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self::new(name, Severity::Warning, category, title.clone(), title)
    }

    pub fn info(name: impl Into<String>, category: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self::new(name, Severity::Info, category, title.clone(), title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Suggest a fix; `auto` marks it as something the agent can apply itself
    pub fn with_fix(mut self, action: impl Into<String>, auto: bool) -> Self {
        self.fix_action = Some(action.into());
        self.auto_fixable = auto;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Completion state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

/// Result of one agent execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub run_id: Uuid,
    pub agent_name: String,
    pub run_type: RunType,
    pub status: ExecutionStatus,
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub remediations_count: u32,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl AgentResult {
    pub fn completed(agent_name: impl Into<String>, run_type: RunType, findings: Vec<Finding>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            agent_name: agent_name.into(),
            run_type,
            status: ExecutionStatus::Completed,
            findings,
            remediations_count: 0,
            execution_time_ms: 0,
            error_message: None,
        }
    }

    pub fn failed(agent_name: impl Into<String>, run_type: RunType, message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            error_message: Some(message.into()),
            ..Self::completed(agent_name, run_type, Vec::new())
        }
    }

    pub fn critical_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_critical())
    }

    pub fn has_critical_findings(&self) -> bool {
        self.findings.iter().any(Finding::is_critical)
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
