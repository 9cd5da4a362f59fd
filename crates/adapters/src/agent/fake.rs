// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Agent, AgentError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vg_core::{AgentResult, Finding, RunType};

/// Scripted outcome for one execution
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Findings(Vec<Finding>),
    Error(String),
}

#[derive(Default)]
struct FakeState {
    script: VecDeque<FakeResponse>,
    calls: Vec<RunType>,
}

/// Fake agent that records executions and replays scripted responses.
///
/// Once the script is exhausted every execution reports no findings.
#[derive(Clone)]
pub struct FakeAgent {
    name: String,
    critical: bool,
    delay: Option<Duration>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            critical: false,
            delay: None,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Sleep this long inside every execution
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an outcome for a future execution
    pub fn push(&self, response: FakeResponse) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .script
            .push_back(response);
    }

    pub fn push_findings(&self, findings: Vec<Finding>) {
        self.push(FakeResponse::Findings(findings));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.push(FakeResponse::Error(message.into()));
    }

    /// Run types of all recorded executions
    pub fn calls(&self) -> Vec<RunType> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls.len()
    }
}

#[async_trait]
impl Agent for FakeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.critical
    }

    async fn execute(&self, run_type: RunType) -> Result<AgentResult, AgentError> {
        let response = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(run_type);
            state.script.pop_front()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            Some(FakeResponse::Error(message)) => Err(AgentError::Failed(message)),
            Some(FakeResponse::Findings(findings)) => {
                Ok(AgentResult::completed(&self.name, run_type, findings))
            }
            None => Ok(AgentResult::completed(&self.name, run_type, Vec::new())),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
