// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent execution contract
//!
//! The scheduler only ever sees [`Agent`]. Concrete checks usually implement
//! [`CheckSuite`] and are wrapped in [`CheckAgent`], which supplies timing,
//! auto-remediation and conversion of check errors into failed results.
//!
//! Agents are expected to honor their schedule's `max_execution_time`
//! themselves; the scheduler records the budget but does not cancel a run
//! unless timeout enforcement is switched on in the runner.

mod check;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use check::{CheckAgent, CheckSuite};
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAgent, FakeResponse};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use vg_core::{AgentResult, RunType};

/// Errors from executing an agent
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("agent failed: {0}")]
    Failed(String),
    #[error("agent exceeded its {budget:?} execution budget")]
    Timeout { budget: Duration },
    #[error("agent task aborted: {0}")]
    Aborted(String),
}

/// A named, periodically executed check
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Critical agents run during startup validation
    fn is_critical(&self) -> bool {
        false
    }

    async fn execute(&self, run_type: RunType) -> Result<AgentResult, AgentError>;
}
