// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use thiserror::Error;
use vg_adapters::AgentError;

/// Errors from running an agent through the runner
#[derive(Debug, Error)]
pub enum RunError {
    #[error("agent not found: {0}")]
    UnknownAgent(String),
    #[error("agent {agent} failed: {source}")]
    Agent {
        agent: String,
        #[source]
        source: AgentError,
    },
}
