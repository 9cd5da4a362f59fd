// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database backend seam.
//!
//! The pool only needs to open sessions, run plain statements, ping, roll
//! back and close. Everything driver-specific lives behind these traits.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// A single live database session
#[async_trait]
pub trait DbConnection: Send + 'static {
    /// True once the session can no longer be used
    fn is_closed(&self) -> bool;

    /// Run a statement, returning the affected row count
    async fn execute(&mut self, sql: &str) -> Result<u64, BackendError>;

    /// Trivial liveness query
    async fn ping(&mut self) -> Result<(), BackendError>;

    /// Abort any open transaction
    async fn rollback(&mut self) -> Result<(), BackendError>;

    /// Server version, replica state and clock
    async fn server_info(&mut self) -> Result<ServerInfo, BackendError>;

    async fn close(&mut self);
}

/// Opens new sessions
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: DbConnection;

    /// Human-readable target, for logs
    fn describe(&self) -> String;

    async fn connect(&self) -> Result<Self::Connection, BackendError>;
}

/// Facts reported by a health check query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerInfo {
    pub version: String,
    pub is_replica: bool,
    pub server_time: String,
}

/// Per-checkout session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub statement_timeout: Duration,
    pub idle_in_transaction_timeout: Duration,
    pub read_only: bool,
    pub application_name: String,
}

impl SessionSettings {
    /// SQL statements that apply these settings to a session
    pub fn statements(&self) -> Vec<String> {
        let mode = if self.read_only {
            "READ ONLY"
        } else {
            "READ WRITE"
        };
        vec![
            format!("SET statement_timeout = {}", self.statement_timeout.as_millis()),
            format!(
                "SET idle_in_transaction_session_timeout = {}",
                self.idle_in_transaction_timeout.as_millis()
            ),
            format!("SET SESSION CHARACTERISTICS AS TRANSACTION {mode}"),
            format!(
                "SET application_name = '{}'",
                self.application_name.replace('\'', "''")
            ),
        ]
    }
}
