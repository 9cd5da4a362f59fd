// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool error taxonomy

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Broad cause of a failed connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectFailure {
    /// Nothing is listening, or the server dropped us
    ServerDown,
    /// Authentication rejected
    BadCredentials,
    /// Server reachable but the database does not exist
    MissingDatabase,
    /// Host did not resolve or the address is unusable
    BadAddress,
    Other,
}

impl ConnectFailure {
    /// Best-effort classification from driver error text
    pub fn classify_message(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();
        if msg.contains("password authentication failed")
            || msg.contains("authentication failed")
            || msg.contains("no pg_hba.conf entry")
        {
            ConnectFailure::BadCredentials
        } else if msg.contains("database") && msg.contains("does not exist") {
            ConnectFailure::MissingDatabase
        } else if msg.contains("failed to lookup address")
            || msg.contains("name or service not known")
            || msg.contains("could not translate host name")
            || msg.contains("invalid port")
        {
            ConnectFailure::BadAddress
        } else if msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("timed out")
            || msg.contains("server closed the connection")
        {
            ConnectFailure::ServerDown
        } else {
            ConnectFailure::Other
        }
    }

    /// Operator hint for this cause
    pub fn hint(self) -> &'static str {
        match self {
            ConnectFailure::ServerDown => "check that the database server is running",
            ConnectFailure::BadCredentials => "check the database user and password",
            ConnectFailure::MissingDatabase => "create the database or fix the database name",
            ConnectFailure::BadAddress => "check the database host and port",
            ConnectFailure::Other => "see the error message for details",
        }
    }
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectFailure::ServerDown => "server down",
            ConnectFailure::BadCredentials => "bad credentials",
            ConnectFailure::MissingDatabase => "missing database",
            ConnectFailure::BadAddress => "bad host or port",
            ConnectFailure::Other => "connection error",
        };
        write!(f, "{}", s)
    }
}

/// Error reported by a database backend
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: ConnectFailure,
    pub message: String,
    /// The session is unusable after this error
    pub connection_lost: bool,
}

impl BackendError {
    pub fn new(kind: ConnectFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            connection_lost: false,
        }
    }

    /// Error that also invalidates the session it happened on
    pub fn lost(kind: ConnectFailure, message: impl Into<String>) -> Self {
        Self {
            connection_lost: true,
            ..Self::new(kind, message)
        }
    }
}

/// Errors surfaced by the connection pool
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    Config(String),

    #[error("failed to initialize connection pool: {0}")]
    Initialization(#[source] BackendError),

    #[error("database connection failed: {0}")]
    Connection(#[source] BackendError),

    #[error("connection pool exhausted: no connection available within {timeout:?}")]
    Exhausted { timeout: Duration },

    #[error("connection is closed")]
    Closed,

    #[error("query failed: {0}")]
    Query(#[source] BackendError),
}

impl PoolError {
    /// Exhaustion is the only condition callers should simply retry later
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PoolError::Exhausted { .. })
    }

    /// Connection failure cause, when there is one
    pub fn failure_kind(&self) -> Option<ConnectFailure> {
        match self {
            PoolError::Initialization(e) | PoolError::Connection(e) | PoolError::Query(e) => {
                Some(e.kind)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
