// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::backend::ServerInfo;
use crate::error::PoolError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time view of pool counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    /// Successful checkouts since start
    pub total_connections: u64,
    /// Connections currently checked out
    pub active_connections: u64,
    pub errors: u64,
    pub queries_executed: u64,
    pub transactions_executed: u64,
    pub pool_exhausted_count: u64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
    /// Live sessions, idle plus checked out
    pub pool_size: u64,
    pub available_connections: u64,
    pub used_connections: u64,
    pub min_connections: u32,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolHealth {
    Healthy,
    Unhealthy,
}

/// Result of [`ConnectionPool::health_check`](crate::ConnectionPool::health_check)
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: PoolHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Typed failure behind `error`
    #[serde(skip)]
    pub cause: Option<PoolError>,
    pub stats: PoolStats,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == PoolHealth::Healthy
    }
}
