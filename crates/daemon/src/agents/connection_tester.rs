// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database pool and network reachability checks

use super::count;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use vg_adapters::{AgentError, CheckSuite};
use vg_core::Finding;
use vg_pool::{ConnectionPool, Connector, HealthReport, PoolError};

pub const NAME: &str = "connection_tester";

const CATEGORY_DATABASE: &str = "database";
const CATEGORY_NETWORK: &str = "network";
const POOL_EXHAUSTED: &str = "connection_pool_exhausted";
const RESET_POOL: &str = "Close idle connections and reset pool";

/// A named TCP endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct TcpProbe {
    pub name: String,
    pub address: String,
    pub timeout: Duration,
    pub critical: bool,
}

/// Checks pool health, pool saturation and configured TCP endpoints
pub struct ConnectionTester<K: Connector> {
    pool: Option<Arc<ConnectionPool<K>>>,
    probes: Vec<TcpProbe>,
}

impl<K: Connector> ConnectionTester<K> {
    pub fn new(pool: Option<Arc<ConnectionPool<K>>>, probes: Vec<TcpProbe>) -> Self {
        Self { pool, probes }
    }

    fn pool_findings(report: &HealthReport) -> Vec<Finding> {
        let stats = &report.stats;
        if let Some(cause) = &report.cause {
            return vec![failure_finding(cause)];
        }

        let mut findings = Vec::new();
        if stats.max_connections > 0 && stats.active_connections >= u64::from(stats.max_connections)
        {
            findings.push(exhaustion_finding(
                format!(
                    "All {} connections are checked out",
                    stats.max_connections
                ),
                stats.active_connections,
                stats.max_connections,
            ));
        }
        if let Some(server) = &report.server {
            if server.is_replica {
                findings.push(
                    Finding::info("database_read_replica", CATEGORY_DATABASE, "Connected to a read replica")
                        .with_description(format!("Server {} is in recovery mode", server.version)),
                );
            }
        }
        findings
    }
}

fn exhaustion_finding(description: String, active: u64, max: u32) -> Finding {
    Finding::warning(POOL_EXHAUSTED, CATEGORY_DATABASE, "Connection pool exhausted")
        .with_description(description)
        .with_fix(RESET_POOL, true)
        .with_meta("active_connections", count(active))
        .with_meta("max_connections", max)
}

fn failure_finding(cause: &PoolError) -> Finding {
    match cause {
        PoolError::Exhausted { timeout } => exhaustion_finding(
            format!("No connection became available within {}s", timeout.as_secs()),
            0,
            0,
        ),
        other => {
            let kind = other.failure_kind();
            let fix = kind.map(|k| k.hint()).unwrap_or("check the database configuration");
            let mut finding = Finding::critical(
                "database_connection_failed",
                CATEGORY_DATABASE,
                "Database connection failed",
            )
            .with_description(other.to_string())
            .with_fix(fix, false)
            .with_meta("error", other.to_string());
            if let Some(kind) = kind {
                finding = finding.with_meta("kind", kind.to_string());
            }
            finding
        }
    }
}

async fn probe(target: &TcpProbe) -> Option<Finding> {
    let outcome = tokio::time::timeout(target.timeout, TcpStream::connect(&target.address)).await;
    let error = match outcome {
        Ok(Ok(_)) => return None,
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}ms", target.timeout.as_millis()),
    };
    tracing::warn!(probe = %target.name, address = %target.address, %error, "endpoint unreachable");

    let name = format!("{}_unreachable", target.name);
    let title = format!("{} is unreachable", target.name);
    let finding = if target.critical {
        Finding::critical(name, CATEGORY_NETWORK, title)
    } else {
        Finding::info(name, CATEGORY_NETWORK, title)
    };
    Some(
        finding
            .with_description(format!("Could not connect to {}: {}", target.address, error))
            .with_meta("address", target.address.as_str())
            .with_meta("error", error),
    )
}

#[async_trait]
impl<K: Connector> CheckSuite for ConnectionTester<K> {
    fn name(&self) -> &str {
        NAME
    }

    fn is_critical(&self) -> bool {
        true
    }

    async fn run_checks(&self) -> Result<Vec<Finding>, AgentError> {
        let mut findings = match &self.pool {
            Some(pool) => Self::pool_findings(&pool.health_check().await),
            None => Vec::new(),
        };
        for target in &self.probes {
            if let Some(finding) = probe(target).await {
                findings.push(finding);
            }
        }
        Ok(findings)
    }

    async fn auto_fix(&self, finding: &Finding) -> Result<bool, AgentError> {
        let Some(pool) = &self.pool else {
            return Ok(false);
        };
        if finding.name != POOL_EXHAUSTED {
            return Ok(false);
        }
        pool.close_all().await;
        pool.initialize()
            .await
            .map_err(|e| AgentError::Failed(format!("pool reset failed: {e}")))?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "connection_tester_tests.rs"]
mod tests;
