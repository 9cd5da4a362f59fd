// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! vg-pool: bounded database connection pool with validation and statistics

pub mod backend;
pub mod config;
pub mod error;
pub mod pool;
pub mod postgres;
pub mod stats;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use backend::{Connector, DbConnection, ServerInfo, SessionSettings};
pub use config::PoolConfig;
pub use error::{BackendError, ConnectFailure, PoolError};
pub use pool::{ConnectionPool, PooledConnection};
pub use postgres::{PgConnector, PgSession};
pub use stats::{HealthReport, PoolHealth, PoolStats};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeConnection, FakeConnector};

/// Pool backed by PostgreSQL
pub type PgPool = ConnectionPool<PgConnector>;

/// Build an uninitialized PostgreSQL pool from configuration
pub fn postgres_pool(config: PoolConfig) -> Result<PgPool, PoolError> {
    let connector = PgConnector::new(&config).map_err(|e| PoolError::Config(e.message))?;
    ConnectionPool::new(connector, config)
}
