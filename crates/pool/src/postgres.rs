// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PostgreSQL backend built on sqlx

use crate::backend::{Connector, DbConnection, ServerInfo};
use crate::config::PoolConfig;
use crate::error::{BackendError, ConnectFailure};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Connection, Executor, Row};
use std::time::Duration;

/// Opens PostgreSQL sessions from a [`PoolConfig`]
#[derive(Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    target: String,
    timeout: Duration,
}

impl PgConnector {
    pub fn new(config: &PoolConfig) -> Result<Self, BackendError> {
        let ssl_mode: PgSslMode = config.ssl_mode.parse().map_err(|_| {
            BackendError::new(
                ConnectFailure::Other,
                format!("unknown ssl mode: {}", config.ssl_mode),
            )
        })?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(ssl_mode)
            .application_name(&config.application_name);

        Ok(Self {
            options,
            target: config.target(),
            timeout: config.connection_timeout,
        })
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgSession;

    fn describe(&self) -> String {
        self.target.clone()
    }

    async fn connect(&self) -> Result<PgSession, BackendError> {
        let conn = tokio::time::timeout(self.timeout, PgConnection::connect_with(&self.options))
            .await
            .map_err(|_| {
                BackendError::new(
                    ConnectFailure::ServerDown,
                    format!("connect to {} timed out after {:?}", self.target, self.timeout),
                )
            })?
            .map_err(|e| map_sqlx_error(&e))?;
        Ok(PgSession { conn: Some(conn) })
    }
}

/// A live PostgreSQL session. `None` once closed.
pub struct PgSession {
    conn: Option<PgConnection>,
}

impl PgSession {
    fn live(&mut self) -> Result<&mut PgConnection, BackendError> {
        self.conn
            .as_mut()
            .ok_or_else(|| BackendError::lost(ConnectFailure::ServerDown, "session is closed"))
    }

    // Io failures leave the session unusable
    fn check(&mut self, err: sqlx::Error) -> BackendError {
        let mapped = map_sqlx_error(&err);
        if mapped.connection_lost {
            self.conn = None;
        }
        mapped
    }
}

#[async_trait]
impl DbConnection for PgSession {
    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, BackendError> {
        let conn = self.live()?;
        let result = conn.execute(sqlx::raw_sql(sql)).await;
        match result {
            Ok(done) => Ok(done.rows_affected()),
            Err(e) => Err(self.check(e)),
        }
    }

    async fn ping(&mut self) -> Result<(), BackendError> {
        let result = self.live()?.ping().await;
        result.map_err(|e| self.check(e))
    }

    async fn rollback(&mut self) -> Result<(), BackendError> {
        self.execute("ROLLBACK").await.map(|_| ())
    }

    async fn server_info(&mut self) -> Result<ServerInfo, BackendError> {
        let conn = self.live()?;
        let result = conn
            .fetch_one(sqlx::query("SELECT version(), pg_is_in_recovery(), now()::text"))
            .await;
        let row = result.map_err(|e| self.check(e))?;
        let decode = |e: sqlx::Error| BackendError::new(ConnectFailure::Other, e.to_string());
        Ok(ServerInfo {
            version: row.try_get(0).map_err(decode)?,
            is_replica: row.try_get(1).map_err(decode)?,
            server_time: row.try_get(2).map_err(decode)?,
        })
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "error closing postgres session");
            }
        }
    }
}

/// Map a driver error onto the pool's failure taxonomy
pub fn map_sqlx_error(err: &sqlx::Error) -> BackendError {
    let message = err.to_string();
    match err {
        sqlx::Error::Database(db) => {
            let kind = match db.code().as_deref() {
                Some("28P01") | Some("28000") => ConnectFailure::BadCredentials,
                Some("3D000") => ConnectFailure::MissingDatabase,
                Some("57P01") | Some("57P02") | Some("57P03") => ConnectFailure::ServerDown,
                _ => ConnectFailure::classify_message(&message),
            };
            BackendError::new(kind, message)
        }
        sqlx::Error::Io(io) => {
            let kind = match io.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::TimedOut => ConnectFailure::ServerDown,
                _ => match ConnectFailure::classify_message(&message) {
                    ConnectFailure::Other => ConnectFailure::ServerDown,
                    kind => kind,
                },
            };
            BackendError::lost(kind, message)
        }
        sqlx::Error::Configuration(_) => BackendError::new(ConnectFailure::BadAddress, message),
        sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
            BackendError::lost(ConnectFailure::classify_message(&message), message)
        }
        _ => BackendError::new(ConnectFailure::classify_message(&message), message),
    }
}
