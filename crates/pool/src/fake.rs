// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend for tests

use crate::backend::{Connector, DbConnection, ServerInfo};
use crate::error::{BackendError, ConnectFailure};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct FakeDb {
    connect_failure: Option<BackendError>,
    ping_failures: u32,
    ping_delay: Option<Duration>,
    fail_queries: bool,
    fail_rollbacks: bool,
    replica: bool,
    opened: u64,
    live: u64,
    max_live: u64,
    /// Sessions with an id at or below this report closed
    severed_through: u64,
    statements: Vec<String>,
}

/// Scriptable connector. Clones share the same fake database.
#[derive(Clone, Default)]
pub struct FakeConnector {
    db: Arc<Mutex<FakeDb>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn db(&self) -> MutexGuard<'_, FakeDb> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every connect attempt fail with `kind`
    pub fn fail_connects(&self, kind: ConnectFailure) {
        self.db().connect_failure = Some(BackendError::new(kind, format!("fake {kind}")));
    }

    pub fn allow_connects(&self) {
        self.db().connect_failure = None;
    }

    /// Fail the next `count` pings on any session
    pub fn fail_next_pings(&self, count: u32) {
        self.db().ping_failures = count;
    }

    /// Fail statements other than session setup and rollback
    /// Stall every ping for `delay` before answering
    pub fn delay_pings(&self, delay: Duration) {
        self.db().ping_delay = Some(delay);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.db().fail_queries = fail;
    }

    pub fn fail_rollbacks(&self, fail: bool) {
        self.db().fail_rollbacks = fail;
    }

    pub fn set_replica(&self, replica: bool) {
        self.db().replica = replica;
    }

    /// Every session opened so far starts reporting closed
    pub fn sever_all(&self) {
        let mut db = self.db();
        db.severed_through = db.opened;
    }

    pub fn opened(&self) -> u64 {
        self.db().opened
    }

    pub fn live(&self) -> u64 {
        self.db().live
    }

    /// Highest number of simultaneously open sessions
    pub fn max_live(&self) -> u64 {
        self.db().max_live
    }

    pub fn statements(&self) -> Vec<String> {
        self.db().statements.clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Connection = FakeConnection;

    fn describe(&self) -> String {
        "fake@localhost:5432/vigil".to_string()
    }

    async fn connect(&self) -> Result<FakeConnection, BackendError> {
        let mut db = self.db();
        if let Some(err) = &db.connect_failure {
            return Err(err.clone());
        }
        db.opened += 1;
        db.live += 1;
        db.max_live = db.max_live.max(db.live);
        Ok(FakeConnection {
            id: db.opened,
            closed: false,
            db: Arc::clone(&self.db),
        })
    }
}

pub struct FakeConnection {
    id: u64,
    closed: bool,
    db: Arc<Mutex<FakeDb>>,
}

impl FakeConnection {
    fn db(&self) -> MutexGuard<'_, FakeDb> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connector-assigned session number, starting at 1
    pub fn session(&self) -> u64 {
        self.id
    }

    fn closed_error() -> BackendError {
        BackendError::lost(ConnectFailure::ServerDown, "server closed the connection")
    }
}

#[async_trait]
impl DbConnection for FakeConnection {
    fn is_closed(&self) -> bool {
        self.closed || self.id <= self.db().severed_through
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, BackendError> {
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        let mut db = self.db();
        db.statements.push(sql.to_string());
        if db.fail_queries && !sql.starts_with("SET ") && sql != "ROLLBACK" {
            return Err(BackendError::new(ConnectFailure::Other, format!("fake failure: {sql}")));
        }
        Ok(1)
    }

    async fn ping(&mut self) -> Result<(), BackendError> {
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        let delay = self.db().ping_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut db = self.db();
        if db.ping_failures > 0 {
            db.ping_failures -= 1;
            return Err(BackendError::new(ConnectFailure::ServerDown, "fake ping failure"));
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BackendError> {
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        let mut db = self.db();
        db.statements.push("ROLLBACK".to_string());
        if db.fail_rollbacks {
            return Err(BackendError::new(ConnectFailure::Other, "fake rollback failure"));
        }
        Ok(())
    }

    async fn server_info(&mut self) -> Result<ServerInfo, BackendError> {
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        let db = self.db();
        if db.fail_queries {
            return Err(BackendError::new(ConnectFailure::Other, "fake server info failure"));
        }
        Ok(ServerInfo {
            version: "PostgreSQL 16.2 (fake)".to_string(),
            is_replica: db.replica,
            server_time: "2026-01-01 00:00:00+00".to_string(),
        })
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let mut db = self.db();
            db.live = db.live.saturating_sub(1);
        }
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        if !self.closed {
            let mut db = self.db();
            db.live = db.live.saturating_sub(1);
        }
    }
}
