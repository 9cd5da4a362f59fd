// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded connection pool.
//!
//! A semaphore with `max_connections` permits bounds checkouts. Idle
//! sessions, counters and the lifecycle generation share one mutex, so
//! checkout, checkin and statistics never observe each other half-done.
//! The mutex is never held across an await.

use crate::backend::{Connector, DbConnection, SessionSettings};
use crate::config::PoolConfig;
use crate::error::{BackendError, PoolError};
use crate::stats::{HealthReport, PoolHealth, PoolStats};
use chrono::{DateTime, Utc};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

struct IdleConnection<C> {
    conn: C,
    id: u64,
}

#[derive(Default)]
struct Counters {
    total: u64,
    active: u64,
    errors: u64,
    queries: u64,
    transactions: u64,
    exhausted: u64,
    last_error: Option<String>,
    last_error_time: Option<DateTime<Utc>>,
}

struct PoolState<C> {
    idle: Vec<IdleConnection<C>>,
    /// Open sessions, idle plus checked out
    live: u64,
    initialized: bool,
    /// Bumped by `close_all`; stale checkouts are closed on return
    generation: u64,
    counters: Counters,
}

impl<C> PoolState<C> {
    fn record_error(&mut self, message: String) {
        self.counters.errors += 1;
        self.counters.last_error = Some(message);
        self.counters.last_error_time = Some(Utc::now());
    }
}

fn lock_state<C>(state: &Mutex<PoolState<C>>) -> MutexGuard<'_, PoolState<C>> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Bounded pool of validated database sessions
pub struct ConnectionPool<K: Connector> {
    connector: K,
    config: PoolConfig,
    state: Arc<Mutex<PoolState<K::Connection>>>,
    slots: Arc<Semaphore>,
    init_lock: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
}

impl<K: Connector> ConnectionPool<K> {
    /// Create an uninitialized pool. No connections are opened yet.
    pub fn new(connector: K, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let permits = config.max_connections as usize;
        Ok(Self {
            connector,
            config,
            state: Arc::new(Mutex::new(PoolState {
                idle: Vec::new(),
                live: 0,
                initialized: false,
                generation: 0,
                counters: Counters::default(),
            })),
            slots: Arc::new(Semaphore::new(permits)),
            init_lock: tokio::sync::Mutex::new(()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    pub fn is_initialized(&self) -> bool {
        lock_state(&self.state).initialized
    }

    /// Open the initial sessions and probe one of them.
    ///
    /// Fails with [`PoolError::Initialization`] when the database is
    /// unreachable. Calling it on an initialized pool only logs a warning.
    pub async fn initialize(&self) -> Result<(), PoolError> {
        let _init = self.init_lock.lock().await;
        if self.is_initialized() {
            tracing::warn!("connection pool already initialized");
            return Ok(());
        }
        self.open_initial().await
    }

    async fn ensure_initialized(&self) -> Result<(), PoolError> {
        if self.is_initialized() {
            return Ok(());
        }
        let _init = self.init_lock.lock().await;
        if self.is_initialized() {
            return Ok(());
        }
        self.open_initial().await
    }

    async fn open_initial(&self) -> Result<(), PoolError> {
        if self.slots.is_closed() {
            return Err(PoolError::Closed);
        }
        let target = self.connector.describe();
        let count = self.config.min_connections.max(1);

        let mut opened = Vec::with_capacity(count as usize);
        let mut failure = None;
        for _ in 0..count {
            match self.connector.connect().await {
                Ok(conn) => opened.push(conn),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if failure.is_none() {
            if let Some(first) = opened.first_mut() {
                if let Err(e) = first.ping().await {
                    failure = Some(e);
                }
            }
        }

        if let Some(e) = failure {
            for conn in opened.iter_mut() {
                conn.close().await;
            }
            tracing::error!(
                target_db = %target,
                kind = ?e.kind,
                hint = e.kind.hint(),
                error = %e,
                "connection pool initialization failed"
            );
            lock_state(&self.state).record_error(e.to_string());
            return Err(PoolError::Initialization(e));
        }

        let mut state = lock_state(&self.state);
        state.live += opened.len() as u64;
        for conn in opened {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            state.idle.push(IdleConnection { conn, id });
        }
        state.initialized = true;
        tracing::info!(
            target_db = %target,
            min = self.config.min_connections,
            max = self.config.max_connections,
            "connection pool initialized"
        );
        Ok(())
    }

    fn session_settings(&self, read_only: bool) -> SessionSettings {
        SessionSettings {
            statement_timeout: self.config.statement_timeout,
            idle_in_transaction_timeout: self.config.idle_in_transaction_timeout,
            read_only,
            application_name: self.config.application_name.clone(),
        }
    }

    /// Check out a validated session.
    ///
    /// Waits up to `connection_timeout` for a free slot, then fails with
    /// [`PoolError::Exhausted`]. A session that fails its liveness ping is
    /// replaced once; a second failure is a [`PoolError::Connection`].
    pub async fn get_connection(
        &self,
        read_only: bool,
    ) -> Result<PooledConnection<K::Connection>, PoolError> {
        if self.slots.is_closed() {
            return Err(PoolError::Closed);
        }
        self.ensure_initialized().await?;

        let timeout = self.config.connection_timeout;
        let permit = match tokio::time::timeout(timeout, self.slots.clone().acquire_owned()).await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                let mut state = lock_state(&self.state);
                state.counters.exhausted += 1;
                let err = PoolError::Exhausted { timeout };
                state.record_error(err.to_string());
                tracing::warn!(
                    max = self.config.max_connections,
                    ?timeout,
                    "connection pool exhausted"
                );
                return Err(err);
            }
        };

        let settings = self.session_settings(read_only);
        let (mut conn, mut id) = self.take_session().await?;
        let mut slot = LiveSlot::new(&self.state);
        self.configure(&mut conn, id, &settings).await;

        if let Err(first) = conn.ping().await {
            tracing::warn!(conn_id = id, error = %first, "connection failed validation, retrying");
            slot.disarm();
            self.discard(conn).await;
            let (mut retry, retry_id) = self.open_session().await?;
            slot = LiveSlot::new(&self.state);
            self.configure(&mut retry, retry_id, &settings).await;
            if let Err(second) = retry.ping().await {
                slot.disarm();
                self.discard(retry).await;
                tracing::error!(conn_id = retry_id, error = %second, "connection failed validation twice");
                lock_state(&self.state).record_error(second.to_string());
                return Err(PoolError::Connection(second));
            }
            conn = retry;
            id = retry_id;
        }
        // the checkout guard owns the session's accounting from here
        slot.disarm();

        let generation = {
            let mut state = lock_state(&self.state);
            state.counters.total += 1;
            state.counters.active += 1;
            state.generation
        };
        tracing::debug!(conn_id = id, read_only, "connection checked out");

        Ok(PooledConnection {
            conn,
            guard: CheckoutGuard {
                state: Arc::clone(&self.state),
                returned: false,
                _permit: permit,
            },
            id,
            generation,
            read_only,
        })
    }

    /// Pop an idle session, dropping any that report closed, or open a new one
    async fn take_session(&self) -> Result<(K::Connection, u64), PoolError> {
        loop {
            let popped = lock_state(&self.state).idle.pop();
            match popped {
                Some(idle) if idle.conn.is_closed() => {
                    tracing::debug!(conn_id = idle.id, "discarding closed idle connection");
                    self.discard(idle.conn).await;
                }
                Some(idle) => return Ok((idle.conn, idle.id)),
                None => return self.open_session().await,
            }
        }
    }

    async fn open_session(&self) -> Result<(K::Connection, u64), PoolError> {
        match self.connector.connect().await {
            Ok(conn) => {
                lock_state(&self.state).live += 1;
                Ok((conn, self.next_id.fetch_add(1, Ordering::Relaxed)))
            }
            Err(e) => {
                tracing::error!(
                    target_db = %self.connector.describe(),
                    kind = ?e.kind,
                    hint = e.kind.hint(),
                    error = %e,
                    "failed to open database connection"
                );
                lock_state(&self.state).record_error(e.to_string());
                Err(PoolError::Connection(e))
            }
        }
    }

    async fn discard(&self, mut conn: K::Connection) {
        let _slot = LiveSlot::new(&self.state);
        conn.close().await;
    }

    // Failures here leave the server defaults in place
    async fn configure(&self, conn: &mut K::Connection, id: u64, settings: &SessionSettings) {
        for statement in settings.statements() {
            if let Err(e) = conn.execute(&statement).await {
                tracing::warn!(conn_id = id, %statement, error = %e, "failed to configure session");
                break;
            }
        }
    }

    /// Return a checked-out session.
    ///
    /// Any open transaction is rolled back first. The session is closed
    /// instead of kept when `close` is set, the rollback fails, or the pool
    /// was closed since checkout.
    pub async fn return_connection(&self, pooled: PooledConnection<K::Connection>, close: bool) {
        let PooledConnection {
            mut conn,
            mut guard,
            id,
            generation,
            ..
        } = pooled;

        let mut close = close;
        if !conn.is_closed() {
            if let Err(e) = conn.rollback().await {
                tracing::warn!(conn_id = id, error = %e, "rollback on return failed, closing connection");
                close = true;
            }
        }

        let to_close = {
            let mut state = lock_state(&self.state);
            state.counters.active = state.counters.active.saturating_sub(1);
            let keep = !close
                && !conn.is_closed()
                && state.initialized
                && generation == state.generation;
            if keep {
                state.idle.push(IdleConnection { conn, id });
                None
            } else {
                state.live = state.live.saturating_sub(1);
                Some(conn)
            }
        };
        guard.returned = true;

        if let Some(mut conn) = to_close {
            conn.close().await;
            tracing::debug!(conn_id = id, "connection closed on return");
        } else {
            tracing::debug!(conn_id = id, "connection returned");
        }
    }

    /// Run one statement on a pooled session
    pub async fn execute(&self, sql: &str, read_only: bool) -> Result<u64, PoolError> {
        let mut conn = self.get_connection(read_only).await?;
        let result = conn.execute(sql).await;
        match result {
            Ok(rows) => {
                lock_state(&self.state).counters.queries += 1;
                self.return_connection(conn, false).await;
                Ok(rows)
            }
            Err(e) => {
                lock_state(&self.state).record_error(e.to_string());
                let lost = e.connection_lost;
                self.return_connection(conn, lost).await;
                Err(PoolError::Query(e))
            }
        }
    }

    /// Run statements inside a single transaction
    pub async fn transaction(&self, statements: &[&str]) -> Result<u64, PoolError> {
        let mut conn = self.get_connection(false).await?;
        let result = run_transaction(&mut *conn, statements).await;
        match result {
            Ok(rows) => {
                {
                    let mut state = lock_state(&self.state);
                    state.counters.transactions += 1;
                    state.counters.queries += statements.len() as u64;
                }
                self.return_connection(conn, false).await;
                Ok(rows)
            }
            Err(e) => {
                tracing::warn!(conn_id = conn.id(), error = %e, "transaction failed");
                lock_state(&self.state).record_error(e.to_string());
                let lost = e.connection_lost;
                self.return_connection(conn, lost).await;
                Err(PoolError::Query(e))
            }
        }
    }

    /// Query server facts on a fresh checkout and report pool health
    pub async fn health_check(&self) -> HealthReport {
        let result = self.probe_server().await;
        let stats = self.stats();
        match result {
            Ok(server) => HealthReport {
                status: PoolHealth::Healthy,
                server: Some(server),
                error: None,
                cause: None,
                stats,
            },
            Err(e) => {
                tracing::error!(error = %e, "database health check failed");
                HealthReport {
                    status: PoolHealth::Unhealthy,
                    server: None,
                    error: Some(e.to_string()),
                    cause: Some(e),
                    stats,
                }
            }
        }
    }

    async fn probe_server(&self) -> Result<crate::backend::ServerInfo, PoolError> {
        let mut conn = self.get_connection(true).await?;
        let result = conn.server_info().await;
        match result {
            Ok(info) => {
                lock_state(&self.state).counters.queries += 1;
                self.return_connection(conn, false).await;
                Ok(info)
            }
            Err(e) => {
                lock_state(&self.state).record_error(e.to_string());
                let lost = e.connection_lost;
                self.return_connection(conn, lost).await;
                Err(PoolError::Query(e))
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        let state = lock_state(&self.state);
        let idle = state.idle.len() as u64;
        PoolStats {
            total_connections: state.counters.total,
            active_connections: state.counters.active,
            errors: state.counters.errors,
            queries_executed: state.counters.queries,
            transactions_executed: state.counters.transactions,
            pool_exhausted_count: state.counters.exhausted,
            last_error: state.counters.last_error.clone(),
            last_error_time: state.counters.last_error_time,
            pool_size: state.live,
            available_connections: idle,
            used_connections: state.live.saturating_sub(idle),
            min_connections: self.config.min_connections,
            max_connections: self.config.max_connections,
        }
    }

    /// Close every idle session and mark the pool uninitialized.
    ///
    /// Sessions still checked out are closed when they come back. The next
    /// checkout initializes the pool again.
    pub async fn close_all(&self) {
        let _init = self.init_lock.lock().await;
        let drained = {
            let mut state = lock_state(&self.state);
            state.initialized = false;
            state.generation += 1;
            state.counters.active = 0;
            let drained = std::mem::take(&mut state.idle);
            state.live = state.live.saturating_sub(drained.len() as u64);
            drained
        };
        let closed = drained.len();
        for mut idle in drained {
            idle.conn.close().await;
        }
        tracing::info!(closed, "closed all pooled connections");
    }

    /// Close everything and refuse further checkouts
    pub async fn shutdown(&self) {
        self.slots.close();
        self.close_all().await;
    }
}

async fn run_transaction<C: DbConnection>(
    conn: &mut C,
    statements: &[&str],
) -> Result<u64, BackendError> {
    conn.execute("BEGIN").await?;
    let mut rows = 0;
    for statement in statements {
        rows += conn.execute(statement).await?;
    }
    conn.execute("COMMIT").await?;
    Ok(rows)
}

/// Releases the slot and fixes counters if a checkout is dropped unreturned
struct CheckoutGuard<C> {
    state: Arc<Mutex<PoolState<C>>>,
    returned: bool,
    _permit: OwnedSemaphorePermit,
}

impl<C> Drop for CheckoutGuard<C> {
    fn drop(&mut self) {
        if self.returned {
            return;
        }
        let mut state = lock_state(&self.state);
        state.counters.active = state.counters.active.saturating_sub(1);
        state.live = state.live.saturating_sub(1);
        tracing::warn!("pooled connection dropped without being returned");
    }
}

/// Counts a session that is open but neither idle nor checked out.
///
/// Dropping it armed removes the session from `live`, including when the
/// future holding it is cancelled mid-await.
struct LiveSlot<'a, C> {
    state: &'a Mutex<PoolState<C>>,
    armed: bool,
}

impl<'a, C> LiveSlot<'a, C> {
    fn new(state: &'a Mutex<PoolState<C>>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<C> Drop for LiveSlot<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = lock_state(self.state);
            state.live = state.live.saturating_sub(1);
        }
    }
}

/// A checked-out session. Hand it back with
/// [`ConnectionPool::return_connection`].
pub struct PooledConnection<C: DbConnection> {
    conn: C,
    guard: CheckoutGuard<C>,
    id: u64,
    generation: u64,
    read_only: bool,
}

impl<C: DbConnection> PooledConnection<C> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl<C: DbConnection> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.conn
    }
}

impl<C: DbConnection> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.conn
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
