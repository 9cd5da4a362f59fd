// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, single pass, shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vg_adapters::{CheckAgent, TracedAgent};
use vg_core::{ScheduleError, SystemClock};
use vg_engine::{
    run_startup_checks, spawn_monitor, AgentRegistry, MonitorHandle, OptimizedRunner,
    SchedulerStatus, SmartScheduler, StartupReport,
};
use vg_pool::{ConnectionPool, Connector, PgConnector, PoolError};

use crate::agents::{ConfigValidator, ConnectionTester, TcpProbe};
use crate::config::VigilConfig;

/// Errors that stop the daemon
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to render config: {0}")]
    RenderConfig(#[from] toml::ser::Error),

    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Database pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output of a single forced pass
#[derive(Debug, Clone, Serialize)]
pub struct OnceReport {
    pub startup: StartupReport,
    pub status: SchedulerStatus,
}

/// Running daemon: pool, agents, scheduler and the optional monitoring loop
pub struct Daemon<K: Connector = PgConnector> {
    config: VigilConfig,
    pool: Option<Arc<ConnectionPool<K>>>,
    runner: Arc<OptimizedRunner<SystemClock>>,
    startup: StartupReport,
    monitor: Option<MonitorHandle>,
}

/// Start the daemon against PostgreSQL, if a database is configured
pub async fn startup(config: VigilConfig) -> Result<Daemon<PgConnector>, LifecycleError> {
    let pool = match config.database_config()? {
        Some(db) => {
            info!(target_db = %db.target(), "database configured");
            Some(vg_pool::postgres_pool(db)?)
        }
        None => {
            info!("no database configured, skipping pool checks");
            None
        }
    };
    startup_with(config, pool).await
}

/// Start the daemon with a prepared (uninitialized) pool.
///
/// Pool initialization failure is fatal. Failed startup checks are
/// reported but do not stop the daemon.
pub async fn startup_with<K: Connector>(
    config: VigilConfig,
    pool: Option<ConnectionPool<K>>,
) -> Result<Daemon<K>, LifecycleError> {
    let pool = pool.map(Arc::new);
    if let Some(pool) = &pool {
        pool.initialize().await?;
    }

    let registry = build_registry(&config, pool.clone());
    let scheduler = Arc::new(SmartScheduler::new(config.daemon.project_root.clone()));
    for schedule in config.effective_schedules() {
        if registry.contains(&schedule.agent_name) {
            scheduler.register_agent(schedule)?;
        } else if config
            .schedules
            .iter()
            .any(|s| s.agent_name == schedule.agent_name)
        {
            warn!(agent = %schedule.agent_name, "schedule configured for unknown agent, ignoring");
        } else {
            debug!(agent = %schedule.agent_name, "no agent for default schedule");
        }
    }

    let runner = Arc::new(
        OptimizedRunner::new(scheduler, registry).enforce_timeouts(config.daemon.enforce_timeouts),
    );

    let startup = run_startup_checks(&runner).await;
    for failed in startup.failed() {
        warn!(
            agent = %failed.agent,
            critical = failed.critical_findings,
            error = failed.error.as_deref().unwrap_or(""),
            "startup check failed"
        );
    }
    info!(
        agents = runner.registry().len(),
        passed = startup.all_passed(),
        "daemon started"
    );

    Ok(Daemon {
        config,
        pool,
        runner,
        startup,
        monitor: None,
    })
}

fn build_registry<K: Connector>(
    config: &VigilConfig,
    pool: Option<Arc<ConnectionPool<K>>>,
) -> AgentRegistry {
    let probes = config
        .probes
        .iter()
        .map(|p| TcpProbe {
            name: p.name.clone(),
            address: p.address.clone(),
            timeout: p.timeout,
            critical: p.critical,
        })
        .collect();
    let validator = ConfigValidator::new(
        config.daemon.project_root.clone(),
        config.config_validator.env_files.clone(),
        config.config_validator.required_keys.clone(),
    );

    AgentRegistry::new()
        .with(TracedAgent::new(CheckAgent::new(ConnectionTester::new(pool, probes))))
        .with(TracedAgent::new(CheckAgent::new(validator)))
}

impl<K: Connector> Daemon<K> {
    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    pub fn pool(&self) -> Option<&Arc<ConnectionPool<K>>> {
        self.pool.as_ref()
    }

    pub fn runner(&self) -> &Arc<OptimizedRunner<SystemClock>> {
        &self.runner
    }

    pub fn startup_report(&self) -> &StartupReport {
        &self.startup
    }

    pub fn status(&self) -> SchedulerStatus {
        self.runner.scheduler().status()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| !m.is_finished())
    }

    /// Spawn the background monitoring loop
    pub fn start_monitoring(&mut self) {
        if self.monitor.is_some() {
            warn!("monitoring loop already running");
            return;
        }
        self.monitor = Some(spawn_monitor(
            Arc::clone(&self.runner),
            self.config.monitor(),
            CancellationToken::new(),
        ));
    }

    /// Run every registered agent once, ignoring schedules
    pub async fn run_once(&self) -> OnceReport {
        let names: Vec<String> = self.runner.registry().names().map(String::from).collect();
        for name in names {
            if let Err(e) = self.runner.run_agent_if_needed(&name, true).await {
                warn!(agent = %name, error = %e, "forced run failed");
            }
        }
        OnceReport {
            startup: self.startup.clone(),
            status: self.status(),
        }
    }

    /// Stop the monitoring loop and close the pool
    pub async fn shutdown(&mut self) {
        info!("shutting down daemon");
        if let Some(monitor) = self.monitor.take() {
            monitor.shutdown().await;
        }
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
        info!("daemon shutdown complete");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
