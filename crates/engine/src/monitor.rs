// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background monitoring loop.
//!
//! Each tick runs every due agent to completion, one after another.
//! Cancellation is observed between ticks, so a tick in progress is never
//! cut short.

use crate::runner::{OptimizedRunner, RunOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vg_core::Clock;

/// Loop pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub tick: Duration,
    /// Sleep after a tick in which some agent failed
    pub error_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(5),
            error_backoff: Duration::from_secs(10),
        }
    }
}

/// Counts from one pass over the due agents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub ran: usize,
    pub cached: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Run every due agent that has a registered implementation
pub async fn run_tick<C: Clock>(runner: &OptimizedRunner<C>) -> TickReport {
    let mut report = TickReport::default();
    for next in runner.scheduler().get_next_scheduled() {
        if !next.is_due() || !runner.registry().contains(&next.agent) {
            continue;
        }
        match runner.run_agent_if_needed(&next.agent, false).await {
            Ok(RunOutcome::Fresh(_)) => report.ran += 1,
            Ok(RunOutcome::Cached { .. }) => report.cached += 1,
            Ok(RunOutcome::Skipped { .. }) => report.skipped += 1,
            Err(e) => {
                tracing::error!(agent = %next.agent, error = %e, "scheduled run failed");
                report.failed += 1;
            }
        }
    }
    report
}

/// Drive [`run_tick`] until `cancel` fires
pub async fn run_monitoring<C: Clock>(
    runner: &OptimizedRunner<C>,
    config: MonitorConfig,
    cancel: CancellationToken,
) {
    tracing::info!(tick = ?config.tick, "starting monitoring loop");
    let mut ticks: u64 = 0;
    while !cancel.is_cancelled() {
        let report = run_tick(runner).await;
        ticks += 1;
        if report.ran > 0 || report.failed > 0 {
            tracing::debug!(ticks, ?report, "monitoring tick");
        }

        let pause = if report.failed > 0 {
            config.error_backoff
        } else {
            config.tick
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }
    tracing::info!(ticks, "monitoring loop stopped");
}

/// Handle to a spawned monitoring loop
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for the current tick to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "monitoring task ended abnormally");
        }
    }
}

/// Spawn the monitoring loop on the runtime
pub fn spawn_monitor<C: Clock>(
    runner: Arc<OptimizedRunner<C>>,
    config: MonitorConfig,
    cancel: CancellationToken,
) -> MonitorHandle {
    let token = cancel.clone();
    let task = tokio::spawn(async move { run_monitoring(&runner, config, token).await });
    MonitorHandle { cancel, task }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
