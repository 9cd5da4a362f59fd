// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System load sampling for load-aware scheduling

use std::sync::{Arc, Mutex};
use sysinfo::System;

/// Load reported when the platform gives no reading
pub const FALLBACK_LOAD: f64 = 0.5;

/// Source of normalized system load in `0.0..=1.0`
pub trait LoadProbe: Send + Sync {
    fn sample(&self) -> f64;
}

/// One-minute load average divided by the number of cores
#[derive(Clone, Debug)]
pub struct SystemLoad {
    cpus: usize,
}

impl Default for SystemLoad {
    fn default() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        Self {
            cpus: sys.cpus().len(),
        }
    }
}

impl SystemLoad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpus(&self) -> usize {
        self.cpus
    }
}

impl LoadProbe for SystemLoad {
    fn sample(&self) -> f64 {
        let one_minute = System::load_average().one;
        normalize_load(one_minute, self.cpus).unwrap_or_else(|| {
            tracing::debug!(one_minute, cpus = self.cpus, "load average unavailable");
            FALLBACK_LOAD
        })
    }
}

/// Scale a one-minute load average by core count into `0.0..=1.0`.
///
/// `None` when there is no usable reading.
pub fn normalize_load(one_minute: f64, cpus: usize) -> Option<f64> {
    if cpus == 0 || !one_minute.is_finite() || one_minute < 0.0 {
        return None;
    }
    Some((one_minute / cpus as f64).clamp(0.0, 1.0))
}

/// Load probe returning a settable value
#[derive(Clone, Debug)]
pub struct FakeLoadProbe {
    load: Arc<Mutex<f64>>,
}

impl FakeLoadProbe {
    pub fn new(load: f64) -> Self {
        Self {
            load: Arc::new(Mutex::new(load)),
        }
    }

    pub fn set(&self, load: f64) {
        *self.load.lock().unwrap_or_else(|e| e.into_inner()) = load;
    }
}

impl Default for FakeLoadProbe {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl LoadProbe for FakeLoadProbe {
    fn sample(&self) -> f64 {
        *self.load.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
