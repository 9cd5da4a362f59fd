// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in agents shipped with the daemon

mod config_validator;
mod connection_tester;

pub use config_validator::{parse_env, ConfigValidator};
pub use connection_tester::{ConnectionTester, TcpProbe};

use vg_core::MetaValue;

/// Metadata value for an unsigned counter
pub(crate) fn count(value: u64) -> MetaValue {
    MetaValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
}
