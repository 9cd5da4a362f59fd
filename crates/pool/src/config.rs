// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection pool configuration

use crate::error::PoolError;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

const SSL_MODES: &[&str] = &[
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

/// Database connection and pool sizing settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Connection URL; overrides the individual connection fields when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Upper bound on connecting and on waiting for a free slot
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub statement_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub idle_in_transaction_timeout: Duration,
    pub application_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "vigil".to_string(),
            ssl_mode: "prefer".to_string(),
            min_connections: 2,
            max_connections: 10,
            connection_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_millis(30_000),
            idle_in_transaction_timeout: Duration::from_millis(60_000),
            application_name: "vigil".to_string(),
        }
    }
}

// Keeps the password out of logs
impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("target", &self.target())
            .field("ssl_mode", &self.ssl_mode)
            .field("min_connections", &self.min_connections)
            .field("max_connections", &self.max_connections)
            .field("connection_timeout", &self.connection_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .field("idle_in_transaction_timeout", &self.idle_in_transaction_timeout)
            .finish()
    }
}

impl PoolConfig {
    /// Build from process environment variables
    pub fn from_env() -> Result<Self, PoolError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup.
    ///
    /// `DATABASE_URL` wins over `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/
    /// `DB_NAME`/`DB_SSLMODE`. Pool sizing comes from `DB_POOL_MIN`,
    /// `DB_POOL_MAX`, `DB_TIMEOUT` (seconds), `DB_STATEMENT_TIMEOUT` and
    /// `DB_IDLE_TIMEOUT` (milliseconds).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PoolError> {
        let mut config = PoolConfig::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.apply_url(&url)?;
        } else {
            if let Some(host) = lookup("DB_HOST") {
                config.host = host;
            }
            if let Some(port) = lookup("DB_PORT") {
                config.port = parse_number("DB_PORT", &port)?;
            }
            if let Some(user) = lookup("DB_USER") {
                config.user = user;
            }
            if let Some(password) = lookup("DB_PASSWORD") {
                config.password = password;
            }
            if let Some(database) = lookup("DB_NAME") {
                config.database = database;
            }
            if let Some(ssl_mode) = lookup("DB_SSLMODE") {
                config.ssl_mode = ssl_mode;
            }
        }

        if let Some(min) = lookup("DB_POOL_MIN") {
            config.min_connections = parse_number("DB_POOL_MIN", &min)?;
        }
        if let Some(max) = lookup("DB_POOL_MAX") {
            config.max_connections = parse_number("DB_POOL_MAX", &max)?;
        }
        if let Some(secs) = lookup("DB_TIMEOUT") {
            config.connection_timeout = Duration::from_secs(parse_number("DB_TIMEOUT", &secs)?);
        }
        if let Some(ms) = lookup("DB_STATEMENT_TIMEOUT") {
            config.statement_timeout =
                Duration::from_millis(parse_number("DB_STATEMENT_TIMEOUT", &ms)?);
        }
        if let Some(ms) = lookup("DB_IDLE_TIMEOUT") {
            config.idle_in_transaction_timeout =
                Duration::from_millis(parse_number("DB_IDLE_TIMEOUT", &ms)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Fold a `url` set in a config file into the connection fields
    pub fn resolved(mut self) -> Result<Self, PoolError> {
        if let Some(url) = self.url.take() {
            self.apply_url(&url)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Overwrite connection fields from a `postgres://` URL
    pub fn apply_url(&mut self, raw: &str) -> Result<(), PoolError> {
        let url = Url::parse(raw).map_err(|e| PoolError::Config(format!("invalid database url: {e}")))?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(PoolError::Config(format!(
                "unsupported database url scheme: {}",
                url.scheme()
            )));
        }

        self.host = url.host_str().unwrap_or("localhost").to_string();
        self.port = url.port().unwrap_or(5432);
        if !url.username().is_empty() {
            self.user = decode_component("user", url.username())?;
        }
        self.password = decode_component("password", url.password().unwrap_or_default())?;
        let database = decode_component("database", url.path().trim_start_matches('/'))?;
        if !database.is_empty() {
            self.database = database;
        }

        self.ssl_mode = url
            .query_pairs()
            .find(|(k, _)| k == "sslmode")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| {
                if self.host.contains("amazonaws.com") {
                    "require".to_string()
                } else {
                    "prefer".to_string()
                }
            });

        tracing::info!(target_db = %self.target(), "parsed database url");
        Ok(())
    }

    /// Reject sizes and timeouts the pool cannot work with
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_connections == 0 {
            return Err(PoolError::Config("max_connections must be at least 1".into()));
        }
        if self.min_connections > self.max_connections {
            return Err(PoolError::Config(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        for (name, timeout) in [
            ("connection_timeout", self.connection_timeout),
            ("statement_timeout", self.statement_timeout),
            ("idle_in_transaction_timeout", self.idle_in_transaction_timeout),
        ] {
            if timeout.is_zero() {
                return Err(PoolError::Config(format!("{name} must be non-zero")));
            }
        }
        if !SSL_MODES.contains(&self.ssl_mode.as_str()) {
            return Err(PoolError::Config(format!("unknown ssl_mode: {}", self.ssl_mode)));
        }
        Ok(())
    }

    /// `user@host:port/database`, for logs
    pub fn target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

// URL userinfo and path arrive percent-encoded
fn decode_component(field: &str, raw: &str) -> Result<String, PoolError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| PoolError::Config(format!("invalid {field} in database url: {e}")))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, PoolError> {
    value
        .trim()
        .parse()
        .map_err(|_| PoolError::Config(format!("{key} is not a valid number: {value}")))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
