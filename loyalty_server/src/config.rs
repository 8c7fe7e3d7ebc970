//! Server configuration.
//!
//! All settings are read from `LOYALTY_*` environment variables (a `.env` file is honoured by `main`). Missing or
//! unparseable values fall back to their defaults, and every fallback is logged.
use std::{env, time::Duration};

use log::*;
use loyalty_common::helpers::{parse_boolean_flag, parse_seconds};
use loyalty_engine::{AgentConfig, SQLITE_DB_URL};

const DEFAULT_LOYALTY_HOST: &str = "127.0.0.1";
const DEFAULT_LOYALTY_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = SQLITE_DB_URL;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_RATE_LIMIT: usize = 1;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TICK_DEADLINE: Duration = Duration::from_secs(30);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Base address of the accrual service. The server refuses to start without one.
    pub accrual_url: Option<String>,
    /// The number of concurrent requests the reconciliation agent may make to the accrual service.
    pub workers: usize,
    pub poll_interval: Duration,
    pub tick_deadline: Duration,
    pub request_timeout: Duration,
    /// If true, pending schema migrations are applied when the server starts.
    pub auto_migrate: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LOYALTY_HOST.to_string(),
            port: DEFAULT_LOYALTY_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            accrual_url: None,
            workers: DEFAULT_RATE_LIMIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            tick_deadline: DEFAULT_TICK_DEADLINE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            auto_migrate: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds a configuration using `var` to look up each setting by its environment variable name.
    pub fn from_vars<F>(var: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let host = var("LOYALTY_HOST").unwrap_or_else(|| DEFAULT_LOYALTY_HOST.into());
        let port = var("LOYALTY_PORT")
            .map(|s| {
                s.trim().parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for LOYALTY_PORT. {e} Using the default, {DEFAULT_LOYALTY_PORT}, \
                         instead."
                    );
                    DEFAULT_LOYALTY_PORT
                })
            })
            .unwrap_or(DEFAULT_LOYALTY_PORT);
        let database_url = var("LOYALTY_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ LOYALTY_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let max_connections = parse_count(&var, "LOYALTY_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let accrual_url = var("LOYALTY_ACCRUAL_URL").map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        if accrual_url.is_none() {
            error!("🪛️ LOYALTY_ACCRUAL_URL is not set. Please set it to the address of the accrual service.");
        }
        let workers = parse_count(&var, "LOYALTY_RATE_LIMIT", DEFAULT_RATE_LIMIT);
        let poll_interval = parse_duration(&var, "LOYALTY_POLL_INTERVAL", DEFAULT_POLL_INTERVAL);
        let tick_deadline = parse_duration(&var, "LOYALTY_TICK_DEADLINE", DEFAULT_TICK_DEADLINE);
        let request_timeout = parse_duration(&var, "LOYALTY_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT);
        let auto_migrate = parse_boolean_flag(var("LOYALTY_AUTO_MIGRATE"), true);
        Self {
            host,
            port,
            database_url,
            max_connections,
            accrual_url,
            workers,
            poll_interval,
            tick_deadline,
            request_timeout,
            auto_migrate,
        }
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig { poll_interval: self.poll_interval, tick_deadline: self.tick_deadline, workers: self.workers }
    }
}

fn parse_count<F, T>(var: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default + std::fmt::Display + Copy,
{
    match var(key) {
        None => default,
        Some(s) => match s.trim().parse::<T>() {
            Ok(n) if n > T::default() => n,
            _ => {
                warn!("🪛️ {s} is not a valid value for {key}. It must be a positive integer. Using {default} instead.");
                default
            },
        },
    }
}

fn parse_duration<F>(var: &F, key: &str, default: Duration) -> Duration
where F: Fn(&str) -> Option<String> {
    match var(key) {
        None => default,
        Some(s) => parse_seconds(&s).unwrap_or_else(|| {
            warn!(
                "🪛️ {s} is not a valid value for {key}. It must be a positive number of seconds. Using {}s instead.",
                default.as_secs()
            );
            default
        }),
    }
}
