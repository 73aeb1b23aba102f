use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;
use thiserror::Error;
use tracing::info;

use crate::domain::services::events::DEFAULT_EVENT_BUS_CAPACITY;
use crate::domain::services::orderbook::orderbook_worker::DEFAULT_COMMAND_BUFFER;

const APP_ADDR: &str = "APP_ADDR";
const APP_PORT: &str = "APP_PORT";
const EVENT_BUS_CAPACITY: &str = "EVENT_BUS_CAPACITY";
const COMMAND_BUFFER: &str = "COMMAND_BUFFER";
const EVENT_LOG_DIR: &str = "EVENT_LOG_DIR";
const DEPTH_LIMIT: &str = "DEPTH_LIMIT";

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DEPTH_LIMIT: usize = 20;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for environment variable {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Command line overrides for the environment configuration
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "order-matching-engine", about = "Limit order matching engine with a REST API")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long)]
    pub addr: Option<SocketAddr>,

    /// Directory for the JSONL event journal
    #[arg(long)]
    pub event_log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub event_bus_capacity: usize,
    pub command_buffer: usize,
    /// Journal directory; no journal is written when unset
    pub event_log_dir: Option<PathBuf>,
    pub depth_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            event_log_dir: None,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn try_from_env() -> Result<Config, ConfigError> {
        dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(addr = %config.addr, "Loaded configuration");
        Ok(config)
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr_value = lookup(APP_ADDR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let mut addr: SocketAddr = parse(APP_ADDR, &addr_value)?;
        if let Some(port) = lookup(APP_PORT) {
            addr.set_port(parse(APP_PORT, &port)?);
        }

        let event_bus_capacity = match lookup(EVENT_BUS_CAPACITY) {
            Some(value) => parse_positive(EVENT_BUS_CAPACITY, &value)?,
            None => DEFAULT_EVENT_BUS_CAPACITY,
        };
        let command_buffer = match lookup(COMMAND_BUFFER) {
            Some(value) => parse_positive(COMMAND_BUFFER, &value)?,
            None => DEFAULT_COMMAND_BUFFER,
        };
        let depth_limit = match lookup(DEPTH_LIMIT) {
            Some(value) => parse_positive(DEPTH_LIMIT, &value)?,
            None => DEFAULT_DEPTH_LIMIT,
        };
        let event_log_dir = lookup(EVENT_LOG_DIR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            addr,
            event_bus_capacity,
            command_buffer,
            event_log_dir,
            depth_limit,
        })
    }

    /// Applies command line overrides on top of this configuration.
    pub fn with_args(mut self, args: Args) -> Config {
        if let Some(addr) = args.addr {
            self.addr = addr;
        }
        if let Some(dir) = args.event_log_dir {
            self.event_log_dir = Some(dir);
        }
        self
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    match parse::<usize>(key, value)? {
        0 => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
        n => Ok(n),
    }
}
