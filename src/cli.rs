//! Command-line interface parsing for cepcache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated `StartupConfig` for the lookup run.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cache::default_db_path;
use crate::data::viacep::VIACEP_BASE_URL;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Concurrency must allow at least one lookup in flight
    #[error("Invalid concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    /// A zero timeout would fail every request
    #[error("Invalid timeout: 0 seconds. Omit --timeout to wait indefinitely")]
    ZeroTimeout,

    /// Base URL is not an http(s) URL
    #[error("Invalid base URL: '{0}'. Must start with http:// or https://")]
    InvalidBaseUrl(String),
}

/// cepcache - Look up Brazilian postal codes with a local cache
#[derive(Parser, Debug)]
#[command(name = "cepcache")]
#[command(about = "Resolve CEPs to addresses, caching results in a local database")]
#[command(version)]
pub struct Cli {
    /// One or more CEPs; punctuation is ignored (e.g. 01001-000)
    ///
    /// Examples:
    ///   cepcache 01001000
    ///   cepcache 01001-000 70040-010 --json
    #[arg(required = true, value_name = "CEP")]
    pub codes: Vec<String>,

    /// Path of the cache database (created if missing)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Base URL of the ViaCEP service
    #[arg(long, value_name = "URL", default_value = VIACEP_BASE_URL)]
    pub base_url: String,

    /// HTTP timeout in seconds (no timeout by default)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of lookups in flight at once
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub concurrency: usize,

    /// Print each address as a JSON object instead of text
    #[arg(long)]
    pub json: bool,
}

/// Configuration derived from CLI arguments for a lookup run
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Raw codes exactly as given
    pub codes: Vec<String>,
    /// Cache database location
    pub db_path: PathBuf,
    /// ViaCEP base URL
    pub base_url: String,
    /// Optional HTTP timeout
    pub timeout: Option<Duration>,
    /// Lookups in flight at once
    pub concurrency: usize,
    /// JSON output
    pub json: bool,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with defaults filled in
    /// * `Err(CliError)` if an option is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.concurrency == 0 {
            return Err(CliError::InvalidConcurrency(cli.concurrency));
        }

        let timeout = match cli.timeout {
            Some(0) => return Err(CliError::ZeroTimeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        if !(cli.base_url.starts_with("http://") || cli.base_url.starts_with("https://")) {
            return Err(CliError::InvalidBaseUrl(cli.base_url.clone()));
        }

        Ok(StartupConfig {
            codes: cli.codes.clone(),
            db_path: cli.db.clone().unwrap_or_else(default_db_path),
            base_url: cli.base_url.clone(),
            timeout,
            concurrency: cli.concurrency,
            json: cli.json,
        })
    }
}
