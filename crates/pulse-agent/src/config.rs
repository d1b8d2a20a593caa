use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("can not parse config file: {0}")]
    File(#[from] serde_json::Error),

    #[error("can not parse {name}: {value}")]
    Env { name: &'static str, value: String },

    #[error("{0}")]
    Invalid(&'static str),
}

/// Resolved agent configuration, layered the same way as the server's:
/// defaults, then the JSON config file, then flags, then environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub address: String,
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub key: String,
    pub rate_limit: usize,
    pub crypto_key: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
            poll_interval: Duration::from_secs(2),
            report_interval: Duration::from_secs(10),
            key: String::new(),
            rate_limit: 100,
            crypto_key: None,
        }
    }
}

#[derive(Debug, Default, Parser)]
#[command(name = "pulse-agent", about = "telemetry sampling agent")]
struct Cli {
    /// Server address to ship metrics to.
    #[arg(short = 'a', long = "address")]
    address: Option<String>,

    /// Sampling interval in seconds.
    #[arg(short = 'p', long = "poll-interval")]
    poll_interval: Option<u64>,

    /// Shipping interval in seconds.
    #[arg(short = 'r', long = "report-interval")]
    report_interval: Option<u64>,

    /// Shared HMAC secret.
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Concurrent ship workers and request channel depth.
    #[arg(short = 'l', long = "rate-limit")]
    rate_limit: Option<usize>,

    /// Path to the PEM public key used to encrypt request bodies.
    #[arg(long = "crypto-key")]
    crypto_key: Option<PathBuf>,

    /// Path to a JSON config file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    address: Option<String>,
    poll_interval: Option<u64>,
    report_interval: Option<u64>,
    rate_limit: Option<usize>,
    crypto_key: Option<PathBuf>,
}

impl AgentConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let cli = Cli::parse();

        let file = match &cli.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => FileConfig::default(),
        };

        let mut config = Self::default();
        config.apply_file(file);
        config.apply_cli(cli);
        config.apply_env()?;
        config.validate()
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(address) = file.address {
            self.address = address;
        }
        if let Some(secs) = file.poll_interval {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = file.report_interval {
            self.report_interval = Duration::from_secs(secs);
        }
        if let Some(rate_limit) = file.rate_limit {
            self.rate_limit = rate_limit;
        }
        if file.crypto_key.is_some() {
            self.crypto_key = file.crypto_key;
        }
    }

    fn apply_cli(&mut self, cli: Cli) {
        if let Some(address) = cli.address {
            self.address = address;
        }
        if let Some(secs) = cli.poll_interval {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = cli.report_interval {
            self.report_interval = Duration::from_secs(secs);
        }
        if let Some(key) = cli.key {
            self.key = key;
        }
        if let Some(rate_limit) = cli.rate_limit {
            self.rate_limit = rate_limit;
        }
        if cli.crypto_key.is_some() {
            self.crypto_key = cli.crypto_key;
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(address) = std::env::var("ADDRESS") {
            self.address = address;
        }
        if let Ok(raw) = std::env::var("POLL_INTERVAL") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::Env {
                name: "POLL_INTERVAL",
                value: raw,
            })?;
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var("REPORT_INTERVAL") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::Env {
                name: "REPORT_INTERVAL",
                value: raw,
            })?;
            self.report_interval = Duration::from_secs(secs);
        }
        if let Ok(key) = std::env::var("KEY") {
            self.key = key;
        }
        if let Ok(raw) = std::env::var("RATE_LIMIT") {
            self.rate_limit = raw.parse::<usize>().map_err(|_| ConfigError::Env {
                name: "RATE_LIMIT",
                value: raw,
            })?;
        }
        if let Ok(path) = std::env::var("CRYPTO_KEY") {
            self.crypto_key = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll interval must be positive"));
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::Invalid("report interval must be positive"));
        }
        Ok(self)
    }
}
