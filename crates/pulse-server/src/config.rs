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
}

/// Resolved server configuration. Sources are layered: built-in defaults,
/// then the JSON config file, then command-line flags, then environment
/// variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub rpc_address: String,
    pub store_interval: Duration,
    pub file_storage_path: PathBuf,
    pub restore: bool,
    pub database_dsn: String,
    pub key: String,
    pub crypto_key: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
            rpc_address: "localhost:8081".to_string(),
            store_interval: Duration::from_secs(300),
            file_storage_path: PathBuf::from("/tmp/metrics-db.json"),
            restore: true,
            database_dsn: String::new(),
            key: String::new(),
            crypto_key: None,
        }
    }
}

#[derive(Debug, Default, Parser)]
#[command(name = "pulse-server", about = "telemetry ingestion server")]
struct Cli {
    /// HTTP listen address.
    #[arg(short = 'a', long = "address")]
    address: Option<String>,

    /// RPC listen address.
    #[arg(long = "rpc-address")]
    rpc_address: Option<String>,

    /// Snapshot interval in seconds; 0 dumps after every write.
    #[arg(short = 'i', long = "store-interval")]
    store_interval: Option<u64>,

    /// Snapshot file path.
    #[arg(short = 'f', long = "file-storage-path")]
    file_storage_path: Option<PathBuf>,

    /// Restore the store from the snapshot file on boot.
    #[arg(short = 'r', long = "restore", num_args = 0..=1, default_missing_value = "true")]
    restore: Option<bool>,

    /// Database connection string; empty keeps the in-memory store.
    #[arg(short = 'd', long = "database-dsn")]
    database_dsn: Option<String>,

    /// Shared HMAC secret.
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Path to the PEM private key used to decrypt request bodies.
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
    rpc_address: Option<String>,
    store_interval: Option<u64>,
    store_file: Option<PathBuf>,
    restore: Option<bool>,
    database_dsn: Option<String>,
    crypto_key: Option<PathBuf>,
}

impl ServerConfig {
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
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(address) = file.address {
            self.address = address;
        }
        if let Some(rpc_address) = file.rpc_address {
            self.rpc_address = rpc_address;
        }
        if let Some(secs) = file.store_interval {
            self.store_interval = Duration::from_secs(secs);
        }
        if let Some(path) = file.store_file {
            self.file_storage_path = path;
        }
        if let Some(restore) = file.restore {
            self.restore = restore;
        }
        if let Some(dsn) = file.database_dsn {
            self.database_dsn = dsn;
        }
        if file.crypto_key.is_some() {
            self.crypto_key = file.crypto_key;
        }
    }

    fn apply_cli(&mut self, cli: Cli) {
        if let Some(address) = cli.address {
            self.address = address;
        }
        if let Some(rpc_address) = cli.rpc_address {
            self.rpc_address = rpc_address;
        }
        if let Some(secs) = cli.store_interval {
            self.store_interval = Duration::from_secs(secs);
        }
        if let Some(path) = cli.file_storage_path {
            self.file_storage_path = path;
        }
        if let Some(restore) = cli.restore {
            self.restore = restore;
        }
        if let Some(dsn) = cli.database_dsn {
            self.database_dsn = dsn;
        }
        if let Some(key) = cli.key {
            self.key = key;
        }
        if cli.crypto_key.is_some() {
            self.crypto_key = cli.crypto_key;
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(address) = std::env::var("ADDRESS") {
            self.address = address;
        }
        if let Ok(rpc_address) = std::env::var("RPC_ADDRESS") {
            self.rpc_address = rpc_address;
        }
        if let Ok(raw) = std::env::var("STORE_INTERVAL") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::Env {
                name: "STORE_INTERVAL",
                value: raw,
            })?;
            self.store_interval = Duration::from_secs(secs);
        }
        if let Ok(path) = std::env::var("FILE_STORAGE_PATH") {
            self.file_storage_path = PathBuf::from(path);
        }
        if let Ok(raw) = std::env::var("RESTORE") {
            self.restore = raw.parse::<bool>().map_err(|_| ConfigError::Env {
                name: "RESTORE",
                value: raw,
            })?;
        }
        if let Ok(dsn) = std::env::var("DATABASE_DSN") {
            self.database_dsn = dsn;
        }
        if let Ok(key) = std::env::var("KEY") {
            self.key = key;
        }
        if let Ok(path) = std::env::var("CRYPTO_KEY") {
            self.crypto_key = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_defaults() {
        let file: FileConfig = serde_json::from_str(
            r#"{"address": "0.0.0.0:9000", "store_interval": 1, "restore": false}"#,
        )
        .unwrap();
        let mut config = ServerConfig::default();
        config.apply_file(file);

        assert_eq!(config.address, "0.0.0.0:9000");
        assert_eq!(config.store_interval, Duration::from_secs(1));
        assert!(!config.restore);
        // Untouched fields keep their defaults.
        assert_eq!(config.file_storage_path, PathBuf::from("/tmp/metrics-db.json"));
    }

    #[test]
    fn flags_override_file() {
        let file: FileConfig = serde_json::from_str(r#"{"address": "0.0.0.0:9000"}"#).unwrap();
        let mut config = ServerConfig::default();
        config.apply_file(file);
        config.apply_cli(Cli {
            address: Some("localhost:7000".to_string()),
            ..Cli::default()
        });
        assert_eq!(config.address, "localhost:7000");
    }

    #[test]
    fn unknown_file_fields_are_ignored() {
        let file: Result<FileConfig, _> = serde_json::from_str(r#"{"addresss": "typo"}"#);
        assert!(file.is_ok());
    }
}
