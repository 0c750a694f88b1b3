use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::monitoring::SchedulerConfig;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    #[serde(default = "default_lease_grace_secs")]
    pub lease_grace_secs: u64,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_db_connections")]
    pub max_db_connections: u32,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    listen_address: Option<String>,
    tick_interval_secs: Option<u64>,
    max_concurrent_checks: Option<usize>,
    lease_grace_secs: Option<u64>,
    log_dir: Option<String>,
    max_db_connections: Option<u32>,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_max_concurrent_checks() -> usize {
    32
}

fn default_lease_grace_secs() -> u64 {
    30
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_max_db_connections() -> u32 {
    10
}

impl ServerConfig {
    /// Loads the optional TOML file, then the environment (after `.env`).
    /// Environment values override file values; defaults fill the rest.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Self::merge(env_config, file_config)
    }

    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Result<Self, String> {
        let final_config = ServerConfig {
            database_url: env_config.database_url.or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config.jwt_secret.or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            listen_address: env_config.listen_address.or(file_config.listen_address)
                .unwrap_or_else(default_listen_address),
            tick_interval_secs: env_config.tick_interval_secs.or(file_config.tick_interval_secs)
                .unwrap_or_else(default_tick_interval_secs),
            max_concurrent_checks: env_config.max_concurrent_checks.or(file_config.max_concurrent_checks)
                .unwrap_or_else(default_max_concurrent_checks),
            lease_grace_secs: env_config.lease_grace_secs.or(file_config.lease_grace_secs)
                .unwrap_or_else(default_lease_grace_secs),
            log_dir: env_config.log_dir.or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            max_db_connections: env_config.max_db_connections.or(file_config.max_db_connections)
                .unwrap_or_else(default_max_db_connections),
        };

        final_config.validate()?;
        Ok(final_config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if self.tick_interval_secs == 0 {
            return Err("TICK_INTERVAL_SECS must be greater than zero".to_string());
        }
        if self.max_concurrent_checks == 0 {
            return Err("MAX_CONCURRENT_CHECKS must be greater than zero".to_string());
        }
        if self.max_db_connections == 0 {
            return Err("MAX_DB_CONNECTIONS must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            max_concurrent_checks: self.max_concurrent_checks,
        }
    }

    pub fn lease_grace(&self) -> Duration {
        Duration::from_secs(self.lease_grace_secs)
    }
}
