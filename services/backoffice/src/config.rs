//! Back-office service configuration.
//!
//! Values come from `BACKOFFICE_*` environment variables. When
//! `BACKOFFICE_CONFIG` names a YAML file, any field present there overrides
//! the environment.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend {other} (expected memory or postgres)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_pg_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_pg_max_connections() -> u32 {
    DEFAULT_PG_MAX_CONNECTIONS
}

fn default_pg_acquire_timeout_ms() -> u64 {
    DEFAULT_PG_ACQUIRE_TIMEOUT_MS
}

#[derive(Debug, Clone)]
pub struct BackOfficeConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    /// Check that referenced enquiries, users, and profiles exist before
    /// writing a profile mapping.
    pub verify_references: bool,
}

#[derive(Debug, Deserialize)]
struct BackOfficeConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    verify_references: Option<bool>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("parse {key}: expected a boolean, got {other}"),
    }
}

impl BackOfficeConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("BACKOFFICE_BIND", "0.0.0.0:8443")
            .parse()
            .with_context(|| "parse BACKOFFICE_BIND")?;
        let metrics_bind = env_or("BACKOFFICE_METRICS_BIND", "0.0.0.0:8080")
            .parse()
            .with_context(|| "parse BACKOFFICE_METRICS_BIND")?;
        let storage = env_or("BACKOFFICE_STORAGE", "memory")
            .parse()
            .with_context(|| "parse BACKOFFICE_STORAGE")?;
        let verify_references = parse_bool(
            "BACKOFFICE_VERIFY_REFERENCES",
            &env_or("BACKOFFICE_VERIFY_REFERENCES", "true"),
        )?;

        let postgres = match std::env::var("BACKOFFICE_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_or(
                    "BACKOFFICE_PG_MAX_CONNECTIONS",
                    &DEFAULT_PG_MAX_CONNECTIONS.to_string(),
                )
                .parse()
                .with_context(|| "parse BACKOFFICE_PG_MAX_CONNECTIONS")?,
                acquire_timeout_ms: env_or(
                    "BACKOFFICE_PG_ACQUIRE_TIMEOUT_MS",
                    &DEFAULT_PG_ACQUIRE_TIMEOUT_MS.to_string(),
                )
                .parse()
                .with_context(|| "parse BACKOFFICE_PG_ACQUIRE_TIMEOUT_MS")?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            verify_references,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("BACKOFFICE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read BACKOFFICE_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: BackOfficeConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse backoffice config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.verify_references {
            self.verify_references = value;
        }
        Ok(())
    }
}
