// dbsync/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::database::artifact::Compressor;
use crate::errors::SyncError;
use crate::utils::{env_flag, remote_join};

const DEFAULT_LOCAL_ENV: &str = "development";
const DEFAULT_REMOTE_ENV: &str = "production";
const DEFAULT_DUMP_DIR: &str = "db";
const DEFAULT_BACKUP_PATH: &str = "db/backups";
const DEFAULT_ASSETS_DIR: &str = "system";
const DEFAULT_LOCAL_ASSETS_DIR: &str = "public";
const DEFAULT_SSH_PORT: u16 = 22;

// Structs for deserializing config.json
#[derive(Debug, Clone, Deserialize)]
pub struct JsonServerConfig {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub deploy_to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonEnvironment {
    pub database_url: String,
    pub server: Option<JsonServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJsonConfig {
    pub local_rails_env: Option<String>,
    pub rails_env: Option<String>,
    #[serde(default)]
    pub environments: BTreeMap<String, JsonEnvironment>,
    pub db_local_clean: Option<bool>,
    pub db_remote_clean: Option<bool>,
    pub db_dump_dir: Option<String>,
    pub backup_path: Option<String>,
    pub compressor: Option<Compressor>,
    pub db_ignore_tables: Option<Vec<String>>,
    pub disallow_pushing: Option<bool>,
    pub assets_dir: Option<serde_json::Value>,
    pub local_assets_dir: Option<String>,
}

/// Values taken from the process environment rather than the config file.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub rails_env: Option<String>,
    pub skip_data_sync_confirm: bool,
    pub new_dump: bool,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        EnvOverrides {
            rails_env: env::var("RAILS_ENV").ok().filter(|s| !s.trim().is_empty()),
            skip_data_sync_confirm: env_flag(env::var("SKIP_DATA_SYNC_CONFIRM").ok().as_deref()),
            new_dump: env_flag(env::var("NEW_DUMP").ok().as_deref()),
        }
    }
}

// Application's internal configuration structs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub user: Option<String>,
    pub port: u16,
    pub deploy_to: String,
}

impl ServerConfig {
    /// `user@host`, or just the host when no user is configured.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    pub fn current_path(&self) -> String {
        remote_join(&self.deploy_to, "current")
    }

    pub fn shared_path(&self) -> String {
        remote_join(&self.deploy_to, "shared")
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub name: String,
    pub database_url: String,
    pub server: Option<ServerConfig>,
}

impl Environment {
    pub fn server(&self) -> Result<&ServerConfig, SyncError> {
        self.server
            .as_ref()
            .ok_or_else(|| SyncError::MissingServer(self.name.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub local_rails_env: String,
    pub rails_env: String,
    pub environments: BTreeMap<String, Environment>,
    pub db_local_clean: bool,
    pub db_remote_clean: bool,
    pub db_dump_dir: String,
    pub backup_path: String,
    pub compressor: Compressor,
    pub db_ignore_tables: Vec<String>,
    pub disallow_pushing: bool,
    pub assets_dir: Vec<String>,
    pub local_assets_dir: String,
    pub skip_data_sync_confirm: bool,
    pub new_dump: bool,
}

impl Settings {
    pub fn load_from_json(config_path: &Path, overrides: &EnvOverrides) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;

        Self::from_raw(raw_json_config, overrides)
            .with_context(|| format!("Invalid configuration in {}", config_path.display()))
    }

    /// Applies defaults for every key the config file leaves out.
    pub fn from_raw(raw: RawJsonConfig, overrides: &EnvOverrides) -> Result<Self> {
        if raw.environments.is_empty() {
            return Err(SyncError::Config(
                "\"environments\" must define at least the local and remote environments".into(),
            )
            .into());
        }

        let environments = raw
            .environments
            .into_iter()
            .map(|(name, env)| {
                let server = env.server.map(|s| ServerConfig {
                    host: s.host,
                    user: s.user.filter(|u| !u.is_empty()),
                    port: s.port.unwrap_or(DEFAULT_SSH_PORT),
                    deploy_to: s.deploy_to,
                });
                let environment = Environment {
                    name: name.clone(),
                    database_url: env.database_url,
                    server,
                };
                (name, environment)
            })
            .collect();

        let local_rails_env = raw
            .local_rails_env
            .or_else(|| overrides.rails_env.clone())
            .unwrap_or_else(|| DEFAULT_LOCAL_ENV.to_string());

        Ok(Settings {
            local_rails_env,
            rails_env: raw.rails_env.unwrap_or_else(|| DEFAULT_REMOTE_ENV.to_string()),
            environments,
            db_local_clean: raw.db_local_clean.unwrap_or(false),
            db_remote_clean: raw.db_remote_clean.unwrap_or(false),
            db_dump_dir: non_empty_or(raw.db_dump_dir, DEFAULT_DUMP_DIR),
            backup_path: non_empty_or(raw.backup_path, DEFAULT_BACKUP_PATH),
            compressor: raw.compressor.unwrap_or_default(),
            db_ignore_tables: raw.db_ignore_tables.unwrap_or_default(),
            disallow_pushing: raw.disallow_pushing.unwrap_or(false),
            assets_dir: parse_assets_dir(&raw.assets_dir)?,
            local_assets_dir: non_empty_or(raw.local_assets_dir, DEFAULT_LOCAL_ASSETS_DIR),
            skip_data_sync_confirm: overrides.skip_data_sync_confirm,
            new_dump: overrides.new_dump,
        })
    }

    pub fn environment(&self, name: &str) -> Result<&Environment, SyncError> {
        self.environments
            .get(name)
            .ok_or_else(|| SyncError::UnknownEnvironment(name.to_string()))
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses `assets_dir`, which may be a single directory or a list of them.
fn parse_assets_dir(value: &Option<serde_json::Value>) -> Result<Vec<String>> {
    match value {
        Some(value) => {
            let dirs: Vec<String> = if value.is_string() {
                vec![serde_json::from_value(value.clone()).context("Failed to parse assets_dir")?]
            } else if value.is_array() {
                serde_json::from_value(value.clone())
                    .context("Failed to parse assets_dir as an array of directories")?
            } else {
                return Err(anyhow::anyhow!(
                    "assets_dir must be either a directory name or an array of directory names"
                ));
            };
            if dirs.is_empty() || dirs.iter().any(|d| d.trim().is_empty()) {
                return Err(anyhow::anyhow!("assets_dir entries cannot be empty"));
            }
            if let Some(dir) = dirs.iter().find(|d| d.starts_with('/')) {
                return Err(anyhow::anyhow!(
                    "assets_dir entry '{}' must be relative to the deployed application",
                    dir
                ));
            }
            Ok(dirs)
        }
        None => Ok(vec![DEFAULT_ASSETS_DIR.to_string()]),
    }
}
