use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::ratelimit::RateLimitRule;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DaybookConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    /// `"text"` or `"json"`.
    pub log_format: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Actor id used when a tool call or CLI command names none.
    pub default_actor: String,
}

/// Per-operation quotas. Every rule is a fixed window.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    /// `"memory"` or `"sqlite"`.
    pub backend: String,
    /// How often `serve` drops expired buckets.
    pub prune_interval_secs: u64,
    pub recall: RateLimitRule,
    pub journal_create: RateLimitRule,
    pub journal_update: RateLimitRule,
    pub journal_delete: RateLimitRule,
    /// Pipeline runs for entries stored outside daybook.
    pub journal_process: RateLimitRule,
    pub preference_write: RateLimitRule,
    pub memory_delete: RateLimitRule,
    pub memory_delete_all: RateLimitRule,
    pub checkin_settings_read: RateLimitRule,
    pub checkin_settings_update: RateLimitRule,
    pub checkin_list: RateLimitRule,
    pub checkin_action: RateLimitRule,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: "text".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_daybook_dir()
            .join("daybook.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            default_actor: "local".into(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: "memory".into(),
            prune_interval_secs: 60,
            recall: RateLimitRule::per_minute(30),
            journal_create: RateLimitRule::per_minute(10),
            journal_update: RateLimitRule::per_minute(15),
            journal_delete: RateLimitRule::per_minute(15),
            journal_process: RateLimitRule::per_minute(15),
            preference_write: RateLimitRule::per_minute(20),
            memory_delete: RateLimitRule::per_minute(20),
            memory_delete_all: RateLimitRule::per_minute(5),
            checkin_settings_read: RateLimitRule::per_minute(60),
            checkin_settings_update: RateLimitRule::per_minute(20),
            checkin_list: RateLimitRule::per_minute(60),
            checkin_action: RateLimitRule::per_minute(20),
        }
    }
}

impl RateLimitConfig {
    fn rules(&self) -> [(&'static str, RateLimitRule); 12] {
        [
            ("recall", self.recall),
            ("journal_create", self.journal_create),
            ("journal_update", self.journal_update),
            ("journal_delete", self.journal_delete),
            ("journal_process", self.journal_process),
            ("preference_write", self.preference_write),
            ("memory_delete", self.memory_delete),
            ("memory_delete_all", self.memory_delete_all),
            ("checkin_settings_read", self.checkin_settings_read),
            ("checkin_settings_update", self.checkin_settings_update),
            ("checkin_list", self.checkin_list),
            ("checkin_action", self.checkin_action),
        ]
    }

    /// Every rule must allow at least one request per window of at least 1ms.
    pub fn validate(&self) -> Result<()> {
        for (name, rule) in self.rules() {
            if rule.max_requests == 0 {
                bail!("rate_limit.{name}.max_requests must be at least 1");
            }
            if rule.window_ms < 1 {
                bail!("rate_limit.{name}.window_ms must be at least 1");
            }
        }
        if self.prune_interval_secs == 0 {
            bail!("rate_limit.prune_interval_secs must be at least 1");
        }
        Ok(())
    }
}

/// Returns `~/.daybook/`, or `./.daybook/` when no home directory is known.
pub fn default_daybook_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".daybook")
}

/// Returns the default config file path: `~/.daybook/config.toml`
pub fn default_config_path() -> PathBuf {
    default_daybook_dir().join("config.toml")
}

impl DaybookConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            DaybookConfig::default()
        };

        config.apply_env_overrides();
        config.rate_limit.validate()?;
        Ok(config)
    }

    /// DAYBOOK_DB, DAYBOOK_ACTOR, DAYBOOK_LOG_LEVEL, DAYBOOK_RATE_LIMIT_BACKEND.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DAYBOOK_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("DAYBOOK_ACTOR") {
            self.storage.default_actor = val;
        }
        if let Ok(val) = std::env::var("DAYBOOK_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("DAYBOOK_RATE_LIMIT_BACKEND") {
            self.rate_limit.backend = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
