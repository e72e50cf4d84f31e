//! Configuration management for Cadence
//!
//! Configuration lives in a TOML file resolved from `CADENCE_CONFIG` or the
//! platform config directory. Every section has defaults, so a missing file
//! yields a working (if adapter-less) setup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::retry::RetryMode;
use crate::types::PlatformKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/cadence/cadence.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Maximum due items handled by one trigger tick
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Seconds before an adapter call is abandoned
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout: u64,

    #[serde(default)]
    pub retry_policy: RetryMode,

    /// Base delay in seconds before a requeued task becomes due again
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    #[serde(default)]
    pub triggers: TriggersConfig,

    /// Keyed by platform name
    #[serde(default = "default_rate_limits")]
    pub rate_limits: BTreeMap<String, RateLimitConfig>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            adapter_timeout: default_adapter_timeout(),
            retry_policy: RetryMode::default(),
            retry_delay: default_retry_delay(),
            triggers: TriggersConfig::default(),
            rate_limits: default_rate_limits(),
        }
    }
}

impl SchedulingConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout)
    }

    /// Rate limits with platform names resolved
    pub fn platform_rate_limits(&self) -> Result<HashMap<PlatformKind, RateLimitConfig>> {
        self.rate_limits
            .iter()
            .map(|(name, limit)| Ok((name.parse::<PlatformKind>()?, *limit)))
            .collect()
    }
}

/// Trigger intervals as humantime strings ("5m", "2h", "1day")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggersConfig {
    #[serde(default = "default_publish_posts")]
    pub publish_posts: String,
    #[serde(default = "default_interaction_tasks")]
    pub interaction_tasks: String,
    #[serde(default = "default_monitor_trends")]
    pub monitor_trends: String,
    #[serde(default = "default_scrape_tasks")]
    pub scrape_tasks: String,
    #[serde(default = "default_generic_tasks")]
    pub generic_tasks: String,
    #[serde(default = "default_daily_analytics")]
    pub daily_analytics: String,
}

impl Default for TriggersConfig {
    fn default() -> Self {
        Self {
            publish_posts: default_publish_posts(),
            interaction_tasks: default_interaction_tasks(),
            monitor_trends: default_monitor_trends(),
            scrape_tasks: default_scrape_tasks(),
            generic_tasks: default_generic_tasks(),
            daily_analytics: default_daily_analytics(),
        }
    }
}

impl TriggersConfig {
    /// Every configured interval, keyed by its config field name
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("publish_posts", self.publish_posts.as_str()),
            ("interaction_tasks", self.interaction_tasks.as_str()),
            ("monitor_trends", self.monitor_trends.as_str()),
            ("scrape_tasks", self.scrape_tasks.as_str()),
            ("generic_tasks", self.generic_tasks.as_str()),
            ("daily_analytics", self.daily_analytics.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    /// Window length in seconds
    pub window: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptersConfig {
    /// Platforms the daemon registers adapters for
    #[serde(default)]
    pub enabled: Vec<PlatformKind>,

    /// Register logging mock adapters instead of real clients
    #[serde(default)]
    pub dry_run: bool,
}

fn default_batch_limit() -> usize {
    10
}

fn default_adapter_timeout() -> u64 {
    30
}

fn default_retry_delay() -> u64 {
    300
}

fn default_publish_posts() -> String {
    "5m".to_string()
}

fn default_interaction_tasks() -> String {
    "10m".to_string()
}

fn default_monitor_trends() -> String {
    "2h".to_string()
}

fn default_scrape_tasks() -> String {
    "6h".to_string()
}

fn default_generic_tasks() -> String {
    "2m".to_string()
}

fn default_daily_analytics() -> String {
    "1day".to_string()
}

fn default_rate_limits() -> BTreeMap<String, RateLimitConfig> {
    BTreeMap::from([
        (
            PlatformKind::Twitter.to_string(),
            RateLimitConfig {
                max_requests: 50,
                window: 15 * 60,
            },
        ),
        (
            PlatformKind::Reddit.to_string(),
            RateLimitConfig {
                max_requests: 60,
                window: 60,
            },
        ),
        (
            PlatformKind::Instagram.to_string(),
            RateLimitConfig {
                max_requests: 200,
                window: 3600,
            },
        ),
        (
            PlatformKind::Facebook.to_string(),
            RateLimitConfig {
                max_requests: 200,
                window: 3600,
            },
        ),
    ])
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: defaults are used. `CADENCE_DB_PATH`
    /// overrides the database path either way.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        if let Ok(db_path) = std::env::var("CADENCE_DB_PATH") {
            config.database.path = db_path;
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()).into());
        }

        if self.scheduling.batch_limit == 0 {
            return Err(invalid("scheduling.batch_limit", "must be at least 1"));
        }

        if self.scheduling.adapter_timeout == 0 {
            return Err(invalid("scheduling.adapter_timeout", "must be at least 1 second"));
        }

        for (name, value) in self.scheduling.triggers.entries() {
            parse_interval(&format!("scheduling.triggers.{}", name), value)?;
        }

        for (platform, limit) in &self.scheduling.rate_limits {
            if platform.parse::<PlatformKind>().is_err() {
                return Err(invalid(
                    &format!("scheduling.rate_limits.{}", platform),
                    "unknown platform",
                ));
            }
            if limit.window <= 0 {
                return Err(invalid(
                    &format!("scheduling.rate_limits.{}.window", platform),
                    "must be a positive number of seconds",
                ));
            }
        }

        Ok(())
    }

    /// Expanded database path
    pub fn database_path(&self) -> String {
        shellexpand::tilde(&self.database.path).to_string()
    }
}

/// Parse a humantime interval, rejecting zero durations
pub fn parse_interval(field: &str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value.trim())
        .map_err(|e| invalid(field, &format!("'{}' is not a duration: {}", value, e)))?;

    if duration.is_zero() {
        return Err(invalid(field, "interval must be greater than zero"));
    }

    Ok(duration)
}

fn invalid(field: &str, reason: &str) -> crate::error::CadenceError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Resolve the configuration file path (`CADENCE_CONFIG`, then the XDG config dir)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CADENCE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("cadence").join("config.toml"))
}
