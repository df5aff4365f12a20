use crate::error::{Result, SubgenError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认缓存时间：一天
pub const DEFAULT_CACHE_SECS: u64 = 86400;

fn default_cache_secs() -> u64 {
    DEFAULT_CACHE_SECS
}

/// Configuration for one generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base document path (overridden by the command line)
    #[serde(default)]
    pub base: Option<PathBuf>,
    /// Resource cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Node subscriptions
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionConfig>,
    /// Proxy groups, in output order
    #[serde(default)]
    pub proxy_groups: Vec<ProxyGroupConfig>,
    /// Rule sets, in output order
    #[serde(default)]
    pub rulesets: Vec<RuleSetConfig>,
}

/// Resource cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory
    pub dir: PathBuf,
    /// Network timeout for a single fetch
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub tag: String,
    pub url: String,
    #[serde(default = "default_cache_secs")]
    pub cache: u64,
    /// `url` (default) or `local`
    #[serde(default, alias = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// `tag` or `name`
    #[serde(rename = "type")]
    pub filter_type: String,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub negative_regex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyGroupConfig {
    /// `select` or `url-test`
    #[serde(rename = "type")]
    pub group_type: String,
    pub name: String,
    #[serde(default)]
    pub test_url: Option<String>,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub tolerance: Option<u64>,
    #[serde(default)]
    pub filters: Option<Vec<FilterConfig>>,
    #[serde(default)]
    pub includes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// `classic`, `domain`, `ipcidr`, `match`, or a literal rule kind
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub params: Option<Vec<String>>,
    pub target: String,
    #[serde(default = "default_cache_secs")]
    pub cache: u64,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(SubgenError::Config(format!("Invalid log level: {}", other))),
        }
    }
}

impl GenerationConfig {
    /// Load configuration, choosing the format by file extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let config: GenerationConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            Some("ron") => ron::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply command line log level overrides, `debug` wins over `level`
    pub fn override_log_level(&mut self, level: Option<&str>, debug: bool) -> Result<()> {
        if let Some(level) = level {
            self.logging.level = level.to_lowercase();
        }
        if debug {
            self.logging.level = "debug".to_string();
        }
        self.logging.validate()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;

        if self.cache.timeout_secs == 0 {
            return Err(SubgenError::Config("cache.timeout_secs must be > 0".to_string()));
        }

        for subscription in &self.subscriptions {
            if subscription.url.is_empty() {
                return Err(SubgenError::Config(format!(
                    "Subscription {} has no url",
                    subscription.tag
                )));
            }
        }

        for group in &self.proxy_groups {
            if group.name.is_empty() {
                return Err(SubgenError::Config("Proxy group has no name".to_string()));
            }
        }

        for ruleset in &self.rulesets {
            if ruleset.target.is_empty() {
                return Err(SubgenError::Config(format!(
                    "Rule set {} has no target",
                    ruleset.rule_type
                )));
            }
        }

        Ok(())
    }

    /// Get fetch timeout as Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.cache.timeout_secs)
    }
}
