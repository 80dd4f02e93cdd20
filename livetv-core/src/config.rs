use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::service::verifier::ProxyKind;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub sources: SourcesConfig,
    pub custom: CustomSourceConfig,
    pub filter: FilterConfig,
    pub refresh: RefreshConfig,
    pub verification: VerificationConfig,
    pub catalog: CatalogConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Remote channel and stream directories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub channels_url: String,
    pub streams_url: String,
    pub fetch_timeout_seconds: u64,
    /// How long a fetched stream directory is reused before re-fetching
    pub stream_directory_ttl_seconds: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            channels_url: "https://iptv-org.github.io/api/channels.json".to_string(),
            streams_url: "https://iptv-org.github.io/api/streams.json".to_string(),
            fetch_timeout_seconds: 10,
            stream_directory_ttl_seconds: 6 * 60 * 60,
        }
    }
}

impl SourcesConfig {
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    #[must_use]
    pub const fn stream_directory_ttl(&self) -> Duration {
        Duration::from_secs(self.stream_directory_ttl_seconds)
    }
}

/// Custom channel overlay (local file and optional remote feed)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSourceConfig {
    pub enabled: bool,
    pub file_path: Option<String>,
    pub remote_url: Option<String>,
    /// File watch resolution
    pub poll_interval_seconds: u64,
    /// Window in which several change events collapse into one refresh
    pub debounce_millis: u64,
}

impl Default for CustomSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_path: None,
            remote_url: None,
            poll_interval_seconds: 5,
            debounce_millis: 1000,
        }
    }
}

impl CustomSourceConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include_countries: Vec<String>,
    pub exclude_countries: Vec<String>,
    pub include_languages: Vec<String>,
    pub exclude_languages: Vec<String>,
    pub exclude_categories: Vec<String>,
    pub exclude_nsfw: bool,
    /// Apply category exclusion to custom channels too
    pub exclude_categories_for_custom: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_countries: Vec::new(),
            exclude_countries: Vec::new(),
            include_languages: Vec::new(),
            exclude_languages: Vec::new(),
            exclude_categories: Vec::new(),
            exclude_nsfw: true,
            exclude_categories_for_custom: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_seconds: u64,
    /// Fewer input channels than this keeps the previous snapshot
    pub min_source_channels: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60 * 60,
            min_source_channels: 1,
        }
    }
}

impl RefreshConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// When stream urls are probed for liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Never probe
    Off,
    /// Probe on meta / stream lookups
    #[default]
    Lazy,
    /// Probe every candidate stream during refresh, before merge
    Eager,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub mode: VerificationMode,
    pub timeout_seconds: u64,
    pub ttl_seconds: u64,
    pub concurrency: usize,
    pub user_agent: String,
    /// `socks5://`, `socks5h://`, `socks4://`, `http://` or `https://`
    pub proxy_url: Option<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            mode: VerificationMode::Lazy,
            timeout_seconds: 5,
            ttl_seconds: 30 * 60,
            concurrency: 16,
            user_agent: crate::resilience::DEFAULT_USER_AGENT.to_string(),
            proxy_url: None,
        }
    }
}

impl VerificationConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Which streams of a channel end up in its meta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSelection {
    #[default]
    All,
    /// Only the first stream by source order
    First,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub id_prefix: String,
    pub stream_selection: StreamSelection,
    pub addon_id: String,
    pub addon_name: String,
    pub addon_version: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            id_prefix: "iptv-".to_string(),
            stream_selection: StreamSelection::All,
            addon_id: "org.livetv.catalog".to_string(),
            addon_name: "Live TV".to_string(),
            addon_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

/// Keys read from the environment as comma-separated lists
const LIST_KEYS: &[&str] = &[
    "filter.include_countries",
    "filter.exclude_countries",
    "filter.include_languages",
    "filter.exclude_languages",
    "filter.exclude_categories",
];

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // LIVETV_FILTER__INCLUDE_COUNTRIES=GR,CY etc.
        let mut env = Environment::with_prefix("LIVETV")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }
        builder = builder.add_source(env);

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check for settings the engine cannot run with.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.sources.channels_url.trim().is_empty() {
            errors.push("sources.channels_url must not be empty".to_string());
        }
        if self.sources.streams_url.trim().is_empty() {
            errors.push("sources.streams_url must not be empty".to_string());
        }
        if self.sources.fetch_timeout_seconds == 0 {
            errors.push("sources.fetch_timeout_seconds must be greater than 0".to_string());
        }
        if self.refresh.interval_seconds == 0 {
            errors.push("refresh.interval_seconds must be greater than 0".to_string());
        }
        if self.custom.poll_interval_seconds == 0 {
            errors.push("custom.poll_interval_seconds must be greater than 0".to_string());
        }
        if self.verification.timeout_seconds == 0 {
            errors.push("verification.timeout_seconds must be greater than 0".to_string());
        }
        if self.verification.concurrency == 0 {
            errors.push("verification.concurrency must be greater than 0".to_string());
        }
        if let Some(proxy) = &self.verification.proxy_url {
            if let Err(e) = ProxyKind::from_url(proxy) {
                errors.push(format!("verification.proxy_url: {e}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
