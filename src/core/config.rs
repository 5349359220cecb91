//! Configuration management for Testgauge.
//!
//! Handles loading configuration from TOML or YAML files and applying
//! environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::plugin::CustomPluginSpec;

/// Local config file name.
pub const LOCAL_CONFIG_FILE: &str = ".testgauge.toml";

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin execution settings
    pub analysis: AnalysisOptions,

    /// Risk ranking settings
    pub risk: RiskConfig,

    /// Report cache settings
    pub cache: CacheConfig,

    /// Batch formatting settings
    pub batch: BatchConfig,

    /// AI report settings
    pub report: ReportConfig,

    /// Declarative plugins registered at engine construction
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<CustomPluginSpec>,
}

/// Plugin execution options. Also the argument of `configure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Per-plugin timeout in milliseconds
    pub timeout_ms: u64,

    /// Plugin ids or names to skip
    pub skip_plugins: Vec<String>,

    /// Run plugins concurrently instead of one at a time
    pub concurrent: bool,
}

impl AnalysisOptions {
    /// Per-plugin timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set concurrent mode.
    #[must_use]
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Skip a plugin by id or name.
    #[must_use]
    pub fn skip(mut self, plugin: impl Into<String>) -> Self {
        self.skip_plugins.push(plugin.into());
        self
    }
}

/// Risk ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Maximum number of ranked risks to keep
    pub max_risks: usize,
}

/// Report cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the report cache is used at all
    pub enabled: bool,

    /// Entry lifetime in seconds, measured from insertion
    pub ttl_secs: u64,

    /// Maximum number of entries
    pub capacity: usize,
}

impl CacheConfig {
    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Batch formatting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Risks per chunk
    pub batch_size: usize,

    /// Chunks processed at once (defaults to the CPU count)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_out: Option<usize>,
}

impl BatchConfig {
    /// Effective fan-out.
    pub fn fan_out(&self) -> usize {
        self.fan_out.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// AI report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where the full rendered report is published
    pub full_report_url: String,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.testgauge.toml` in current directory
    /// 2. `~/.config/testgauge/config.toml`
    /// 3. Falls back to defaults
    ///
    /// Environment overrides are applied on top.
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        let mut config = if local_config.exists() {
            Self::load_from_file(&local_config)?
        } else if let Some(global_config) =
            Self::config_dir().map(|d| d.join("config.toml")).filter(|p| p.exists())
        {
            Self::load_from_file(&global_config)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// `.yaml`/`.yml` files are parsed as YAML, everything else as TOML.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        let config: Self = if is_yaml { serde_yaml::from_str(&content)? } else { toml::from_str(&content)? };
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `TESTGAUGE_*` environment overrides.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(timeout_ms) = env_parse::<u64>("TESTGAUGE_TIMEOUT_MS") {
            self.analysis.timeout_ms = timeout_ms;
        }
        if let Some(concurrent) = env_flag("TESTGAUGE_CONCURRENT") {
            self.analysis.concurrent = concurrent;
        }
        if let Some(max_risks) = env_parse::<usize>("TESTGAUGE_MAX_RISKS") {
            self.risk.max_risks = max_risks;
        }
        if let Some(enabled) = env_flag("TESTGAUGE_CACHE") {
            self.cache.enabled = enabled;
        }
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::APP_NAME))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparseable environment override");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %value, "Ignoring unparseable environment override");
            None
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            timeout_ms: super::scheduler::DEFAULT_TIMEOUT.as_millis() as u64,
            skip_plugins: Vec::new(),
            concurrent: false,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self { max_risks: crate::risk::DEFAULT_MAX_RISKS }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: crate::risk::DEFAULT_CACHE_TTL.as_secs(),
            capacity: crate::risk::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { batch_size: crate::risk::DEFAULT_BATCH_SIZE, fan_out: None }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { full_report_url: crate::risk::DEFAULT_REPORT_URL.to_string() }
    }
}
