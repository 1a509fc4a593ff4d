use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Unset means the HTTP client's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.vndb.org/kana".to_string()
}
fn default_user_agent() -> String {
    format!("vn-roster/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct PacingConfig {
    #[serde(default = "default_batch_interval_secs")]
    pub batch_interval_secs: f64,
    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_backoff_base")]
    pub backoff_base: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_interval_secs: default_batch_interval_secs(),
            item_delay_secs: default_item_delay_secs(),
            batch_size: default_batch_size(),
            backoff_base: default_backoff_base(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_batch_interval_secs() -> f64 {
    300.0
}
fn default_item_delay_secs() -> f64 {
    5.0
}
fn default_batch_size() -> usize {
    25
}
fn default_backoff_base() -> f64 {
    1.5
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// A trait is "shared" once this many characters carry it.
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,
    /// Traits whose group name contains any of these are ignored entirely.
    #[serde(default = "default_denied_groups")]
    pub denied_group_substrings: Vec<String>,
    #[serde(default = "default_weight")]
    pub default_weight: f64,
    #[serde(default = "default_group_weights")]
    pub group_weights: BTreeMap<String, f64>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_overlap: default_min_overlap(),
            denied_group_substrings: default_denied_groups(),
            default_weight: default_weight(),
            group_weights: default_group_weights(),
        }
    }
}

fn default_min_overlap() -> usize {
    2
}
fn default_denied_groups() -> Vec<String> {
    vec!["(Sexual)".to_string()]
}
fn default_weight() -> f64 {
    0.8
}
fn default_group_weights() -> BTreeMap<String, f64> {
    [
        ("Personality", 1.4),
        ("Role", 1.2),
        ("Engages in", 1.0),
        ("Subject of", 1.0),
    ]
    .into_iter()
    .map(|(group, weight)| (group.to_string(), weight))
    .collect()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// Default output path when `--out` is not given.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Load the configuration file, falling back to built-in defaults when the
/// file does not exist.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate pacing
    if config.pacing.batch_size == 0 {
        anyhow::bail!("pacing.batch_size must be > 0");
    }
    if !(config.pacing.backoff_base.is_finite() && config.pacing.backoff_base > 1.0) {
        anyhow::bail!("pacing.backoff_base must be > 1.0");
    }
    for (key, secs) in [
        ("batch_interval_secs", config.pacing.batch_interval_secs),
        ("item_delay_secs", config.pacing.item_delay_secs),
    ] {
        if !secs.is_finite() || secs < 0.0 {
            anyhow::bail!("pacing.{} must be a finite number >= 0, got {}", key, secs);
        }
    }

    // Validate scoring
    if config.scoring.min_overlap == 0 {
        anyhow::bail!("scoring.min_overlap must be >= 1");
    }
    if let Some((group, _)) = config
        .scoring
        .group_weights
        .iter()
        .find(|(_, weight)| **weight < 0.0)
    {
        anyhow::bail!("scoring.group_weights.{} must be >= 0", group);
    }

    if config.api.base_url.trim().is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }

    Ok(())
}
