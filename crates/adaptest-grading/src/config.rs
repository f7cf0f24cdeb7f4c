//! adaptest configuration and grading client factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use adaptest_core::traits::GradingClient;
use adaptest_core::EngineConfig;

use crate::http::HttpGradingClient;

/// Grading service endpoint.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Base URL of the grading service. Submission is disabled when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for GradingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradingConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Top-level adaptest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptestConfig {
    #[serde(default)]
    pub grading: GradingConfig,
    /// Starting difficulty for new sessions (1-5).
    #[serde(default = "default_difficulty")]
    pub default_difficulty: f64,
    /// Countdown tick period in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Output directory for session reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_difficulty() -> f64 {
    3.0
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./adaptest-results")
}

impl Default for AdaptestConfig {
    fn default() -> Self {
        Self {
            grading: GradingConfig::default(),
            default_difficulty: default_difficulty(),
            tick_interval_ms: default_tick_interval(),
            output_dir: default_output_dir(),
        }
    }
}

impl AdaptestConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tick_interval: std::time::Duration::from_millis(self.tick_interval_ms.max(1)),
            default_difficulty: self.default_difficulty,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Apply `ADAPTEST_API_KEY` / `ADAPTEST_GRADING_URL` style overrides.
fn apply_overrides(config: &mut AdaptestConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup("ADAPTEST_API_KEY") {
        config.grading.api_key = key;
    }
    if let Some(url) = lookup("ADAPTEST_GRADING_URL") {
        config.grading.base_url = Some(url);
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `adaptest.toml` in the current directory
/// 2. `~/.config/adaptest/config.toml`
///
/// Environment variable overrides: `ADAPTEST_API_KEY`, `ADAPTEST_GRADING_URL`.
pub fn load_config() -> Result<AdaptestConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AdaptestConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("adaptest.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<AdaptestConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AdaptestConfig::default(),
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok());

    config.grading.api_key = resolve_env_vars(&config.grading.api_key);
    config.grading.base_url = config.grading.base_url.as_deref().map(resolve_env_vars);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("adaptest"))
}

/// Create a grading client from its configuration.
pub fn create_client(config: &GradingConfig) -> Result<Box<dyn GradingClient>> {
    let Some(base_url) = config.base_url.as_deref().filter(|u| !u.is_empty()) else {
        anyhow::bail!(
            "no grading endpoint configured; set [grading].base_url or ADAPTEST_GRADING_URL"
        );
    };
    Ok(Box::new(HttpGradingClient::new(
        base_url,
        &config.api_key,
        config.timeout_secs,
    )?))
}
