//! Configuration for the Tidings CLI.
//!
//! Provides the [`TidingsConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `TIDINGS_CONFIG` environment variable
//! 3. XDG default: `~/.config/tidings/config.toml`
//! 4. Built-in defaults
//!
//! `TIDINGS_<SECTION>_<KEY>` variables overlay the file, and `QDRANT_URL` /
//! `QDRANT_API_KEY` override the store section last.

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tidings_core::{Error, Result};
use tidings_vector::VectorConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TIDINGS_CONFIG";

/// Environment variable overriding the Qdrant endpoint.
pub const QDRANT_URL_ENV: &str = "QDRANT_URL";

/// Environment variable supplying the Qdrant API key.
pub const QDRANT_API_KEY_ENV: &str = "QDRANT_API_KEY";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the Tidings CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TidingsConfig {
    /// Qdrant connection settings.
    pub qdrant: QdrantConfig,

    /// Collection, model and search settings.
    pub vector: VectorConfig,
}

/// Qdrant connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Base URL of the Qdrant REST API.
    pub url: String,

    /// API key sent as the `api-key` header.
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds (0 disables).
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: tidings_vector::DEFAULT_QDRANT_URL.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl QdrantConfig {
    /// The HTTP timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl TidingsConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok();

        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path_with(config_path, lookup) {
            if path.exists() {
                builder
                    .add_file(&path.to_string_lossy())
                    .map_err(|e| Error::config(format!("config file: {e}")))?;
            }
        }

        let mut env_opts = env::Options::with_top_level("TIDINGS");
        env_opts.add_section("qdrant");
        env_opts.add_section("vector");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let mut config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Apply `QDRANT_URL` and `QDRANT_API_KEY` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(QDRANT_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.qdrant.url = url;
        }
        if let Some(key) = lookup(QDRANT_API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.qdrant.api_key = Some(key);
        }
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        Self::resolve_config_path_with(explicit, |key| std::env::var(key).ok())
    }

    /// Like [`resolve_config_path`](Self::resolve_config_path) with a custom env lookup.
    pub fn resolve_config_path_with<F>(explicit: Option<&str>, lookup: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. Explicit --config flag
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        // 2. TIDINGS_CONFIG env var
        if let Some(path) = lookup(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        // 3. XDG default
        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tidings").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten this config into environment variable pairs with `TIDINGS_` prefix.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value: toml::Value =
            toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_toml_value(&value, "TIDINGS", &mut vars);
        Ok(vars)
    }
}

// ============================================================================
// Helper: flatten TOML to env vars
// ============================================================================

/// Recursively flatten a TOML value into `KEY=value` pairs.
fn flatten_toml_value(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let env_key = format!("{}_{}", prefix, key.to_uppercase());
                flatten_toml_value(val, &env_key, out);
            }
        }
        toml::Value::Array(arr) => {
            if let Ok(json) = serde_json::to_string(arr) {
                out.push((prefix.to_string(), json));
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Integer(i) => out.push((prefix.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((prefix.to_string(), f.to_string())),
        toml::Value::Boolean(b) => out.push((prefix.to_string(), b.to_string())),
        toml::Value::Datetime(dt) => out.push((prefix.to_string(), dt.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
