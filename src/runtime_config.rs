//! # Runtime Configuration Module
//!
//! [`RouterConfig`] holds the switches that change how requests are matched and
//! dispatched. It can be loaded from environment variables or from a YAML file.
//!
//! ## Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MUXTREE_REDIRECT_TRAILING_SLASH` | `true` |
//! | `MUXTREE_HANDLE_METHOD_NOT_ALLOWED` | `false` |
//! | `MUXTREE_UNESCAPE_PATH_VALUES` | `true` |
//! | `MUXTREE_PRECOMPILE` | `true` |
//!
//! Booleans accept `true/false`, `1/0`, `yes/no` and `on/off`. Anything else keeps
//! the default and logs a warning.
//!
//! ## YAML
//!
//! ```yaml
//! redirect_trailing_slash: false
//! handle_method_not_allowed: true
//! ```
//!
//! Omitted keys keep their defaults.
//!
//! ```rust
//! use muxtree::RouterConfig;
//!
//! let config = RouterConfig::from_yaml_str("handle_method_not_allowed: true").unwrap();
//! assert!(config.handle_method_not_allowed);
//! assert!(config.redirect_trailing_slash);
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Answer a trailing-slash miss with a redirect to the toggled path
    pub redirect_trailing_slash: bool,
    /// Report 405 with an allow list instead of 404 when another method matches
    pub handle_method_not_allowed: bool,
    /// Percent-decode values captured by the regex fallback
    pub unescape_path_values: bool,
    /// Build the fallback tables of the initial router before the first request
    /// instead of on the first unmatched lookup
    pub precompile: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            handle_method_not_allowed: false,
            unescape_path_values: true,
            precompile: true,
        }
    }
}

impl RouterConfig {
    /// Load configuration from `MUXTREE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| match lookup(key) {
            None => default,
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(variable = key, value = %raw, default, "Ignoring invalid boolean");
                default
            }),
        };
        Self {
            redirect_trailing_slash: flag(
                "MUXTREE_REDIRECT_TRAILING_SLASH",
                defaults.redirect_trailing_slash,
            ),
            handle_method_not_allowed: flag(
                "MUXTREE_HANDLE_METHOD_NOT_ALLOWED",
                defaults.handle_method_not_allowed,
            ),
            unescape_path_values: flag(
                "MUXTREE_UNESCAPE_PATH_VALUES",
                defaults.unescape_path_values,
            ),
            precompile: flag("MUXTREE_PRECOMPILE", defaults.precompile),
        }
    }

    /// # Errors
    ///
    /// Fails on invalid YAML or unknown keys.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse router config")
    }

    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
