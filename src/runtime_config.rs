//! # Runtime Configuration
//!
//! Two layers feed a running service:
//!
//! - [`RuntimeConfig`], read from environment variables at startup
//! - [`ServiceConfig`], an optional YAML file with `runtime`, `docs` and
//!   `logging` sections
//!
//! Values present in the file override the environment.
//!
//! ## Environment Variables
//!
//! ### `RESTPIPE_STACK_SIZE`
//!
//! Stack size of the coroutine each request runs on. Accepts decimal
//! (`65536`) or hexadecimal (`0x10000`). Default: `0x10000` (64 KB).
//!
//! Memory usage is roughly `stack_size × concurrent requests`. Too small a
//! stack overflows in deep validators or large operation frames.
//!
//! ## Example file
//!
//! ```yaml
//! runtime:
//!   stack_size: 0x8000
//! docs:
//!   title: Pet Store
//!   version: 1.0.0
//! logging:
//!   level: debug
//!   format: pretty
//! ```
//!
//! ```rust
//! use restpipe::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use crate::openapi::DocInfo;
use crate::telemetry::{LogConfig, LogFormat};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Default coroutine stack size (64 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for request coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let stack_size = env::var("RESTPIPE_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

/// Decimal or `0x`-prefixed hexadecimal byte count.
fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(usize),
        Text(String),
    }
    match Option::<Size>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Size::Number(n)) => Ok(Some(n)),
        Some(Size::Text(s)) => parse_size(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack size '{s}'"))),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    #[serde(deserialize_with = "deserialize_size")]
    pub stack_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// Service configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub runtime: RuntimeSection,
    pub docs: DocInfo,
    pub logging: LoggingSection,
}

impl ServiceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse service configuration")
    }

    /// Environment runtime settings with this file's overrides applied.
    #[must_use]
    pub fn runtime_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::from_env();
        if let Some(stack_size) = self.runtime.stack_size {
            config.stack_size = stack_size;
        }
        config
    }

    /// Environment logging settings with this file's overrides applied.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if let Some(level) = &self.logging.level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.logging.format {
            config.format = LogFormat::parse(format);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0x4000"), Some(0x4000));
        assert_eq!(parse_size("32768"), Some(32768));
        assert_eq!(parse_size("lots"), None);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "runtime:\n  stack_size: \"0x8000\"\ndocs:\n  title: Pets\n  version: 2.0.0\nlogging:\n  level: debug\n  format: pretty"
        )
        .unwrap();
        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.runtime.stack_size, Some(0x8000));
        assert_eq!(config.runtime_config().stack_size, 0x8000);
        assert_eq!(config.docs.title, "Pets");
        let log = config.log_config();
        assert_eq!(log.log_level, "debug");
        assert_eq!(log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_sections_default() {
        let config = ServiceConfig::from_yaml("docs:\n  title: Only docs\n").unwrap();
        assert_eq!(config.runtime.stack_size, None);
        assert!(config.logging.level.is_none());
        assert!(ServiceConfig::from_yaml("").is_ok());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServiceConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
