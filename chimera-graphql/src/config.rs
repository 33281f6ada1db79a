//! 配置
//!
//! 从 `application.toml` 读取：
//!
//! ```toml
//! [graphql]
//! parse_to_instance = true
//! safe = false
//! do_not_throw = false
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```
//!
//! `[graphql]` 中的开关作为操作选项的默认值，操作自身显式设置的值优先

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::constants::{DEFAULT_CONFIG_FILE, ENV_DO_NOT_THROW, ENV_PARSE_TO_INSTANCE, ENV_SAFE};
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::model::ModelOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),
}

/// `[graphql]` 段
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchemaDefaults {
    pub parse_to_instance: bool,
    pub safe: bool,
    pub do_not_throw: bool,
}

impl Default for SchemaDefaults {
    fn default() -> Self {
        Self {
            parse_to_instance: true,
            safe: false,
            do_not_throw: false,
        }
    }
}

/// `[logging]` 段
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: LogLevel,
    pub format: LogFormat,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphqlConfig {
    pub graphql: SchemaDefaults,
    pub logging: LoggingSection,
}

impl GraphqlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded graphql config");
        Ok(config)
    }

    /// 依次在 `dirs` 中查找 `application.toml`，找不到时使用默认配置，最后叠加环境变量
    pub fn load<P: AsRef<Path>>(dirs: &[P]) -> Result<Self, ConfigError> {
        for dir in dirs {
            let path = dir.as_ref().join(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                return Ok(Self::from_file(path)?.with_env_overrides());
            }
        }
        tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
        Ok(Self::from_env())
    }

    /// 默认配置叠加环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用 `CHIMERA_GRAPHQL_*` 环境变量覆盖开关
    pub fn with_env_overrides(mut self) -> Self {
        let read = |key: &str| std::env::var(key).ok().and_then(|value| parse_bool(&value));

        if let Some(value) = read(ENV_PARSE_TO_INSTANCE) {
            self.graphql.parse_to_instance = value;
        }
        if let Some(value) = read(ENV_SAFE) {
            self.graphql.safe = value;
        }
        if let Some(value) = read(ENV_DO_NOT_THROW) {
            self.graphql.do_not_throw = value;
        }
        self
    }

    /// 未显式设置的开关填入配置的默认值
    pub fn apply_to(&self, options: &mut ModelOptions) {
        let defaults = &self.graphql;
        *options = std::mem::take(options).with_defaults(
            defaults.safe,
            defaults.do_not_throw,
            defaults.parse_to_instance,
        );
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::new()
            .level(self.logging.level)
            .format(self.logging.format);
        match &self.logging.filter {
            Some(filter) => config.filter(filter.clone()),
            None => config,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
