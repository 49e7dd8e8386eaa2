//! Configuration
//!
//! Provides centralized configuration management with:
//! - Config file loading (optional, TOML)
//! - Environment variable overrides
//! - Runtime defaults
//! - Validation
//!
//! Library entry points take their inputs as parameters; this module only
//! feeds the binary. The usage-log locations used by [`crate::writer`] are
//! fixed and deliberately not configurable here.

use crate::models::CostMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

const LOG_LEVELS: &[&str] = &["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "OFF"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];
const LOG_OUTPUTS: &[&str] = &["console", "file", "both"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Ingestion defaults
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Paths configuration
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Root scanned for logs; `~/.claude/projects` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_back: Option<u32>,
    #[serde(default)]
    pub cost_mode: CostMode,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for rolling log files when logging output is `file` or `both`.
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the first config file found, and the environment
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        let config_paths = [
            PathBuf::from("claude-usage-monitor.toml"),
            PathBuf::from(".claude-usage-monitor.toml"),
            dirs::config_dir()
                .map(|d| d.join("claude-usage-monitor").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Ingest overrides
        if let Ok(val) = env::var("CLAUDE_USAGE_DATA_PATH") {
            self.ingest.data_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("CLAUDE_USAGE_HOURS_BACK") {
            self.ingest.hours_back = Some(val.parse().context("Invalid CLAUDE_USAGE_HOURS_BACK")?);
        }
        if let Ok(val) = env::var("CLAUDE_USAGE_COST_MODE") {
            self.ingest.cost_mode = val
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid CLAUDE_USAGE_COST_MODE")?;
        }
        if let Ok(val) = env::var("CLAUDE_USAGE_PARALLEL") {
            self.ingest.parallel = val.parse().context("Invalid CLAUDE_USAGE_PARALLEL")?;
        }

        // Path overrides
        if let Ok(val) = env::var("CLAUDE_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_uppercase();
        if !LOG_LEVELS.contains(&level.as_str()) && !self.logging.level.contains('=') {
            return Err(anyhow::anyhow!(
                "Unknown log level '{}', expected one of {:?} or a filter directive",
                self.logging.level,
                LOG_LEVELS
            ));
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Unknown log format '{}', expected one of {:?}",
                self.logging.format,
                LOG_FORMATS
            ));
        }

        if !LOG_OUTPUTS.contains(&self.logging.output.as_str()) {
            return Err(anyhow::anyhow!(
                "Unknown log output '{}', expected one of {:?}",
                self.logging.output,
                LOG_OUTPUTS
            ));
        }

        if self.logging.output != "console" && !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory)
                .context("Failed to create log directory")?;
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance, falling back to defaults when loading fails
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: {:#}. Using default configuration.", e);
            Config::default()
        })
    })
}
