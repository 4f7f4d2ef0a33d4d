//! Configuration System
//!
//! Layered application configuration: built-in defaults, the global config
//! file, the workspace `config.toml` and `config/{env}.toml`, then
//! `BRANCHTREE__*` environment variables. Validation reports every problem at
//! once.

use crate::error::ApiError;
use crate::filter::FilterConfig;
use crate::logging::LoggingConfig;
use crate::watch::WatchConfig;
use config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Repository whose working directory is shown
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Integration settings carried over from the host application
    #[serde(default)]
    pub integration: IntegrationConfig,

    /// Tree visibility rules
    #[serde(default)]
    pub filter: FilterConfig,

    /// Change watching
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Root of the working directory; its `.git/HEAD` drives branch changes
    #[serde(default = "default_repository_path")]
    pub path: PathBuf,
}

fn default_repository_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repository_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Files at or above this size are hidden; 0 disables the limit
    #[serde(default)]
    pub max_file_size: u64,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Repository(String),
    Watch(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Repository(msg) => write!(f, "Repository: {}", msg),
            ValidationError::Watch(msg) => write!(f, "Watch: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.repository.path.as_os_str().is_empty() {
            errors.push(ValidationError::Repository(
                "Repository path cannot be empty".to_string(),
            ));
        }

        if self.watch.batch_window_ms == 0 {
            errors.push(ValidationError::Watch(
                "batch_window_ms must be greater than 0".to_string(),
            ));
        }
        if self.watch.max_batch_size == 0 {
            errors.push(ValidationError::Watch(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.watch.event_buffer == 0 {
            errors.push(ValidationError::Watch(
                "event_buffer must be greater than 0".to_string(),
            ));
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            errors.push(ValidationError::Logging(format!(
                "Invalid log format: {} (must be 'json' or 'text')",
                self.logging.format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Filter rules with the integration size limit applied when the filter
    /// section does not set its own.
    pub fn effective_filter(&self) -> FilterConfig {
        let mut filter = self.filter.clone();
        if filter.max_file_size == 0 {
            filter.max_file_size = self.integration.max_file_size;
        }
        filter
    }

    /// Repository path resolved against `base` when relative.
    pub fn repository_root(&self, base: &Path) -> PathBuf {
        if self.repository.path.is_absolute() {
            self.repository.path.clone()
        } else {
            base.join(&self.repository.path)
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ApiError> {
        toml::to_string_pretty(self)
            .map_err(|e| ApiError::ConfigError(format!("Failed to serialize config: {}", e)))
    }
}

/// Loads [`ApplicationConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace_root` from every source.
    pub fn load(workspace_root: &Path) -> Result<ApplicationConfig, ApiError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::add_environment(builder);
        Self::finish(builder.build()?)
    }

    /// Load configuration from one explicit file (plus defaults and environment).
    pub fn load_from_file(path: &Path) -> Result<ApplicationConfig, ApiError> {
        if !path.is_file() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()).required(true));
        let builder = sources::add_environment(builder);
        Self::finish(builder.build()?)
    }

    /// Built-in defaults only.
    pub fn default() -> ApplicationConfig {
        ApplicationConfig::default()
    }

    fn finish(config: Config) -> Result<ApplicationConfig, ApiError> {
        let config: ApplicationConfig = config.try_deserialize()?;
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(config)
    }
}
