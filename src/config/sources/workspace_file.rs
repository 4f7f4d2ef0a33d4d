//! Workspace config file source: config.toml, then config/{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

/// Add workspace config files to builder.
/// Precedence: config.toml (base) then config/{BRANCHTREE_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let env_name = std::env::var("BRANCHTREE_ENV").unwrap_or_else(|_| "development".to_string());

    let mut builder = builder;

    let base_config_path = workspace_root.join("config.toml");
    if base_config_path.is_file() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    let env_config_path = workspace_root
        .join("config")
        .join(format!("{}.toml", env_name));
    if env_config_path.is_file() {
        builder = builder.add_source(File::from(env_config_path).required(false));
    }

    Ok(builder)
}
