//! Configuration sources, in increasing precedence.

pub mod global_file;
pub mod workspace_file;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

/// Environment overrides: `BRANCHTREE__REPOSITORY__PATH=/repo` sets `repository.path`.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("BRANCHTREE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
