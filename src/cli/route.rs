//! CLI route: run context and command dispatch.

use crate::api::App;
use crate::cli::output::{format_event_line, format_tree};
use crate::cli::parse::Commands;
use crate::config::{ApplicationConfig, ConfigLoader};
use crate::error::ApiError;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Runtime context for CLI execution: loaded configuration and the app facade.
pub struct RunContext {
    app: App,
}

impl RunContext {
    /// Load configuration for `workspace_root` (or from `config_path`) and
    /// resolve a relative `repository.path` against the workspace.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::from_config(config, &workspace_root))
    }

    pub fn from_config(mut config: ApplicationConfig, workspace_root: &Path) -> Self {
        config.repository.path = config.repository_root(workspace_root);
        Self {
            app: App::new(config),
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Run one command. Returns text for stdout, if any.
    pub async fn execute(&self, command: &Commands) -> Result<Option<String>, ApiError> {
        match command {
            Commands::Read { path, compact } => {
                let root = self.target(path.as_deref());
                let tree = self.app.read_folder(&root).await?;
                format_tree(&tree, *compact).map(Some)
            }
            Commands::Config => self.app.get_app_config().to_toml_string().map(Some),
            Commands::Watch { path, debounce_ms } => {
                let mut config = self.app.get_app_config();
                if let Some(ms) = debounce_ms {
                    config.watch.debounce_ms = *ms;
                }
                let context = Self {
                    app: App::new(config),
                };
                let root = context.target(path.as_deref());
                let mut stdout = std::io::stdout();
                context
                    .watch(&root, &mut stdout, async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            warn!("Failed to listen for Ctrl-C: {}", e);
                            std::future::pending::<()>().await;
                        }
                    })
                    .await?;
                Ok(None)
            }
        }
    }

    /// Push the tree for `root` and every following event to `out` as JSON
    /// lines, until `shutdown` resolves.
    pub async fn watch<W, F>(&self, root: &Path, out: &mut W, shutdown: F) -> Result<(), ApiError>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let mut events = self.app.subscribe();
        let handle = self.app.start_watching()?;
        // Tracks the root and pushes its first tree
        self.app.service().push_fresh(root).await?;
        info!(root = %root.display(), "Watching; press Ctrl-C to stop");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        writeln!(out, "{}", format_event_line(&event)?)?;
                        out.flush()?;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Event consumer lagged; some events were dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        handle.stop().await
    }

    fn target(&self, path: Option<&Path>) -> PathBuf {
        path.map(Path::to_path_buf)
            .unwrap_or_else(|| self.app.get_app_config().repository.path)
    }
}
