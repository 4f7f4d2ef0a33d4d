//! Integration tests for layered configuration loading

use super::test_utils::with_env;
use branchtree::config::{global_config_path, ApplicationConfig, ConfigLoader};
use branchtree::App;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

// Mutex for tests that manipulate the process environment
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const CLEAN: [(&str, Option<&str>); 4] = [
    ("BRANCHTREE_ENV", None),
    ("BRANCHTREE__REPOSITORY__PATH", None),
    ("BRANCHTREE__WATCH__DEBOUNCE_MS", None),
    ("BRANCHTREE__INTEGRATION__MAX_FILE_SIZE", None),
];

fn isolated<F: FnOnce(&TempDir)>(extra: &[(&str, Option<&str>)], f: F) {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let xdg = TempDir::new().unwrap();
    let xdg_path = xdg.path().to_string_lossy().into_owned();

    let mut vars: Vec<(&str, Option<&str>)> = CLEAN.to_vec();
    vars.push(("XDG_CONFIG_HOME", Some(xdg_path.as_str())));
    vars.extend_from_slice(extra);
    with_env(&vars, || f(&xdg));
}

#[test]
fn test_defaults_without_files() {
    isolated(&[], |_| {
        let workspace = TempDir::new().unwrap();
        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert_eq!(config, ApplicationConfig::default());
    });
}

#[test]
fn test_workspace_overrides_global() {
    isolated(&[], |xdg| {
        let global_dir = xdg.path().join("branchtree");
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(
            global_dir.join("config.toml"),
            "[repository]\npath = \"/global/repo\"\n\n[watch]\ndebounce_ms = 900\n",
        )
        .unwrap();
        assert_eq!(
            global_config_path().unwrap(),
            global_dir.join("config.toml")
        );

        let workspace = TempDir::new().unwrap();
        fs::write(
            workspace.path().join("config.toml"),
            "[repository]\npath = \"/workspace/repo\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load(workspace.path()).unwrap();
        assert_eq!(config.repository.path, PathBuf::from("/workspace/repo"));
        // Keys the workspace file does not set come from the global file
        assert_eq!(config.watch.debounce_ms, 900);
    });
}

#[test]
fn test_environment_file_and_variables() {
    isolated(
        &[
            ("BRANCHTREE_ENV", Some("test")),
            ("BRANCHTREE__INTEGRATION__MAX_FILE_SIZE", Some("2048")),
        ],
        |_| {
            let workspace = TempDir::new().unwrap();
            fs::write(
                workspace.path().join("config.toml"),
                "[watch]\ndebounce_ms = 100\nmax_batch_size = 5\n",
            )
            .unwrap();
            fs::create_dir(workspace.path().join("config")).unwrap();
            fs::write(
                workspace.path().join("config").join("test.toml"),
                "[watch]\ndebounce_ms = 10\n",
            )
            .unwrap();

            let config = ConfigLoader::load(workspace.path()).unwrap();
            assert_eq!(config.watch.debounce_ms, 10);
            assert_eq!(config.watch.max_batch_size, 5);
            assert_eq!(config.integration.max_file_size, 2048);
            assert_eq!(config.effective_filter().max_file_size, 2048);
        },
    );
}

#[test]
fn test_invalid_config_rejected() {
    isolated(&[], |_| {
        let workspace = TempDir::new().unwrap();
        fs::write(
            workspace.path().join("config.toml"),
            "[watch]\nmax_batch_size = 0\n\n[logging]\nformat = \"xml\"\n",
        )
        .unwrap();

        let err = ConfigLoader::load(workspace.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("max_batch_size"));
        assert!(message.contains("xml"));
    });
}

/// The app hands back exactly what it was configured with
#[test]
fn test_app_config_pass_through() {
    isolated(&[], |_| {
        let workspace = TempDir::new().unwrap();
        fs::write(
            workspace.path().join("config.toml"),
            "[repository]\npath = \"/home/dev/git-repo-test\"\n\n[integration]\nmax_file_size = 52428800\n",
        )
        .unwrap();

        let config = ConfigLoader::load(workspace.path()).unwrap();
        let app = App::new(config.clone());
        let served = app.get_app_config();
        assert_eq!(served, config);
        assert_eq!(
            served.repository.path,
            PathBuf::from("/home/dev/git-repo-test")
        );
    });
}
