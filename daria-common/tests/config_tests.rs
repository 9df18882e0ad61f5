//! Unit tests for configuration resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate DARIA_* variables are marked with #[serial]
//! so they run sequentially, not in parallel.

use daria_common::config::{
    load_toml_config, resolve_base_url, resolve_data_root, ServiceConfig, TomlConfig,
    DEFAULT_BASE_URL, ENV_BASE_URL, ENV_DATA_ROOT,
};
use serial_test::serial;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn toml_with_root(root: &str) -> TomlConfig {
    TomlConfig {
        data_root: Some(PathBuf::from(root)),
        base_url: Some("http://toml:1".to_string()),
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_cli_overrides_env_and_toml() {
    std::env::set_var(ENV_DATA_ROOT, "/env/root");

    let root = resolve_data_root(Some(Path::new("/cli/root")), &toml_with_root("/toml/root"));
    assert_eq!(root, PathBuf::from("/cli/root"));

    std::env::remove_var(ENV_DATA_ROOT);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    std::env::set_var(ENV_DATA_ROOT, "/env/root");
    std::env::set_var(ENV_BASE_URL, "http://env:2/");

    let toml_config = toml_with_root("/toml/root");
    assert_eq!(
        resolve_data_root(None, &toml_config),
        PathBuf::from("/env/root")
    );
    assert_eq!(
        resolve_base_url(None, &toml_config).unwrap(),
        "http://env:2"
    );

    std::env::remove_var(ENV_DATA_ROOT);
    std::env::remove_var(ENV_BASE_URL);
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    std::env::set_var(ENV_DATA_ROOT, "  ");

    let root = resolve_data_root(None, &toml_with_root("/toml/root"));
    assert_eq!(root, PathBuf::from("/toml/root"));

    std::env::remove_var(ENV_DATA_ROOT);
}

#[test]
#[serial]
fn test_compiled_defaults() {
    std::env::remove_var(ENV_DATA_ROOT);
    std::env::remove_var(ENV_BASE_URL);

    let toml_config = TomlConfig::default();
    assert_eq!(resolve_data_root(None, &toml_config), PathBuf::from("data"));

    let service = ServiceConfig::resolve(None, None, &toml_config).unwrap();
    assert_eq!(service.base_url, DEFAULT_BASE_URL);
    assert_eq!(service.analysis_endpoints.len(), 2);
    assert_eq!(service.timeout.as_secs(), 30);
}

#[test]
fn test_load_explicit_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("daria.toml");
    std::fs::write(
        &path,
        "data_root = \"/srv/daria\"\nrequest_timeout_secs = 7\n\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.data_root, Some(PathBuf::from("/srv/daria")));
    assert_eq!(config.request_timeout_secs, Some(7));
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_toml_config(Some(&temp_dir.path().join("absent.toml")));
    assert!(matches!(result, Err(daria_common::Error::Config(_))));
}

#[test]
fn test_unparsable_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "base_url = [").unwrap();

    assert!(matches!(
        load_toml_config(Some(&path)),
        Err(daria_common::Error::Config(_))
    ));
}
