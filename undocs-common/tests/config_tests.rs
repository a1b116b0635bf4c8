//! Unit tests for bootstrap configuration and data folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate UNDOCS_DATA_DIR are marked with #[serial].

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use undocs_common::config::{
    load_toml_config, resolve_data_dir, TomlConfig, CONFIG_FILE_NAME, DATA_DIR_ENV,
    DEFAULT_DOCUMENTS_URL,
};
use undocs_common::Error;

#[test]
fn test_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let config = load_toml_config(temp_dir.path()).unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.discovery.max_consecutive_misses, 3);
    assert_eq!(config.discovery.language, "en");
    assert!(!config.discovery.commit_each_pattern);
    assert_eq!(config.discovery.documents_url, DEFAULT_DOCUMENTS_URL);
    assert!(config.lineage.use_metadata);
    assert!(config.lineage.title_similarity_threshold.is_none());
}

#[test]
fn test_partial_config_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        r#"
data_dir = "/srv/undocs"

[discovery]
max_consecutive_misses = 5

[lineage]
use_metadata = false
title_similarity_threshold = 0.9
"#,
    )
    .unwrap();

    let config = load_toml_config(temp_dir.path()).unwrap();

    assert_eq!(config.data_dir, Some(PathBuf::from("/srv/undocs")));
    assert_eq!(config.discovery.max_consecutive_misses, 5);
    assert_eq!(config.discovery.language, "en");
    assert!(!config.lineage.use_metadata);
    assert_eq!(config.lineage.rate_limit_ms, 1000);
    assert_eq!(config.lineage.title_similarity_threshold, Some(0.9));
}

#[test]
fn test_malformed_config_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[discovery\nbroken").unwrap();

    let err = load_toml_config(temp_dir.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_zero_miss_threshold_rejected() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        "[discovery]\nmax_consecutive_misses = 0\n",
    )
    .unwrap();

    assert!(matches!(
        load_toml_config(temp_dir.path()),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_out_of_range_similarity_threshold_rejected() {
    let mut config = TomlConfig::default();
    config.lineage.title_similarity_threshold = Some(1.5);
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_data_dir_cli_argument_wins() {
    env::set_var(DATA_DIR_ENV, "/tmp/undocs-env");
    let config = TomlConfig {
        data_dir: Some(PathBuf::from("/tmp/undocs-toml")),
        ..Default::default()
    };

    let resolved = resolve_data_dir(Some(Path::new("/tmp/undocs-cli")), &config);
    assert_eq!(resolved, PathBuf::from("/tmp/undocs-cli"));

    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn test_data_dir_env_over_toml() {
    env::set_var(DATA_DIR_ENV, "/tmp/undocs-env");
    let config = TomlConfig {
        data_dir: Some(PathBuf::from("/tmp/undocs-toml")),
        ..Default::default()
    };

    assert_eq!(resolve_data_dir(None, &config), PathBuf::from("/tmp/undocs-env"));

    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn test_data_dir_falls_back_to_toml_then_default() {
    env::remove_var(DATA_DIR_ENV);

    let config = TomlConfig {
        data_dir: Some(PathBuf::from("/tmp/undocs-toml")),
        ..Default::default()
    };
    assert_eq!(resolve_data_dir(None, &config), PathBuf::from("/tmp/undocs-toml"));

    assert_eq!(
        resolve_data_dir(None, &TomlConfig::default()),
        PathBuf::from("./data")
    );
}
