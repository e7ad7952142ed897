//! Integration tests for the TOML config loader

use std::fs;
use std::path::Path;
use storage_migrate::config::{load_from_path, load_from_str, ConfigError, ValidationIssue};
use storage_migrate::{ImportMigration, MigrationError, TextPatcher};
use tempfile::TempDir;

#[test]
fn test_empty_config_uses_defaults() {
    let config = load_from_str("").expect("empty config should parse");

    assert_eq!(config.migration, ImportMigration::default());
    assert_eq!(config.target_file(), Path::new("backend/src/services/index.js"));
    assert_eq!(config.target.extensions, vec!["js", "cjs", "mjs"]);
    assert!(config.logging.level.is_none());
}

#[test]
fn test_full_config() {
    let toml = r#"
[migration]
old_binding = "StorageUtils"
old_module = "../utils/storage"
new_binding = "S3StorageUtils"
new_module = "../utils/s3-storage"

[target]
file = "/srv/app/backend/src/services/index.js"
extensions = ["js"]

[logging]
level = "debug"
"#;

    let config = load_from_str(toml).expect("Failed to parse config");

    assert_eq!(
        config.target_file(),
        Path::new("/srv/app/backend/src/services/index.js")
    );
    assert_eq!(config.target.extensions, vec!["js"]);
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
}

#[test]
fn test_partial_migration_section_keeps_other_defaults() {
    let config = load_from_str("[migration]\nnew_module = \"../lib/s3\"\n").unwrap();

    assert_eq!(config.migration.old_binding, "StorageUtils");
    assert_eq!(config.migration.new_binding, "S3StorageUtils");
    assert_eq!(config.migration.new_module, "../lib/s3");

    let patcher = TextPatcher::new(config.migration).unwrap();
    let out = patcher.transform("const StorageUtils = require('../utils/storage');\n");
    assert_eq!(out.output, "const { S3StorageUtils } = require(\"../lib/s3\");\n");
}

#[test]
fn test_unknown_key_rejected() {
    let err = load_from_str("[target]\nfiles = [\"a.js\"]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml { path: None, .. }));
}

#[test]
fn test_misspelled_migration_key_rejected() {
    // a typo must not fall back to the built-in StorageUtils rule
    let err = load_from_str("[migration]\nnew_bindng = \"SesMailer\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml { .. }));
    assert!(err.to_string().contains("new_bindng"));
}

#[test]
fn test_validation_error_lists_migration_issues() {
    let toml = r#"
[migration]
old_binding = "Storage"
new_binding = "Storage"
"#;

    let err = load_from_str(toml).unwrap_err();
    match err {
        ConfigError::Validation { source, .. } => {
            assert_eq!(
                source.issues,
                vec![ValidationIssue::Migration(MigrationError::SameBinding(
                    "Storage".to_string()
                ))]
            );
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn test_load_from_path_attaches_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("migrate.toml");
    fs::write(&path, "[logging]\nlevel = \"chatty\"\n").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { path: Some(ref p), .. } if p == &path));
    assert!(err.to_string().contains("migrate.toml"));
}

#[test]
fn test_load_from_missing_path() {
    let dir = TempDir::new().unwrap();
    let err = load_from_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
