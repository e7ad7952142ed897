use crate::migration::{ImportMigration, MigrationError};
use crate::scan::DEFAULT_EXTENSIONS;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_TARGET: &str = "backend/src/services/index.js";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    #[serde(default)]
    pub migration: ImportMigration,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// File patched when no path is given on the command line.
    /// Relative paths are anchored to the config file's directory on load.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Script extensions considered by directory scans
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            file: None,
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl MigrateConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues: Vec<ValidationIssue> = self
            .migration
            .issues()
            .into_iter()
            .map(ValidationIssue::Migration)
            .collect();

        if let Some(file) = &self.target.file {
            if file.to_string_lossy().trim().is_empty() {
                issues.push(ValidationIssue::EmptyField("target.file"));
            }
        }

        if self.target.extensions.is_empty() {
            issues.push(ValidationIssue::EmptyField("target.extensions"));
        }
        for ext in &self.target.extensions {
            if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
                issues.push(ValidationIssue::InvalidExtension(ext.clone()));
            }
        }

        if let Some(level) = &self.logging.level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                issues.push(ValidationIssue::UnknownLogLevel(level.clone()));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Configured target file, or the built-in services module.
    pub fn target_file(&self) -> &Path {
        self.target
            .file
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_TARGET))
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    Migration(MigrationError),
    EmptyField(&'static str),
    InvalidExtension(String),
    UnknownLogLevel(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Migration(e) => write!(f, "migration: {e}"),
            ValidationIssue::EmptyField(field) => write!(f, "'{field}' must not be empty"),
            ValidationIssue::InvalidExtension(ext) => {
                write!(f, "invalid extension '{ext}' (expected e.g. \"js\")")
            }
            ValidationIssue::UnknownLogLevel(level) => write!(
                f,
                "unknown log level '{level}' (expected one of {})",
                LOG_LEVELS.join(", ")
            ),
        }
    }
}
