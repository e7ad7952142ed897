//! Import migration rule and the patterns compiled from it.
//!
//! A migration names a legacy binding imported from a legacy module and the
//! binding/module pair that replaces it. The default rule moves services off
//! the local-disk `StorageUtils` helper onto `S3StorageUtils`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_OLD_BINDING: &str = "StorageUtils";
pub const DEFAULT_OLD_MODULE: &str = "../utils/storage";
pub const DEFAULT_NEW_BINDING: &str = "S3StorageUtils";
pub const DEFAULT_NEW_MODULE: &str = "../utils/s3-storage";

/// A single binding/module rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportMigration {
    /// Identifier bound by the legacy import (`const StorageUtils = ...`)
    pub old_binding: String,
    /// Module path the legacy import requires
    pub old_module: String,
    /// Identifier destructured from the new module
    pub new_binding: String,
    /// Module path of the replacement import
    pub new_module: String,
}

impl Default for ImportMigration {
    fn default() -> Self {
        Self {
            old_binding: DEFAULT_OLD_BINDING.to_string(),
            old_module: DEFAULT_OLD_MODULE.to_string(),
            new_binding: DEFAULT_NEW_BINDING.to_string(),
            new_module: DEFAULT_NEW_MODULE.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("'{value}' is not a valid {field} identifier")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("{field} module path is empty")]
    EmptyModule { field: &'static str },

    #[error("{field} module path contains a quote or line break: {value:?}")]
    InvalidModule { field: &'static str, value: String },

    #[error("old and new binding are both '{0}'")]
    SameBinding(String),

    #[error("failed to compile pattern: {0}")]
    Pattern(String),
}

impl ImportMigration {
    pub fn new(
        old_binding: impl Into<String>,
        old_module: impl Into<String>,
        new_binding: impl Into<String>,
        new_module: impl Into<String>,
    ) -> Self {
        Self {
            old_binding: old_binding.into(),
            old_module: old_module.into(),
            new_binding: new_binding.into(),
            new_module: new_module.into(),
        }
    }

    /// Collect every problem with this rule rather than stopping at the first.
    pub fn issues(&self) -> Vec<MigrationError> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("old_binding", &self.old_binding),
            ("new_binding", &self.new_binding),
        ] {
            if !is_identifier(value) {
                issues.push(MigrationError::InvalidIdentifier {
                    field,
                    value: value.clone(),
                });
            }
        }

        for (field, value) in [
            ("old_module", &self.old_module),
            ("new_module", &self.new_module),
        ] {
            if value.trim().is_empty() {
                issues.push(MigrationError::EmptyModule { field });
            } else if value.contains(['\'', '"', '`', '\n', '\r']) {
                issues.push(MigrationError::InvalidModule {
                    field,
                    value: value.clone(),
                });
            }
        }

        if self.old_binding == self.new_binding {
            issues.push(MigrationError::SameBinding(self.old_binding.clone()));
        }

        issues
    }

    pub fn validate(&self) -> Result<(), MigrationError> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// The import line written in place of the first legacy import.
    pub fn replacement_import(&self) -> String {
        format!(
            "const {{ {} }} = require(\"{}\");",
            self.new_binding, self.new_module
        )
    }

    pub fn compile(&self) -> Result<MigrationPatterns, MigrationError> {
        self.validate()?;

        let binding = regex::escape(&self.old_binding);
        let module = regex::escape(&self.old_module);
        let import_src =
            format!(r#"\bconst\s+{binding}\s*=\s*require\(\s*['"]{module}['"]\s*\)(?:[ \t]*;)?"#);

        let legacy_import = compile(&import_src)?;
        let residual_import = compile(&format!(r"{import_src}\s*"))?;
        let usage = compile(&format!(r"\b{binding}\."))?;

        Ok(MigrationPatterns {
            legacy_import,
            residual_import,
            usage,
            replacement_import: self.replacement_import(),
            replacement_usage: format!("{}.", self.new_binding),
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, MigrationError> {
    Regex::new(pattern).map_err(|e| MigrationError::Pattern(e.to_string()))
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Regexes and replacement text derived from an [`ImportMigration`].
#[derive(Debug, Clone)]
pub struct MigrationPatterns {
    /// Matches one legacy import assignment
    pub legacy_import: Regex,
    /// Legacy import assignment plus any whitespace after it
    pub residual_import: Regex,
    /// `<old_binding>.` preceded by a word boundary
    pub usage: Regex,
    pub replacement_import: String,
    pub replacement_usage: String,
}

impl MigrationPatterns {
    /// Cheap check used by directory scans to pick candidate files.
    pub fn has_legacy_import(&self, text: &str) -> bool {
        self.legacy_import.is_match(text)
    }
}
