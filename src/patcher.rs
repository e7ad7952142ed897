//! Text patcher - applies an import migration to a single file
//!
//! The transform is three whole-buffer substitutions, always in this order:
//! 1. the first legacy import becomes the new destructured import
//! 2. every `<old>.` member access becomes `<new>.`
//! 3. any legacy import left over (duplicates) is removed with its trailing whitespace
//!
//! Step 2 works on text, not scopes: it rewrites usages even when the import
//! was never found, and it rewrites matches inside strings and comments.

use crate::buffer::{BufferError, SourceBuffer};
use crate::migration::{ImportMigration, MigrationError, MigrationPatterns};
use regex::NoExpand;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How many matches each step replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepCounts {
    pub imports_rewritten: usize,
    pub usages_rewritten: usize,
    pub duplicates_removed: usize,
}

impl StepCounts {
    pub fn is_empty(&self) -> bool {
        self.imports_rewritten == 0 && self.usages_rewritten == 0 && self.duplicates_removed == 0
    }
}

impl fmt::Display for StepCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} import(s) rewritten, {} usage(s) rewritten, {} duplicate(s) removed",
            self.imports_rewritten, self.usages_rewritten, self.duplicates_removed
        )
    }
}

/// Output of [`TextPatcher::transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub output: String,
    pub counts: StepCounts,
}

/// Result of patching one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[must_use = "PatchOutcome should be reported"]
pub enum PatchOutcome {
    /// File was rewritten
    Applied { file: PathBuf, counts: StepCounts },
    /// Dry run: file would be rewritten
    WouldApply { file: PathBuf, counts: StepCounts },
    /// Nothing matched, file left as is
    AlreadyMigrated { file: PathBuf },
}

impl PatchOutcome {
    pub fn file(&self) -> &Path {
        match self {
            PatchOutcome::Applied { file, .. }
            | PatchOutcome::WouldApply { file, .. }
            | PatchOutcome::AlreadyMigrated { file } => file,
        }
    }

    pub fn counts(&self) -> StepCounts {
        match self {
            PatchOutcome::Applied { counts, .. } | PatchOutcome::WouldApply { counts, .. } => {
                *counts
            }
            PatchOutcome::AlreadyMigrated { .. } => StepCounts::default(),
        }
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOutcome::Applied { file, counts } => {
                write!(f, "Patched {} ({})", file.display(), counts)
            }
            PatchOutcome::WouldApply { file, counts } => {
                write!(f, "Would patch {} ({})", file.display(), counts)
            }
            PatchOutcome::AlreadyMigrated { file } => {
                write!(f, "Already migrated: {}", file.display())
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error("invalid migration rule: {0}")]
    Migration(#[from] MigrationError),
}

/// Before/after text of a previewed file, for diff output.
#[derive(Debug, Clone)]
pub struct Preview {
    pub outcome: PatchOutcome,
    pub before: String,
    pub after: String,
}

/// Applies one [`ImportMigration`] to source files.
#[derive(Debug, Clone)]
pub struct TextPatcher {
    migration: ImportMigration,
    patterns: MigrationPatterns,
}

impl Default for TextPatcher {
    fn default() -> Self {
        Self::new(ImportMigration::default()).expect("default migration rule is valid")
    }
}

impl TextPatcher {
    pub fn new(migration: ImportMigration) -> Result<Self, MigrationError> {
        let patterns = migration.compile()?;
        Ok(Self {
            migration,
            patterns,
        })
    }

    pub fn migration(&self) -> &ImportMigration {
        &self.migration
    }

    pub fn patterns(&self) -> &MigrationPatterns {
        &self.patterns
    }

    /// Run the three substitutions over `source`.
    pub fn transform(&self, source: &str) -> Transformation {
        let p = &self.patterns;
        let mut counts = StepCounts::default();

        counts.imports_rewritten = usize::from(p.legacy_import.is_match(source));
        let step1 = p
            .legacy_import
            .replacen(source, 1, NoExpand(&p.replacement_import));

        counts.usages_rewritten = p.usage.find_iter(&step1).count();
        let step2 = p.usage.replace_all(&step1, NoExpand(&p.replacement_usage));

        counts.duplicates_removed = p.residual_import.find_iter(&step2).count();
        let step3 = p.residual_import.replace_all(&step2, "");

        tracing::debug!(
            imports = counts.imports_rewritten,
            usages = counts.usages_rewritten,
            duplicates = counts.duplicates_removed,
            "transform finished"
        );

        Transformation {
            output: step3.into_owned(),
            counts,
        }
    }

    /// Read `path`, transform it and write the result back in place.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<PatchOutcome, PatchError> {
        let buffer = SourceBuffer::read(path.as_ref())?;
        let file = buffer.path().to_path_buf();
        let Transformation { output, counts } = self.transform(buffer.text());

        if output == buffer.text() {
            tracing::debug!(file = %file.display(), "no legacy import or usage found");
            return Ok(PatchOutcome::AlreadyMigrated { file });
        }

        buffer.write_back(&output)?;
        tracing::info!(file = %file.display(), %counts, "file rewritten");

        Ok(PatchOutcome::Applied { file, counts })
    }

    /// Same as [`run`](Self::run) without touching the file.
    pub fn preview(&self, path: impl AsRef<Path>) -> Result<Preview, PatchError> {
        let buffer = SourceBuffer::read(path.as_ref())?;
        let file = buffer.path().to_path_buf();
        let Transformation { output, counts } = self.transform(buffer.text());

        let outcome = if output == buffer.text() {
            PatchOutcome::AlreadyMigrated { file }
        } else {
            PatchOutcome::WouldApply { file, counts }
        };

        Ok(Preview {
            outcome,
            before: buffer.text().to_string(),
            after: output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const OLD_IMPORT: &str = "const StorageUtils = require('../utils/storage');";
    const NEW_IMPORT: &str = r#"const { S3StorageUtils } = require("../utils/s3-storage");"#;

    #[test]
    fn test_transform_single_import() {
        let patcher = TextPatcher::default();
        let input = format!("{OLD_IMPORT}\nStorageUtils.upload(x);");

        let result = patcher.transform(&input);
        assert_eq!(result.output, format!("{NEW_IMPORT}\nS3StorageUtils.upload(x);"));
        assert_eq!(
            result.counts,
            StepCounts {
                imports_rewritten: 1,
                usages_rewritten: 1,
                duplicates_removed: 0,
            }
        );
    }

    #[test]
    fn test_transform_duplicate_imports() {
        let patcher = TextPatcher::default();
        let input = format!("{OLD_IMPORT}\n{OLD_IMPORT}\nconst x = StorageUtils.validateFile(f);\n");

        let result = patcher.transform(&input);
        assert_eq!(result.output.matches(NEW_IMPORT).count(), 1);
        assert!(!patcher.patterns().has_legacy_import(&result.output));
        assert_eq!(result.counts.duplicates_removed, 1);
        assert_eq!(
            result.output,
            format!("{NEW_IMPORT}\nconst x = S3StorageUtils.validateFile(f);\n")
        );
    }

    #[test]
    fn test_duplicate_removal_eats_trailing_whitespace() {
        let patcher = TextPatcher::default();
        let input = format!("{OLD_IMPORT}\nfunction f() {{\n  {OLD_IMPORT}\n  return 1;\n}}\n");

        let result = patcher.transform(&input);
        assert_eq!(
            result.output,
            format!("{NEW_IMPORT}\nfunction f() {{\n  return 1;\n}}\n")
        );
    }

    #[test]
    fn test_usages_rewritten_without_import() {
        let patcher = TextPatcher::default();
        let input = "await StorageUtils.deleteFile(p);\n// see StorageUtils.md\n";

        let result = patcher.transform(input);
        assert_eq!(result.counts.imports_rewritten, 0);
        assert_eq!(result.counts.usages_rewritten, 2);
        assert_eq!(
            result.output,
            "await S3StorageUtils.deleteFile(p);\n// see S3StorageUtils.md\n"
        );
    }

    #[test]
    fn test_transform_is_noop_on_migrated_text() {
        let patcher = TextPatcher::default();
        let migrated = format!("{NEW_IMPORT}\nS3StorageUtils.upload(x);\n");

        let result = patcher.transform(&migrated);
        assert_eq!(result.output, migrated);
        assert!(result.counts.is_empty());
    }

    #[test]
    fn test_custom_migration() {
        let rule = ImportMigration::new("Mailer", "./mail", "SesMailer", "./ses-mail");
        let patcher = TextPatcher::new(rule).unwrap();
        let input = "const Mailer = require(\"./mail\")\nMailer.send(m);\n";

        let result = patcher.transform(input);
        assert_eq!(
            result.output,
            "const { SesMailer } = require(\"./ses-mail\");\nSesMailer.send(m);\n"
        );
    }

    #[test]
    fn test_run_writes_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("index.js");
        fs::write(&file_path, format!("{OLD_IMPORT}\nStorageUtils.upload(x);")).unwrap();

        let outcome = TextPatcher::default().run(&file_path).unwrap();
        assert!(matches!(outcome, PatchOutcome::Applied { .. }));
        assert_eq!(outcome.counts().usages_rewritten, 1);
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            format!("{NEW_IMPORT}\nS3StorageUtils.upload(x);")
        );
    }

    #[test]
    fn test_run_twice_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("index.js");
        fs::write(&file_path, format!("{OLD_IMPORT}\nStorageUtils.upload(x);\n")).unwrap();

        let patcher = TextPatcher::default();
        let first = patcher.run(&file_path).unwrap();
        let after_first = fs::read_to_string(&file_path).unwrap();
        let second = patcher.run(&file_path).unwrap();

        assert!(matches!(first, PatchOutcome::Applied { .. }));
        assert!(matches!(second, PatchOutcome::AlreadyMigrated { .. }));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), after_first);
    }

    #[test]
    #[cfg(unix)]
    fn test_run_patches_symlink_target() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let real = temp_dir.path().join("real.js");
        let link = temp_dir.path().join("index.js");
        fs::write(&real, format!("{OLD_IMPORT} StorageUtils.x();")).unwrap();
        symlink(&real, &link).unwrap();

        let outcome = TextPatcher::default().run(&link).unwrap();
        assert!(matches!(outcome, PatchOutcome::Applied { .. }));

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(&real).unwrap(),
            format!("{NEW_IMPORT} S3StorageUtils.x();")
        );
    }

    #[test]
    fn test_run_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("missing.js");

        let err = TextPatcher::default().run(&file_path).unwrap_err();
        assert!(matches!(err, PatchError::Buffer(ref e) if e.is_not_found()));
        assert!(!file_path.exists());
    }

    #[test]
    fn test_preview_leaves_file_alone() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("index.js");
        let original = format!("{OLD_IMPORT}\nStorageUtils.upload(x);\n");
        fs::write(&file_path, &original).unwrap();

        let preview = TextPatcher::default().preview(&file_path).unwrap();
        assert!(matches!(preview.outcome, PatchOutcome::WouldApply { .. }));
        assert_eq!(preview.before, original);
        assert!(preview.after.starts_with(NEW_IMPORT));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), original);
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let rule = ImportMigration::new("A", "./a", "A", "./b");
        assert!(TextPatcher::new(rule).is_err());
    }
}
