//! Batch discovery of files that still carry the legacy import.

use crate::migration::MigrationPatterns;
use crate::safety::{SafetyError, WorkspaceGuard, FORBIDDEN_DIRS};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "cjs", "mjs"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
}

/// Files under `guard.root()` with one of `extensions` whose text matches the
/// legacy import. Sorted, canonical, deduplicated paths.
///
/// Symlinked scripts are followed only when the guard accepts their target:
/// a link that resolves outside the root or into `node_modules`/`.git` is
/// skipped with a warning, and a link to a file already found is listed once.
/// Unreadable or non-UTF-8 files are skipped: they cannot be patched anyway
/// and the single-file path reports those errors.
pub fn find_candidates(
    guard: &WorkspaceGuard,
    extensions: &[String],
    patterns: &MigrationPatterns,
) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(guard.root())
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_forbidden_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            root: guard.root().to_path_buf(),
            source,
        })?;

        if !is_script(&entry) || !has_extension(entry.path(), extensions) {
            continue;
        }

        let canonical = match guard.validate_path(entry.path()) {
            Ok(path) => path,
            Err(e @ (SafetyError::OutsideRoot { .. } | SafetyError::ForbiddenPath { .. })) => {
                tracing::warn!(file = %entry.path().display(), error = %e, "skipping linked file");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let Ok(text) = fs::read_to_string(&canonical) else {
            tracing::debug!(file = %entry.path().display(), "skipping unreadable file");
            continue;
        };

        if patterns.has_legacy_import(&text) {
            files.push(canonical);
        }
    }

    files.sort();
    files.dedup();
    tracing::debug!(root = %guard.root().display(), count = files.len(), "scan finished");

    Ok(files)
}

/// Regular files, plus symlinks that resolve to one. Dangling links are not scripts.
fn is_script(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    entry.path_is_symlink() && fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file())
}

fn is_forbidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| FORBIDDEN_DIRS.contains(&name))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
