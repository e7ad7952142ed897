use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory names that are never scanned or patched.
pub const FORBIDDEN_DIRS: &[&str] = &["node_modules", ".git"];

/// Keeps batch rewrites inside the directory the user asked to scan.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical scan root
    root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside scan root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Path is inside a vendored or VCS directory: {path} ({dir})")]
    ForbiddenPath { path: PathBuf, dir: String },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WorkspaceGuard {
    /// The root is canonicalized so symlinked roots compare correctly.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    /// Resolve `path` (relative paths against the root) and check it.
    ///
    /// Returns the canonical path when it is safe to rewrite.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = canonicalize(&absolute)?;

        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: canonical,
                root: self.root.clone(),
            });
        }

        let relative = canonical.strip_prefix(&self.root).unwrap_or(&canonical);
        if let Some(dir) = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .find(|c| FORBIDDEN_DIRS.contains(c))
        {
            return Err(SafetyError::ForbiddenPath {
                dir: dir.to_string(),
                path: canonical,
            });
        }

        Ok(canonical)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize()
        .map_err(|source| SafetyError::Canonicalize {
            path: path.to_path_buf(),
            source,
        })
}
