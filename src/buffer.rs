use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// In-memory copy of a source file.
///
/// The fingerprint is the xxh3 hash of the bytes that were read. It is checked
/// again right before write-back so a file edited in the meantime is not
/// clobbered with a stale transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    path: PathBuf,
    text: String,
    fingerprint: u64,
}

#[derive(Error, Debug)]
pub enum BufferError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    #[error("{path} changed on disk since it was read")]
    ConcurrentModification { path: PathBuf },
}

impl BufferError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BufferError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

impl SourceBuffer {
    /// Read the whole file. Nothing is created if the path does not exist.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, BufferError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|source| BufferError::Read {
            path: path.clone(),
            source,
        })?;
        let fingerprint = xxh3_64(&bytes);
        let text = String::from_utf8(bytes).map_err(|source| BufferError::Utf8 {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            text,
            fingerprint,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the file still holds exactly the bytes this buffer was read from.
    pub fn is_current(&self) -> Result<bool, BufferError> {
        let bytes = fs::read(&self.path).map_err(|source| BufferError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(xxh3_64(&bytes) == self.fingerprint)
    }

    /// Overwrite the file with `contents`, consuming the buffer.
    ///
    /// A symlinked path is written through: the link stays in place and the
    /// file it points at receives the new contents.
    pub fn write_back(self, contents: &str) -> Result<(), BufferError> {
        let target = fs::canonicalize(&self.path).map_err(|source| BufferError::Read {
            path: self.path.clone(),
            source,
        })?;

        if !self.is_current()? {
            return Err(BufferError::ConcurrentModification { path: self.path });
        }

        atomic_write(&target, contents.as_bytes()).map_err(|source| BufferError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The tempfile lives in the target's directory so the rename stays on one
/// filesystem. Permissions of the existing file carry over to the replacement.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no parent directory",
            ))
        }
    };

    let permissions = fs::metadata(path)?.permissions();

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
