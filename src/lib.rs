//! Storage Migrate: one-shot rewrite of legacy storage imports
//!
//! Moves JavaScript service modules from the local-disk `StorageUtils` helper
//! to the S3-backed `S3StorageUtils` with three text substitutions over the
//! whole file. There is no parser involved.
//!
//! # Safety
//!
//! - The file is read whole and must be valid UTF-8
//! - Writes are atomic (tempfile + fsync + rename) and keep permissions
//! - A file that changed on disk after it was read is not overwritten
//! - Unchanged files are not rewritten
//! - Directory scans stay inside their root and skip `node_modules`/`.git`
//!
//! # Example
//!
//! ```no_run
//! use storage_migrate::TextPatcher;
//!
//! match TextPatcher::default().run("backend/src/services/index.js") {
//!     Ok(outcome) => println!("{outcome}"),
//!     Err(e) => eprintln!("Patch failed: {e}"),
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod logging;
pub mod migration;
pub mod patcher;
pub mod safety;
pub mod scan;

// Re-exports
pub use buffer::{BufferError, SourceBuffer};
pub use config::{load_from_path, load_from_str, ConfigError, MigrateConfig};
pub use migration::{ImportMigration, MigrationError, MigrationPatterns};
pub use patcher::{PatchError, PatchOutcome, Preview, StepCounts, TextPatcher, Transformation};
pub use safety::{SafetyError, WorkspaceGuard};
pub use scan::{find_candidates, ScanError};
