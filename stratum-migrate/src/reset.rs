//! Destructive teardown of a project's migration state.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::MigrateResult;
use crate::snapshot::SnapshotStore;

/// Suffixes of files SQLite keeps next to a database.
const SQLITE_SIDECARS: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Extension of migration files written by the DDL emitter.
pub const ARTIFACT_EXTENSION: &str = "sql";

/// What a reset removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetSummary {
    /// Whether the database file existed and was removed.
    pub database_removed: bool,
    /// Snapshots removed.
    pub snapshots_removed: usize,
    /// Migration files removed.
    pub artifacts_removed: usize,
}

impl ResetSummary {
    /// Whether the reset found nothing to delete.
    pub fn is_empty(&self) -> bool {
        !self.database_removed && self.snapshots_removed == 0 && self.artifacts_removed == 0
    }
}

/// Deletes the database, every snapshot and every generated migration.
///
/// Only regular files carrying the artifact extension are removed from the
/// migrations directory; other files and subdirectories are left alone.
/// Running it on a project with nothing to delete succeeds.
#[derive(Debug, Clone)]
pub struct ResetUtility {
    database_path: PathBuf,
    migrations_dir: PathBuf,
    artifact_extension: String,
}

impl ResetUtility {
    /// Create a reset utility for a database file and migrations directory.
    pub fn new(database_path: impl Into<PathBuf>, migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            migrations_dir: migrations_dir.into(),
            artifact_extension: ARTIFACT_EXTENSION.to_string(),
        }
    }

    /// Set the extension of generated migration files.
    pub fn artifact_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = extension.into();
        self
    }

    /// Remove everything.
    pub fn reset_all<S>(&self, store: &mut S) -> MigrateResult<ResetSummary>
    where
        S: SnapshotStore + ?Sized,
    {
        let database_removed = self.remove_database()?;
        let snapshots_removed = store.purge_all()?;
        let artifacts_removed = self.remove_artifacts()?;

        let summary = ResetSummary {
            database_removed,
            snapshots_removed,
            artifacts_removed,
        };

        info!(
            database_removed,
            snapshots_removed, artifacts_removed, "Reset migration state"
        );
        Ok(summary)
    }

    fn remove_database(&self) -> MigrateResult<bool> {
        let removed = remove_if_exists(&self.database_path)?;

        for suffix in SQLITE_SIDECARS {
            let mut sidecar = self.database_path.clone().into_os_string();
            sidecar.push(suffix);
            remove_if_exists(Path::new(&sidecar))?;
        }

        Ok(removed)
    }

    fn remove_artifacts(&self) -> MigrateResult<usize> {
        let entries = match std::fs::read_dir(&self.migrations_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str());
            if extension != Some(self.artifact_extension.as_str()) {
                continue;
            }

            if remove_if_exists(&path)? {
                count += 1;
            }
        }

        Ok(count)
    }
}

fn remove_if_exists(path: &Path) -> MigrateResult<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
