//! Schema snapshots: the attribute map recorded when a model was last
//! migrated.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use stratum_schema::{AttributeMap, SchemaError};
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};

/// Extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Persistence of per-model snapshots.
pub trait SnapshotStore {
    /// Load the snapshot for a model, if one was recorded.
    fn load(&self, model: &str) -> MigrateResult<Option<AttributeMap>>;

    /// Replace the snapshot for a model.
    ///
    /// Implementations must never expose a partially written snapshot.
    fn save(&mut self, model: &str, attributes: &AttributeMap) -> MigrateResult<()>;

    /// Remove every snapshot. Returns how many were removed.
    fn purge_all(&mut self) -> MigrateResult<usize>;
}

/// Snapshots stored as `<dir>/<Model>.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at a directory. The directory is created on the
    /// first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The snapshot directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot for a model.
    pub fn snapshot_path(&self, model: &str) -> MigrateResult<PathBuf> {
        if model.is_empty()
            || model
                .chars()
                .any(|c| c == '/' || c == '\\' || c == '.' || c.is_control())
        {
            return Err(
                SchemaError::invalid_model(model, "name is not usable as a snapshot key").into(),
            );
        }

        Ok(self.dir.join(format!("{model}.{SNAPSHOT_EXTENSION}")))
    }

    fn snapshot_files(&self) -> MigrateResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION)
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, model: &str) -> MigrateResult<Option<AttributeMap>> {
        let path = self.snapshot_path(model)?;

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let attributes = serde_json::from_str(&content).map_err(|e| {
            MigrationError::snapshot(format!("corrupt snapshot {}: {e}", path.display()))
        })?;

        Ok(Some(attributes))
    }

    fn save(&mut self, model: &str, attributes: &AttributeMap) -> MigrateResult<()> {
        let path = self.snapshot_path(model)?;
        std::fs::create_dir_all(&self.dir)?;

        let content = serde_json::to_string_pretty(attributes)
            .map_err(|e| MigrationError::snapshot(e.to_string()))?;

        // Write next to the target, then rename over it.
        let tmp = self.dir.join(format!(".{model}.{SNAPSHOT_EXTENSION}.tmp"));
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;

        debug!(model = %model, path = %path.display(), "Saved schema snapshot");
        Ok(())
    }

    fn purge_all(&mut self) -> MigrateResult<usize> {
        let files = self.snapshot_files()?;
        let count = files.len();

        for file in files {
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(dir = %self.dir.display(), count, "Purged schema snapshots");
        Ok(count)
    }
}

/// In-memory snapshots, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshots: HashMap<String, AttributeMap>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshot is stored.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, model: &str) -> MigrateResult<Option<AttributeMap>> {
        Ok(self.snapshots.get(model).cloned())
    }

    fn save(&mut self, model: &str, attributes: &AttributeMap) -> MigrateResult<()> {
        self.snapshots.insert(model.to_string(), attributes.clone());
        Ok(())
    }

    fn purge_all(&mut self) -> MigrateResult<usize> {
        let count = self.snapshots.len();
        self.snapshots.clear();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_schema::{AttributeSpec, ValidationRule};

    fn user_attributes() -> AttributeMap {
        let mut attributes = AttributeMap::new();
        attributes.insert(
            "name".to_string(),
            AttributeSpec::new(ValidationRule::string_max(100)).required(),
        );
        attributes.insert(
            "email".to_string(),
            AttributeSpec::new(ValidationRule::string_max(255)).unique(),
        );
        attributes
    }

    #[test]
    fn test_file_store_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshots"));
        assert!(store.load("User").unwrap().is_none());
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(dir.path().join("snapshots"));

        store.save("User", &user_attributes()).unwrap();
        let loaded = store.load("User").unwrap().unwrap();

        assert_eq!(loaded, user_attributes());
        assert!(dir.path().join("snapshots/User.json").exists());
        assert!(!dir.path().join("snapshots/.User.json.tmp").exists());
    }

    #[test]
    fn test_file_store_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(dir.path());

        store.save("User", &user_attributes()).unwrap();

        let mut smaller = AttributeMap::new();
        smaller.insert("name".to_string(), AttributeSpec::new(ValidationRule::string()));
        store.save("User", &smaller).unwrap();

        assert_eq!(store.load("User").unwrap().unwrap(), smaller);
    }

    #[test]
    fn test_file_store_purge_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(dir.path());
        std::fs::write(dir.path().join("README.md"), "keep me").unwrap();

        store.save("User", &user_attributes()).unwrap();
        store.save("Post", &AttributeMap::new()).unwrap();

        assert_eq!(store.purge_all().unwrap(), 2);
        assert!(store.load("User").unwrap().is_none());
        assert!(store.load("Post").unwrap().is_none());
        assert!(dir.path().join("README.md").exists());
        assert_eq!(store.purge_all().unwrap(), 0);
    }

    #[test]
    fn test_file_store_purge_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(dir.path().join("never-created"));
        assert_eq!(store.purge_all().unwrap(), 0);
    }

    #[test]
    fn test_file_store_corrupt_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("User.json"), "{ not json").unwrap();

        let store = FileSnapshotStore::new(dir.path());
        let err = store.load("User").unwrap_err();
        assert!(matches!(err, MigrationError::Snapshot(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_file_store_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());

        let err = store.load("../User").unwrap_err();
        assert!(matches!(err, MigrationError::InvalidModel(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemorySnapshotStore::new();
        assert!(store.load("User").unwrap().is_none());

        store.save("User", &user_attributes()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("User").unwrap(), Some(user_attributes()));

        assert_eq!(store.purge_all().unwrap(), 1);
        assert!(store.is_empty());
    }
}
