//! Loading model definitions from model sources.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{SchemaError, SchemaResult};
use crate::model::ModelDefinition;

/// Extension of model files in a model directory.
pub const MODEL_FILE_EXTENSION: &str = "toml";

/// A model as delivered by a source, possibly malformed.
#[derive(Debug)]
pub struct ModelEntry {
    /// Where the model came from (file stem or model name).
    pub origin: String,
    /// The parsed and validated definition.
    pub definition: SchemaResult<ModelDefinition>,
}

impl ModelEntry {
    /// Name to report this entry under.
    pub fn label(&self) -> &str {
        match &self.definition {
            Ok(model) => &model.name,
            Err(_) => &self.origin,
        }
    }
}

impl From<ModelDefinition> for ModelEntry {
    fn from(model: ModelDefinition) -> Self {
        Self {
            origin: model.name.clone(),
            definition: model.validate().map(|()| model),
        }
    }
}

/// Supplies model definitions to the migration engine.
///
/// A source fails as a whole only when it cannot be enumerated; individual
/// malformed models are reported through [`ModelEntry::definition`].
pub trait ModelSource {
    /// Load every model this source knows about.
    fn load(&self) -> SchemaResult<Vec<ModelEntry>>;
}

impl ModelSource for Vec<ModelDefinition> {
    fn load(&self) -> SchemaResult<Vec<ModelEntry>> {
        Ok(self.iter().cloned().map(ModelEntry::from).collect())
    }
}

/// Reads `*.toml` model files from a directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct DirectoryModelSource {
    dir: PathBuf,
}

impl DirectoryModelSource {
    /// Create a source over a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory being read.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_model(path: &Path) -> SchemaResult<ModelDefinition> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::io(path.display().to_string(), e))?;

        let model: ModelDefinition =
            toml::from_str(&content).map_err(|e| SchemaError::ModelFile {
                path: path.display().to_string(),
                source: e,
            })?;

        model.validate()?;
        Ok(model)
    }
}

impl ModelSource for DirectoryModelSource {
    fn load(&self) -> SchemaResult<Vec<ModelEntry>> {
        if !self.dir.exists() {
            warn!(dir = %self.dir.display(), "Model directory does not exist");
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| SchemaError::io(self.dir.display().to_string(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| SchemaError::io(self.dir.display().to_string(), e))?
                .path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(MODEL_FILE_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort();

        let models = paths
            .into_iter()
            .map(|path| {
                let origin = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!(file = %path.display(), "Loading model file");

                ModelEntry {
                    origin,
                    definition: Self::read_model(&path),
                }
            })
            .collect();

        Ok(models)
    }
}
