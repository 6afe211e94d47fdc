//! Reading model descriptions from JSON: a string, a file, or a directory of fragments.

use super::builder::ModelDef;
use super::Schema;
use crate::error::ModelError;
use std::path::Path;

impl ModelDef {
    pub fn from_json_str(source: &str) -> Result<Self, ModelError> {
        Self::parse(source, "<string>")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Merge every `*.json` file below `dir`, visited in path order so that the
    /// result does not depend on directory listing order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ModelError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(|e| ModelError::Walk {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
            {
                files.push(entry.into_path());
            }
        }
        files.sort();

        let mut model = ModelDef::default();
        for file in &files {
            log::debug!("loading model fragment {}", file.display());
            model.merge(Self::from_file(file)?);
        }
        Ok(model)
    }

    fn parse(source: &str, origin: &str) -> Result<Self, ModelError> {
        serde_json::from_str(source).map_err(|source| ModelError::Parse {
            origin: origin.to_string(),
            source,
        })
    }
}

impl Schema {
    pub fn from_json_str(source: &str) -> Result<Self, ModelError> {
        ModelDef::from_json_str(source)?.build()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        ModelDef::from_file(path)?.build()
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ModelError> {
        ModelDef::from_dir(dir)?.build()
    }
}
