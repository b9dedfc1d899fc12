//! Loads API descriptions from a directory of `.json` files

use super::{ApiDescription, DescriptionProvider, DescriptionSet};
use crate::error::{AuthError, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load every description in `dir`, keyed by file stem
///
/// A missing directory yields an empty set. JSON files without a `swagger`
/// field are skipped; files that are not valid JSON are an error.
pub fn load_dir(dir: &Path) -> Result<DescriptionSet> {
    let mut descriptions = DescriptionSet::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Description directory does not exist");
            return Ok(descriptions);
        }
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    files.sort();

    for file in files {
        let Some(name) = file.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let contents = fs::read_to_string(&file)?;
        let json: Value = serde_json::from_str(&contents).map_err(|e| {
            AuthError::InvalidDescription(format!("{} is not valid JSON: {}", file.display(), e))
        })?;

        if json.get("swagger").map(|v| v.is_null()).unwrap_or(true) {
            info!(file = %file.display(), "Skipping non-Swagger JSON file");
            continue;
        }

        let description: ApiDescription = serde_json::from_value(json)
            .map_err(|e| AuthError::InvalidDescription(format!("{}: {}", file.display(), e)))?;

        debug!(name = %name, paths = description.paths.len(), "Loaded API description");
        descriptions.insert(name.to_string(), description);
    }

    Ok(descriptions)
}

/// Provider reading a description directory on every call
#[derive(Debug, Clone)]
pub struct DescriptionDir {
    dir: PathBuf,
}

impl DescriptionDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl DescriptionProvider for DescriptionDir {
    fn list_descriptions(&self) -> Result<DescriptionSet> {
        load_dir(&self.dir)
    }
}
