//! Reference catalogs and deviation tables stored as YAML

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use routewatch_common::{Catalog, DeviationTable, ReferenceCatalog};

use crate::error::{E2eError, E2eResult};

/// On-disk form of a reference catalog (or a fragment of one)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceFile {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Group name to endpoint templates
    pub groups: Catalog,
}

fn default_version() -> u32 {
    1
}

impl ReferenceFile {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }
}

/// Load a reference catalog from a file, or merge every YAML file in a directory
pub fn load_reference(path: &Path) -> E2eResult<ReferenceCatalog> {
    if path.is_dir() {
        return load_reference_dir(path);
    }

    let content = std::fs::read_to_string(path).map_err(|e| contract_error(path, e))?;
    let file = ReferenceFile::from_yaml(&content).map_err(|e| contract_error(path, e))?;
    debug!(
        "Loaded {} groups from {}",
        file.groups.len(),
        path.display()
    );
    Ok(file.groups)
}

fn load_reference_dir(dir: &Path) -> E2eResult<ReferenceCatalog> {
    let mut catalog = Catalog::new();

    let mut files: Vec<_> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for file in files {
        let fragment = load_reference(&file)?;
        catalog
            .merge(fragment)
            .map_err(|e| contract_error(&file, e))?;
    }

    if catalog.is_empty() {
        return Err(contract_error(dir, "no reference groups found"));
    }
    Ok(catalog)
}

/// Load a deviation table
pub fn load_deviations(path: &Path) -> E2eResult<DeviationTable> {
    let content = std::fs::read_to_string(path).map_err(|e| contract_error(path, e))?;
    serde_yaml::from_str(&content).map_err(|e| contract_error(path, e))
}

fn contract_error(path: &Path, reason: impl std::fmt::Display) -> E2eError {
    E2eError::ContractFile {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
