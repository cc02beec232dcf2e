//! Prompt File Loader
//!
//! Reads `*.yaml`, `*.yml` and `*.json` prompt files from a directory tree
//! and feeds each record through [`PromptRegistry::add`].
//!
//! File names carry a version hint: `summarize.yaml` is version 1 unless the
//! record says otherwise, `summarize_v3.yaml` is version 3 and the record's
//! own `version` field must agree.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::RegistryError;
use crate::registry::PromptRegistry;
use crate::templates::PromptTemplate;
use crate::variables::VariableSpec;

const PROMPT_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{}: file name says v{file_version} but the record says v{record_version}", .path.display())]
    VersionMismatch {
        path: PathBuf,
        file_version: u32,
        record_version: u32,
    },

    #[error("{}: {source}", .path.display())]
    Registry {
        path: PathBuf,
        source: RegistryError,
    },

    #[error("Failed to walk prompts directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// On-disk shape. Everything is optional so files can lean on the
/// file-name conventions.
#[derive(Debug, Deserialize)]
struct PromptFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    description: Option<String>,
    /// A bare `name:` entry (null spec) declares a required variable
    #[serde(default)]
    variables: Option<BTreeMap<String, Option<VariableSpec>>>,
    #[serde(default)]
    template: Option<String>,
}

/// Split `summarize_v3` into (`summarize`, Some(3)).
pub fn split_version_suffix(stem: &str) -> (&str, Option<u32>) {
    if let Some((base, digits)) = stem.rsplit_once("_v") {
        if !base.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(version) = digits.parse() {
                return (base, Some(version));
            }
        }
    }
    (stem, None)
}

fn is_prompt_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| PROMPT_EXTENSIONS.contains(&e))
}

/// Parse one prompt document. `path` supplies the fallback name and version
/// and is used in error messages. Empty documents yield `None`.
pub fn parse_record(source: &str, path: &Path) -> Result<Option<PromptTemplate>, LoadError> {
    if source.trim().is_empty() {
        return Ok(None);
    }

    let raw: Option<PromptFile> = serde_yaml::from_str(source).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let (base_name, file_version) = split_version_suffix(stem);

    let version = match (file_version, raw.version) {
        (Some(file_version), Some(record_version)) if file_version != record_version => {
            return Err(LoadError::VersionMismatch {
                path: path.to_path_buf(),
                file_version,
                record_version,
            });
        }
        (_, Some(record_version)) => record_version,
        (Some(file_version), None) => file_version,
        (None, None) => 1,
    };

    let variables = raw
        .variables
        .unwrap_or_default()
        .into_iter()
        .map(|(name, spec)| (name, spec.unwrap_or_default()))
        .collect();

    Ok(Some(PromptTemplate {
        name: raw.name.unwrap_or_else(|| base_name.to_string()),
        version,
        description: raw.description.unwrap_or_default(),
        variables,
        template: raw.template.unwrap_or_default(),
    }))
}

pub fn load_file(path: &Path) -> Result<Option<PromptTemplate>, LoadError> {
    let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Parsing prompt file {}", path.display());
    parse_record(&source, path)
}

/// Parse every prompt file under `dir`, in path order, without registering
/// anything. A missing directory yields no records.
pub fn read_records(dir: &Path) -> Result<Vec<(PathBuf, PromptTemplate)>, LoadError> {
    if !dir.exists() {
        debug!("Prompts directory {} does not exist", dir.display());
        return Ok(vec![]);
    }

    let mut records = vec![];
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_prompt_file(entry.path()) {
            continue;
        }
        if let Some(record) = load_file(entry.path())? {
            records.push((entry.into_path(), record));
        }
    }
    Ok(records)
}

/// Load every prompt file under `dir` into `registry`.
///
/// Stops at the first failure. Records added before it stay in `registry`;
/// use [`load_dir`] for all-or-nothing loading.
pub fn load_into(dir: &Path, registry: &mut PromptRegistry) -> Result<usize, LoadError> {
    let records = read_records(dir)?;
    let loaded = records.len();

    for (path, record) in records {
        registry
            .add(record)
            .map_err(|source| LoadError::Registry { path, source })?;
    }

    info!("Loaded {} prompt file(s) from {}", loaded, dir.display());
    Ok(loaded)
}

/// Build a fresh registry from `dir`. A missing directory gives an empty
/// registry.
pub fn load_dir(dir: &Path) -> Result<PromptRegistry, LoadError> {
    let mut registry = PromptRegistry::new();
    load_into(dir, &mut registry)?;
    Ok(registry)
}
