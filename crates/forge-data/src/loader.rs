//! Reads data files into loadable values.
//!
//! Provides format detection (RON/JSON/TOML), directory scanning, and
//! deserialization helpers. Every format is read into the JSON tree model, so
//! one [`Loadable`] parses a definition whatever format it was written in.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use forge_loadable::{LoadError, Loadable};

use crate::config::LoaderConfig;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same definition id but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// The file is not valid RON/JSON/TOML.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The file parsed but its contents were rejected.
    #[error("invalid definition in {file}: {source}")]
    Load {
        file: PathBuf,
        #[source]
        source: LoadError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Json, Format::Ron, Format::Toml];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for format in Format::ALL {
        let candidate = dir.join(format!("{base_name}.{}", format.extension()));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// A definition file found by [`scan_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    /// Path relative to the scanned directory, without extension, with `/`
    /// separators, e.g. `tools/pickaxe`.
    pub id: String,
    pub path: PathBuf,
}

/// Definition id of `path` inside `root`, or `None` if `path` is outside it
/// or has no file name.
pub fn definition_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let segments: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// List definition files under `dir` whose extension is in
/// `config.extensions`, sorted by id then path. Files sharing an id are all
/// returned; the caller decides how to report the conflict.
pub fn scan_directory(dir: &Path, config: &LoaderConfig) -> Result<Vec<DataFile>, DataLoadError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            // Symlinked directories are not followed.
            if entry.file_type()?.is_dir() {
                if config.recursive {
                    pending.push(path);
                }
                continue;
            }
            let accepted = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| config.accepts_extension(ext));
            if !accepted {
                continue;
            }
            if let Some(id) = definition_id(dir, &path) {
                files.push(DataFile { id, path });
            }
        }
    }

    files.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => toml::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Read a file of any supported format into the JSON tree model.
pub fn read_tree(path: &Path) -> Result<Value, DataLoadError> {
    deserialize_file(path)
}

/// Read `path` and convert it with `loadable`.
pub fn load_file<L: Loadable + ?Sized>(loadable: &L, path: &Path) -> Result<L::Value, DataLoadError> {
    let tree = read_tree(path)?;
    loadable
        .convert(&tree, "")
        .map_err(|source| DataLoadError::Load {
            file: path.to_path_buf(),
            source,
        })
}

// ===========================================================================
// Tests
// ===========================================================================
