//! Fail-soft reloading of a data directory.
//!
//! Every definition file is converted independently. A broken file is
//! reported with its path and error and never hides its neighbours; the
//! returned [`DefinitionSet`] holds every definition that did load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use forge_loadable::Loadable;

use crate::config::{CONFIG_NAME, LoaderConfig};
use crate::loader::{self, DataFile, DataLoadError};

// ===========================================================================
// Definition set
// ===========================================================================

/// Loaded definitions keyed by id. Immutable once built; a reload produces a
/// new set.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionSet<T> {
    definitions: BTreeMap<String, T>,
}

impl<T> Default for DefinitionSet<T> {
    fn default() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }
}

impl<T> DefinitionSet<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.definitions.iter().map(|(id, value)| (id.as_str(), value))
    }
}

impl<T> FromIterator<(String, T)> for DefinitionSet<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            definitions: iter.into_iter().collect(),
        }
    }
}

// ===========================================================================
// Reports
// ===========================================================================

/// One file that failed to load.
#[derive(Debug)]
pub struct FileError {
    pub id: String,
    pub path: PathBuf,
    pub error: DataLoadError,
}

/// Result of a fail-soft reload.
#[derive(Debug)]
pub struct ReloadReport<T> {
    pub definitions: DefinitionSet<T>,
    /// Failures in id order.
    pub errors: Vec<FileError>,
}

impl<T> ReloadReport<T> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// ===========================================================================
// Reload
// ===========================================================================

/// Load every definition under `dir` with `loadable`.
///
/// Only a failure to read the directory itself is an `Err`, unless
/// `config.fail_fast` is set, in which case the first failing file aborts the
/// reload. Two files sharing an id are both rejected as a format conflict.
/// The root configuration file is not a definition and is skipped.
pub fn reload<L: Loadable + ?Sized>(
    loadable: &L,
    dir: &Path,
    config: &LoaderConfig,
) -> Result<ReloadReport<L::Value>, DataLoadError> {
    let files = loader::scan_directory(dir, config)?;

    let mut definitions = BTreeMap::new();
    let mut errors = Vec::new();

    for group in files.chunk_by(|a, b| a.id == b.id) {
        let [first, rest @ ..] = group else {
            continue;
        };
        if first.id == CONFIG_NAME {
            continue;
        }

        let outcome = match rest.first() {
            None => load_one(loadable, first),
            Some(second) => Err(DataLoadError::ConflictingFormats {
                a: first.path.clone(),
                b: second.path.clone(),
            }),
        };

        match outcome {
            Ok(value) => {
                definitions.insert(first.id.clone(), value);
            }
            Err(error) => {
                tracing::warn!(id = %first.id, path = %first.path.display(), %error, "definition failed to load");
                if config.fail_fast {
                    return Err(error);
                }
                errors.push(FileError {
                    id: first.id.clone(),
                    path: first.path.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        loaded = definitions.len(),
        failed = errors.len(),
        "reloaded definitions"
    );

    Ok(ReloadReport {
        definitions: DefinitionSet { definitions },
        errors,
    })
}

/// Reload `dir` using the configuration file at its root, if any.
pub fn reload_dir<L: Loadable + ?Sized>(
    loadable: &L,
    dir: &Path,
) -> Result<ReloadReport<L::Value>, DataLoadError> {
    let config = LoaderConfig::find_in(dir)?;
    reload(loadable, dir, &config)
}

fn load_one<L: Loadable + ?Sized>(loadable: &L, file: &DataFile) -> Result<L::Value, DataLoadError> {
    tracing::debug!(id = %file.id, path = %file.path.display(), "loading definition");
    loader::load_file(loadable, &file.path)
}

// ===========================================================================
// Tests
// ===========================================================================
