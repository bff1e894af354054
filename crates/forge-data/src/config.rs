//! Loader configuration.
//!
//! A data directory may carry a `forge.json`, `forge.ron`, or `forge.toml`
//! at its root. The file is read through the same loadable machinery as
//! every other definition and is skipped when the directory is scanned.

use std::path::Path;

use forge_loadable::{BoolLoadable, Loadable, LoadableExt, RecordLoadable, TextLoadable};

use crate::loader::{self, DataLoadError, Format};

/// Base name of the configuration file at a data directory's root.
pub const CONFIG_NAME: &str = "forge";

/// How a data directory is scanned and reloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// File extensions read as definitions, without the leading dot.
    pub extensions: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Abort a reload at the first failing file instead of collecting every
    /// failure.
    pub fail_fast: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            recursive: true,
            fail_fast: false,
        }
    }
}

fn default_extensions() -> Vec<String> {
    Format::ALL
        .iter()
        .map(|format| format.extension().to_string())
        .collect()
}

fn is_known_extension(extension: &str) -> bool {
    Format::ALL.iter().any(|format| format.extension() == extension)
}

impl LoaderConfig {
    /// Codec for the configuration file.
    ///
    /// `extensions` may be written as a single string or a list, and every
    /// entry must name a supported format.
    pub fn loadable() -> impl Loadable<Value = LoaderConfig> {
        RecordLoadable::new(
            (
                TextLoadable::NON_EMPTY
                    .compact_list(1)
                    .validate(
                        |extensions: &Vec<String>| {
                            extensions.iter().all(|extension| is_known_extension(extension))
                        },
                        "extensions must be json, ron, or toml",
                    )
                    .default_field("extensions", default_extensions(), |c: &LoaderConfig| {
                        &c.extensions
                    }),
                BoolLoadable.default_field("recursive", true, |c: &LoaderConfig| &c.recursive),
                BoolLoadable.default_field("fail_fast", false, |c: &LoaderConfig| &c.fail_fast),
            ),
            |(extensions, recursive, fail_fast)| {
                Ok(LoaderConfig {
                    extensions,
                    recursive,
                    fail_fast,
                })
            },
        )
    }

    /// Read a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, DataLoadError> {
        loader::load_file(&Self::loadable(), path)
    }

    /// Read `dir/forge.{json,ron,toml}`, or the defaults if there is none.
    pub fn find_in(dir: &Path) -> Result<Self, DataLoadError> {
        match loader::find_data_file(dir, CONFIG_NAME)? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "reading loader config");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "forge_config_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn empty_object_is_default() {
        let config = LoaderConfig::loadable().convert(&json!({}), "").unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.extensions, vec!["json", "ron", "toml"]);
    }

    #[test]
    fn defaults_are_omitted_when_serialized() {
        let loadable = LoaderConfig::loadable();
        assert_eq!(loadable.serialize(&LoaderConfig::default()).unwrap(), json!({}));

        let config = LoaderConfig {
            fail_fast: true,
            ..LoaderConfig::default()
        };
        assert_eq!(loadable.serialize(&config).unwrap(), json!({"fail_fast": true}));
    }

    #[test]
    fn single_extension_may_be_bare() {
        let config = LoaderConfig::loadable()
            .convert(&json!({"extensions": "ron", "recursive": false}), "")
            .unwrap();
        assert_eq!(config.extensions, vec!["ron"]);
        assert!(!config.recursive);
        assert!(config.accepts_extension("ron"));
        assert!(!config.accepts_extension("json"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = LoaderConfig::loadable()
            .convert(&json!({"extensions": ["json", "yaml"]}), "")
            .unwrap_err();
        assert_eq!(err.path, "extensions");
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let err = LoaderConfig::loadable()
            .convert(&json!({"extensions": []}), "")
            .unwrap_err();
        assert_eq!(err.path, "extensions");
    }

    #[test]
    fn find_in_reads_toml() {
        let dir = make_test_dir("find_toml");
        fs::write(dir.join("forge.toml"), "extensions = [\"json\"]\nfail_fast = true\n").unwrap();

        let config = LoaderConfig::find_in(&dir).unwrap();
        assert_eq!(config.extensions, vec!["json"]);
        assert!(config.fail_fast);
        assert!(config.recursive);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn find_in_without_file_is_default() {
        let dir = make_test_dir("find_none");
        assert_eq!(LoaderConfig::find_in(&dir).unwrap(), LoaderConfig::default());
        let _ = fs::remove_dir_all(&dir);
    }
}
