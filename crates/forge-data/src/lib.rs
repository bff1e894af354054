//! Forge Data -- data-driven definitions from files.
//!
//! Reads a directory of JSON, RON, or TOML definition files and converts each
//! one with a [`forge_loadable::Loadable`]. Reloads are fail-soft: every
//! broken file is reported alongside the definitions that did load.
//!
//! ```rust,ignore
//! let report = forge_data::reload_dir(&tool_loadable, Path::new("data/tools"))?;
//! for failure in &report.errors {
//!     eprintln!("{}: {}", failure.path.display(), failure.error);
//! }
//! let pickaxe = report.definitions.get("iron/pickaxe");
//! ```

pub mod config;
pub mod loader;
pub mod reload;

pub use config::LoaderConfig;
pub use loader::{DataFile, DataLoadError, Format};
pub use reload::{DefinitionSet, FileError, ReloadReport, reload, reload_dir};
