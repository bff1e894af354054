//! Forge Loadable -- declarative two-way codecs for game data.
//!
//! A [`Loadable`] converts one type between a JSON tree (data files), a
//! compact binary form (network sync), and the typed value, applying the
//! same validation in every direction.
//!
//! # Building blocks
//!
//! - [`primitive`] -- booleans, ranged integers and floats, strings, and
//!   fixed name tables.
//! - [`collection`] -- lists (optionally compact) and string-keyed maps, each
//!   with a minimum size.
//! - [`record`] -- fixed-shape records: a tuple of required, default, and
//!   nullable fields plus one `build` function.
//! - [`registry`] -- tagged unions dispatched by a `"type"` key, including
//!   singleton and self-nesting variants.
//! - [`predicate`] -- the generic `and` / `or` / `inverted` combinators for
//!   predicate unions.
//! - [`mapped`] -- `xmap`, `flat_xmap`, `validate`, and `nullable` adapters.
//!
//! # Errors
//!
//! Every failure is a [`LoadError`] carrying the path of the offending node,
//! e.g. `modifiers[2].formula[4]`. Binary errors carry no path.
//!
//! ```rust,ignore
//! let leveling = RecordLoadable::new(
//!     (
//!         FloatLoadable::ANY.default_field("flat", 0.0, |l: &Leveling| &l.flat),
//!         FloatLoadable::ANY.default_field("each_level", 0.0, |l: &Leveling| &l.each_level),
//!     ),
//!     |(flat, each_level)| Ok(Leveling { flat, each_level }),
//! );
//! let value = leveling.convert(&json!({"flat": 1.0}), "bonus")?;
//! ```

pub mod buf;
pub mod collection;
pub mod error;
pub mod loadable;
pub mod mapped;
pub mod predicate;
pub mod primitive;
pub mod record;
pub mod registry;

pub use buf::{ByteReader, ByteWriter};
pub use error::{LoadError, LoadErrorKind};
pub use loadable::{Loadable, LoadableExt, StringLoadable, decode_from_slice, encode_to_vec};
pub use predicate::{Predicate, PredicateUnion};
pub use primitive::{BoolLoadable, FloatLoadable, IntLoadable, NamedEnumLoadable, TextLoadable};
pub use record::RecordLoadable;
pub use registry::{GenericLoaderRegistry, RegistryBuilder, RegistryError, RegistryHandle, TYPE_KEY};
