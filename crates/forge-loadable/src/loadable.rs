//! The [`Loadable`] capability and its combinators.
//!
//! A loadable knows how to move one type between three representations: a
//! JSON tree, a binary buffer, and the typed in-memory value. Loadables are
//! stateless and immutable once built, so a single instance can be shared by
//! every record and registry that needs it.

use std::sync::Arc;

use serde_json::Value;

use crate::buf::{ByteReader, ByteWriter};
use crate::collection::{CompactListLoadable, ListLoadable, MapLoadable};
use crate::error::LoadError;
use crate::mapped::{FlatXmap, NullableLoadable, Validated, Xmap};
use crate::record::{DefaultField, NullableField, RequiredField};

// ---------------------------------------------------------------------------
// Core traits
// ---------------------------------------------------------------------------

/// Two-way conversion between JSON, binary, and a typed value.
pub trait Loadable {
    type Value;

    /// Parse a JSON node. `path` locates the node for error messages.
    fn convert(&self, node: &Value, path: &str) -> Result<Self::Value, LoadError>;

    /// Inverse of [`convert`](Self::convert). Fails instead of emitting
    /// output that `convert` would reject.
    fn serialize(&self, value: &Self::Value) -> Result<Value, LoadError>;

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, LoadError>;

    fn encode(&self, writer: &mut ByteWriter, value: &Self::Value) -> Result<(), LoadError>;
}

/// A loadable that can also be read from a bare string, which lets it key a
/// map.
pub trait StringLoadable: Loadable {
    fn parse_string(&self, text: &str, path: &str) -> Result<Self::Value, LoadError>;

    fn to_key_string(&self, value: &Self::Value) -> Result<String, LoadError>;
}

// ---------------------------------------------------------------------------
// Shared ownership
// ---------------------------------------------------------------------------

macro_rules! forward_loadable {
    ($($wrapper:ty),+) => {$(
        impl<L: Loadable + ?Sized> Loadable for $wrapper {
            type Value = L::Value;

            fn convert(&self, node: &Value, path: &str) -> Result<L::Value, LoadError> {
                (**self).convert(node, path)
            }

            fn serialize(&self, value: &L::Value) -> Result<Value, LoadError> {
                (**self).serialize(value)
            }

            fn decode(&self, reader: &mut ByteReader<'_>) -> Result<L::Value, LoadError> {
                (**self).decode(reader)
            }

            fn encode(&self, writer: &mut ByteWriter, value: &L::Value) -> Result<(), LoadError> {
                (**self).encode(writer, value)
            }
        }

        impl<L: StringLoadable + ?Sized> StringLoadable for $wrapper {
            fn parse_string(&self, text: &str, path: &str) -> Result<L::Value, LoadError> {
                (**self).parse_string(text, path)
            }

            fn to_key_string(&self, value: &L::Value) -> Result<String, LoadError> {
                (**self).to_key_string(value)
            }
        }
    )+};
}

forward_loadable!(&L, Box<L>, Arc<L>);

// ---------------------------------------------------------------------------
// Convenience entry points
// ---------------------------------------------------------------------------

/// Encode a value into a fresh buffer.
pub fn encode_to_vec<L: Loadable + ?Sized>(
    loadable: &L,
    value: &L::Value,
) -> Result<Vec<u8>, LoadError> {
    let mut writer = ByteWriter::new();
    loadable.encode(&mut writer, value)?;
    Ok(writer.into_bytes())
}

/// Decode a value that must span the whole buffer.
pub fn decode_from_slice<L: Loadable + ?Sized>(
    loadable: &L,
    bytes: &[u8],
) -> Result<L::Value, LoadError> {
    let mut reader = ByteReader::new(bytes);
    let value = loadable.decode(&mut reader)?;
    if !reader.is_exhausted() {
        return Err(LoadError::decode(format!(
            "{} trailing bytes after value",
            reader.remaining()
        )));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Builders for derived loadables and record fields.
pub trait LoadableExt: Loadable + Sized {
    /// Derive a loadable for `U`. `forward` may reject a value; the message
    /// is reported at the node's path.
    fn xmap<U, F, B>(self, forward: F, backward: B) -> Xmap<Self, F, B>
    where
        F: Fn(Self::Value) -> Result<U, String>,
        B: Fn(&U) -> Result<Self::Value, String>,
    {
        Xmap::new(self, forward, backward)
    }

    /// Like [`xmap`](Self::xmap), but `forward` builds its own path-carrying
    /// error.
    fn flat_xmap<U, F, B>(self, forward: F, backward: B) -> FlatXmap<Self, F, B>
    where
        F: Fn(Self::Value, &str) -> Result<U, LoadError>,
        B: Fn(&U) -> Result<Self::Value, LoadError>,
    {
        FlatXmap::new(self, forward, backward)
    }

    /// Reject values failing `check` with `message`.
    fn validate<F>(self, check: F, message: &'static str) -> Validated<Self, F>
    where
        F: Fn(&Self::Value) -> bool,
    {
        Validated::new(self, check, message)
    }

    /// `null` (or binary absence flag) maps to `None`.
    fn nullable(self) -> NullableLoadable<Self> {
        NullableLoadable::new(self)
    }

    /// A JSON array of at least `min_size` elements.
    fn list(self, min_size: usize) -> ListLoadable<Self> {
        ListLoadable::new(self, min_size)
    }

    /// Like [`list`](Self::list), but a single element may be written bare.
    fn compact_list(self, min_size: usize) -> CompactListLoadable<Self> {
        CompactListLoadable::new(self, min_size)
    }

    /// A JSON object keyed by this loadable with `values` as entries.
    fn map_with_values<V: Loadable>(self, values: V, min_size: usize) -> MapLoadable<Self, V>
    where
        Self: StringLoadable,
        Self::Value: Ord,
    {
        MapLoadable::new(self, values, min_size)
    }

    /// Record field that must be present.
    fn required_field<R>(
        self,
        key: &'static str,
        getter: fn(&R) -> &Self::Value,
    ) -> RequiredField<R, Self> {
        RequiredField::new(key, self, getter)
    }

    /// Record field that falls back to `default` when absent, and is left
    /// out of serialized output when equal to it.
    fn default_field<R>(
        self,
        key: &'static str,
        default: Self::Value,
        getter: fn(&R) -> &Self::Value,
    ) -> DefaultField<R, Self>
    where
        Self::Value: Clone + PartialEq,
    {
        DefaultField::new(key, self, default, getter)
    }

    /// Record field whose absence is `None`.
    fn nullable_field<R>(
        self,
        key: &'static str,
        getter: fn(&R) -> Option<&Self::Value>,
    ) -> NullableField<R, Self> {
        NullableField::new(key, self, getter)
    }
}

impl<L: Loadable> LoadableExt for L {}
