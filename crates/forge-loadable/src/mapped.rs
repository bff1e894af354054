//! Loadables derived from another loadable: mapping, validation, nullability.

use serde_json::Value;

use crate::buf::{ByteReader, ByteWriter};
use crate::error::LoadError;
use crate::loadable::Loadable;

// ---------------------------------------------------------------------------
// Xmap
// ---------------------------------------------------------------------------

/// Maps a base loadable's value through a fallible pair of functions.
#[derive(Debug, Clone)]
pub struct Xmap<L, F, B> {
    base: L,
    forward: F,
    backward: B,
}

impl<L, F, B> Xmap<L, F, B> {
    pub fn new(base: L, forward: F, backward: B) -> Self {
        Self {
            base,
            forward,
            backward,
        }
    }
}

impl<L, U, F, B> Loadable for Xmap<L, F, B>
where
    L: Loadable,
    F: Fn(L::Value) -> Result<U, String>,
    B: Fn(&U) -> Result<L::Value, String>,
{
    type Value = U;

    fn convert(&self, node: &Value, path: &str) -> Result<U, LoadError> {
        let base = self.base.convert(node, path)?;
        (self.forward)(base).map_err(|message| LoadError::custom(path, message))
    }

    fn serialize(&self, value: &U) -> Result<Value, LoadError> {
        let base = (self.backward)(value).map_err(|message| LoadError::custom("", message))?;
        self.base.serialize(&base)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<U, LoadError> {
        let base = self.base.decode(reader)?;
        (self.forward)(base).map_err(LoadError::decode)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &U) -> Result<(), LoadError> {
        let base = (self.backward)(value).map_err(|message| LoadError::custom("", message))?;
        self.base.encode(writer, &base)
    }
}

// ---------------------------------------------------------------------------
// FlatXmap
// ---------------------------------------------------------------------------

/// Like [`Xmap`], but the mapping functions produce full [`LoadError`]s.
#[derive(Debug, Clone)]
pub struct FlatXmap<L, F, B> {
    base: L,
    forward: F,
    backward: B,
}

impl<L, F, B> FlatXmap<L, F, B> {
    pub fn new(base: L, forward: F, backward: B) -> Self {
        Self {
            base,
            forward,
            backward,
        }
    }
}

impl<L, U, F, B> Loadable for FlatXmap<L, F, B>
where
    L: Loadable,
    F: Fn(L::Value, &str) -> Result<U, LoadError>,
    B: Fn(&U) -> Result<L::Value, LoadError>,
{
    type Value = U;

    fn convert(&self, node: &Value, path: &str) -> Result<U, LoadError> {
        let base = self.base.convert(node, path)?;
        (self.forward)(base, path)
    }

    fn serialize(&self, value: &U) -> Result<Value, LoadError> {
        self.base.serialize(&(self.backward)(value)?)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<U, LoadError> {
        let base = self.base.decode(reader)?;
        (self.forward)(base, "")
    }

    fn encode(&self, writer: &mut ByteWriter, value: &U) -> Result<(), LoadError> {
        self.base.encode(writer, &(self.backward)(value)?)
    }
}

// ---------------------------------------------------------------------------
// Validated
// ---------------------------------------------------------------------------

/// Applies an extra check after the base loadable succeeds, in every
/// direction.
#[derive(Debug, Clone)]
pub struct Validated<L, F> {
    base: L,
    check: F,
    message: &'static str,
}

impl<L, F> Validated<L, F> {
    pub fn new(base: L, check: F, message: &'static str) -> Self {
        Self {
            base,
            check,
            message,
        }
    }
}

impl<L, F> Loadable for Validated<L, F>
where
    L: Loadable,
    F: Fn(&L::Value) -> bool,
{
    type Value = L::Value;

    fn convert(&self, node: &Value, path: &str) -> Result<L::Value, LoadError> {
        let value = self.base.convert(node, path)?;
        if (self.check)(&value) {
            Ok(value)
        } else {
            Err(LoadError::custom(path, self.message))
        }
    }

    fn serialize(&self, value: &L::Value) -> Result<Value, LoadError> {
        if !(self.check)(value) {
            return Err(LoadError::custom("", self.message));
        }
        self.base.serialize(value)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<L::Value, LoadError> {
        let value = self.base.decode(reader)?;
        if (self.check)(&value) {
            Ok(value)
        } else {
            Err(LoadError::decode(self.message))
        }
    }

    fn encode(&self, writer: &mut ByteWriter, value: &L::Value) -> Result<(), LoadError> {
        if !(self.check)(value) {
            return Err(LoadError::custom("", self.message));
        }
        self.base.encode(writer, value)
    }
}

// ---------------------------------------------------------------------------
// NullableLoadable
// ---------------------------------------------------------------------------

/// JSON `null` is `None`; on the wire a presence flag precedes the value.
#[derive(Debug, Clone)]
pub struct NullableLoadable<L> {
    base: L,
}

impl<L> NullableLoadable<L> {
    pub fn new(base: L) -> Self {
        Self { base }
    }
}

impl<L: Loadable> Loadable for NullableLoadable<L> {
    type Value = Option<L::Value>;

    fn convert(&self, node: &Value, path: &str) -> Result<Self::Value, LoadError> {
        match node {
            Value::Null => Ok(None),
            other => self.base.convert(other, path).map(Some),
        }
    }

    fn serialize(&self, value: &Self::Value) -> Result<Value, LoadError> {
        match value {
            Some(inner) => self.base.serialize(inner),
            None => Ok(Value::Null),
        }
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, LoadError> {
        if reader.read_bool()? {
            self.base.decode(reader).map(Some)
        } else {
            Ok(None)
        }
    }

    fn encode(&self, writer: &mut ByteWriter, value: &Self::Value) -> Result<(), LoadError> {
        writer.write_bool(value.is_some());
        match value {
            Some(inner) => self.base.encode(writer, inner),
            None => Ok(()),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
