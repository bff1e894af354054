//! Sequence and map loadables with a minimum size.
//!
//! Both sides are count-prefixed on the wire (`var-int count` followed by
//! each element) and use JSON arrays / objects in text.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::buf::{ByteReader, ByteWriter};
use crate::error::{LoadError, LoadErrorKind, index_path, key_path};
use crate::loadable::{Loadable, StringLoadable};

fn check_size(found: usize, min: usize, path: &str) -> Result<(), LoadError> {
    if found < min {
        return Err(LoadError::new(path, LoadErrorKind::TooFew { min, found }));
    }
    Ok(())
}

/// Read a count and bound the up-front allocation by what the buffer can
/// possibly hold (every element takes at least one byte).
fn read_count(reader: &mut ByteReader<'_>, min: usize) -> Result<usize, LoadError> {
    let count = reader.read_len()?;
    if count < min {
        return Err(LoadError::decode(format!(
            "expected at least {min} elements, found {count}"
        )));
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// ListLoadable
// ---------------------------------------------------------------------------

/// `Vec<T>` as a JSON array.
#[derive(Debug, Clone)]
pub struct ListLoadable<L> {
    element: L,
    min_size: usize,
}

impl<L> ListLoadable<L> {
    pub fn new(element: L, min_size: usize) -> Self {
        Self { element, min_size }
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }
}

impl<L: Loadable> ListLoadable<L> {
    fn convert_elements(&self, items: &[Value], path: &str) -> Result<Vec<L::Value>, LoadError> {
        check_size(items.len(), self.min_size, path)?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.element.convert(item, &index_path(path, i)))
            .collect()
    }

    fn decode_elements(&self, reader: &mut ByteReader<'_>) -> Result<Vec<L::Value>, LoadError> {
        let count = read_count(reader, self.min_size)?;
        let mut out = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            out.push(self.element.decode(reader)?);
        }
        Ok(out)
    }

    fn encode_elements(&self, writer: &mut ByteWriter, value: &[L::Value]) -> Result<(), LoadError> {
        check_size(value.len(), self.min_size, "")?;
        writer.write_len(value.len())?;
        for item in value {
            self.element.encode(writer, item)?;
        }
        Ok(())
    }
}

impl<L: Loadable> Loadable for ListLoadable<L> {
    type Value = Vec<L::Value>;

    fn convert(&self, node: &Value, path: &str) -> Result<Self::Value, LoadError> {
        let items = node
            .as_array()
            .ok_or_else(|| LoadError::wrong_type(path, "array", node))?;
        self.convert_elements(items, path)
    }

    fn serialize(&self, value: &Self::Value) -> Result<Value, LoadError> {
        check_size(value.len(), self.min_size, "")?;
        value
            .iter()
            .map(|item| self.element.serialize(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, LoadError> {
        self.decode_elements(reader)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &Self::Value) -> Result<(), LoadError> {
        self.encode_elements(writer, value)
    }
}

// ---------------------------------------------------------------------------
// CompactListLoadable
// ---------------------------------------------------------------------------

/// A list that also accepts a single bare element, and writes a one-element
/// list bare when the element itself is not an array. Binary form matches
/// [`ListLoadable`].
#[derive(Debug, Clone)]
pub struct CompactListLoadable<L> {
    inner: ListLoadable<L>,
}

impl<L> CompactListLoadable<L> {
    pub fn new(element: L, min_size: usize) -> Self {
        Self {
            inner: ListLoadable::new(element, min_size),
        }
    }
}

impl<L: Loadable> Loadable for CompactListLoadable<L> {
    type Value = Vec<L::Value>;

    fn convert(&self, node: &Value, path: &str) -> Result<Self::Value, LoadError> {
        match node {
            Value::Array(items) => self.inner.convert_elements(items, path),
            single => {
                let value = self.inner.element.convert(single, path)?;
                check_size(1, self.inner.min_size, path)?;
                Ok(vec![value])
            }
        }
    }

    fn serialize(&self, value: &Self::Value) -> Result<Value, LoadError> {
        if let [only] = value.as_slice() {
            let node = self.inner.element.serialize(only)?;
            if !node.is_array() {
                check_size(1, self.inner.min_size, "")?;
                return Ok(node);
            }
        }
        self.inner.serialize(value)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, LoadError> {
        self.inner.decode_elements(reader)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &Self::Value) -> Result<(), LoadError> {
        self.inner.encode_elements(writer, value)
    }
}

// ---------------------------------------------------------------------------
// MapLoadable
// ---------------------------------------------------------------------------

/// `BTreeMap<K, V>` as a JSON object. Entries are visited in key order, so
/// the binary form is deterministic.
#[derive(Debug, Clone)]
pub struct MapLoadable<K, V> {
    keys: K,
    values: V,
    min_size: usize,
}

impl<K, V> MapLoadable<K, V> {
    pub fn new(keys: K, values: V, min_size: usize) -> Self {
        Self {
            keys,
            values,
            min_size,
        }
    }
}

impl<K, V> Loadable for MapLoadable<K, V>
where
    K: StringLoadable,
    K::Value: Ord,
    V: Loadable,
{
    type Value = BTreeMap<K::Value, V::Value>;

    fn convert(&self, node: &Value, path: &str) -> Result<Self::Value, LoadError> {
        let object = node
            .as_object()
            .ok_or_else(|| LoadError::wrong_type(path, "object", node))?;
        check_size(object.len(), self.min_size, path)?;
        let mut out = BTreeMap::new();
        for (key, entry) in object {
            let entry_path = key_path(path, key);
            let parsed_key = self.keys.parse_string(key, &entry_path)?;
            let parsed_value = self.values.convert(entry, &entry_path)?;
            if out.insert(parsed_key, parsed_value).is_some() {
                return Err(LoadError::custom(entry_path, "duplicate map key"));
            }
        }
        Ok(out)
    }

    fn serialize(&self, value: &Self::Value) -> Result<Value, LoadError> {
        check_size(value.len(), self.min_size, "")?;
        let mut object = Map::new();
        for (key, entry) in value {
            object.insert(self.keys.to_key_string(key)?, self.values.serialize(entry)?);
        }
        Ok(Value::Object(object))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, LoadError> {
        let count = read_count(reader, self.min_size)?;
        let mut out = BTreeMap::new();
        for _ in 0..count {
            let key = self.keys.decode(reader)?;
            let entry = self.values.decode(reader)?;
            if out.insert(key, entry).is_some() {
                return Err(LoadError::decode("duplicate map key"));
            }
        }
        Ok(out)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &Self::Value) -> Result<(), LoadError> {
        check_size(value.len(), self.min_size, "")?;
        writer.write_len(value.len())?;
        for (key, entry) in value {
            self.keys.encode(writer, key)?;
            self.values.encode(writer, entry)?;
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
