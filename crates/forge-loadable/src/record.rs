//! Fixed-shape records built field by field.
//!
//! A [`RecordLoadable`] holds a tuple of field descriptors. Every codec visits
//! the fields in tuple order, which is part of the binary format. The record
//! is only constructed once every field has resolved, through a single
//! validating `build` function that receives the tuple of field values.

use std::marker::PhantomData;

use serde_json::{Map, Value};

use crate::buf::{ByteReader, ByteWriter};
use crate::error::{LoadError, key_path};
use crate::loadable::Loadable;

// ---------------------------------------------------------------------------
// Field descriptors
// ---------------------------------------------------------------------------

/// One named field of record `R`.
pub trait RecordField<R> {
    type Value;

    fn key(&self) -> &'static str;

    /// Read this field from the record's JSON object.
    fn read(&self, object: &Map<String, Value>, path: &str) -> Result<Self::Value, LoadError>;

    /// Write this field of `record` into `object`, or nothing if the field
    /// is omitted.
    fn write(&self, record: &R, object: &mut Map<String, Value>) -> Result<(), LoadError>;

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, LoadError>;

    fn encode(&self, record: &R, writer: &mut ByteWriter) -> Result<(), LoadError>;
}

/// Absent keys and explicit `null` both count as "not given".
fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|node| !node.is_null())
}

/// Field that must be present.
pub struct RequiredField<R, L: Loadable> {
    key: &'static str,
    loadable: L,
    getter: fn(&R) -> &L::Value,
}

impl<R, L: Loadable> RequiredField<R, L> {
    pub fn new(key: &'static str, loadable: L, getter: fn(&R) -> &L::Value) -> Self {
        Self {
            key,
            loadable,
            getter,
        }
    }
}

impl<R, L: Loadable> RecordField<R> for RequiredField<R, L> {
    type Value = L::Value;

    fn key(&self) -> &'static str {
        self.key
    }

    fn read(&self, object: &Map<String, Value>, path: &str) -> Result<L::Value, LoadError> {
        let field_path = key_path(path, self.key);
        match object.get(self.key) {
            Some(node) => self.loadable.convert(node, &field_path),
            None => Err(LoadError::missing(field_path)),
        }
    }

    fn write(&self, record: &R, object: &mut Map<String, Value>) -> Result<(), LoadError> {
        let node = self.loadable.serialize((self.getter)(record))?;
        object.insert(self.key.to_string(), node);
        Ok(())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<L::Value, LoadError> {
        self.loadable.decode(reader)
    }

    fn encode(&self, record: &R, writer: &mut ByteWriter) -> Result<(), LoadError> {
        self.loadable.encode(writer, (self.getter)(record))
    }
}

/// Field that substitutes a default when absent. Serialization skips the
/// key while the value equals the default unless
/// [`always_serialize`](Self::always_serialize) is set. The binary form
/// always carries the value.
pub struct DefaultField<R, L: Loadable> {
    key: &'static str,
    loadable: L,
    default: L::Value,
    getter: fn(&R) -> &L::Value,
    serialize_default: bool,
}

impl<R, L> DefaultField<R, L>
where
    L: Loadable,
    L::Value: Clone + PartialEq,
{
    pub fn new(key: &'static str, loadable: L, default: L::Value, getter: fn(&R) -> &L::Value) -> Self {
        Self {
            key,
            loadable,
            default,
            getter,
            serialize_default: false,
        }
    }

    /// Keep the key in serialized output even when it holds the default.
    pub fn always_serialize(mut self) -> Self {
        self.serialize_default = true;
        self
    }
}

impl<R, L> RecordField<R> for DefaultField<R, L>
where
    L: Loadable,
    L::Value: Clone + PartialEq,
{
    type Value = L::Value;

    fn key(&self) -> &'static str {
        self.key
    }

    fn read(&self, object: &Map<String, Value>, path: &str) -> Result<L::Value, LoadError> {
        match lookup(object, self.key) {
            Some(node) => self.loadable.convert(node, &key_path(path, self.key)),
            None => Ok(self.default.clone()),
        }
    }

    fn write(&self, record: &R, object: &mut Map<String, Value>) -> Result<(), LoadError> {
        let value = (self.getter)(record);
        if self.serialize_default || *value != self.default {
            object.insert(self.key.to_string(), self.loadable.serialize(value)?);
        }
        Ok(())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<L::Value, LoadError> {
        self.loadable.decode(reader)
    }

    fn encode(&self, record: &R, writer: &mut ByteWriter) -> Result<(), LoadError> {
        self.loadable.encode(writer, (self.getter)(record))
    }
}

/// Field whose absence is `None`. On the wire a presence flag precedes the
/// value.
pub struct NullableField<R, L: Loadable> {
    key: &'static str,
    loadable: L,
    getter: fn(&R) -> Option<&L::Value>,
}

impl<R, L: Loadable> NullableField<R, L> {
    pub fn new(key: &'static str, loadable: L, getter: fn(&R) -> Option<&L::Value>) -> Self {
        Self {
            key,
            loadable,
            getter,
        }
    }
}

impl<R, L: Loadable> RecordField<R> for NullableField<R, L> {
    type Value = Option<L::Value>;

    fn key(&self) -> &'static str {
        self.key
    }

    fn read(&self, object: &Map<String, Value>, path: &str) -> Result<Self::Value, LoadError> {
        lookup(object, self.key)
            .map(|node| self.loadable.convert(node, &key_path(path, self.key)))
            .transpose()
    }

    fn write(&self, record: &R, object: &mut Map<String, Value>) -> Result<(), LoadError> {
        if let Some(value) = (self.getter)(record) {
            object.insert(self.key.to_string(), self.loadable.serialize(value)?);
        }
        Ok(())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<Self::Value, LoadError> {
        if reader.read_bool()? {
            self.loadable.decode(reader).map(Some)
        } else {
            Ok(None)
        }
    }

    fn encode(&self, record: &R, writer: &mut ByteWriter) -> Result<(), LoadError> {
        let value = (self.getter)(record);
        writer.write_bool(value.is_some());
        match value {
            Some(inner) => self.loadable.encode(writer, inner),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Field tuples
// ---------------------------------------------------------------------------

/// An ordered tuple of [`RecordField`]s for record `R`.
pub trait RecordFields<R> {
    /// Tuple of the fields' values, in field order.
    type Values;

    fn read_all(&self, object: &Map<String, Value>, path: &str) -> Result<Self::Values, LoadError>;

    fn write_all(&self, record: &R, object: &mut Map<String, Value>) -> Result<(), LoadError>;

    fn decode_all(&self, reader: &mut ByteReader<'_>) -> Result<Self::Values, LoadError>;

    fn encode_all(&self, record: &R, writer: &mut ByteWriter) -> Result<(), LoadError>;

    fn keys(&self) -> Vec<&'static str>;
}

// Tuple expressions evaluate left to right, which fixes the visiting order.
macro_rules! impl_record_fields {
    ($($field:ident $idx:tt),+) => {
        impl<R, $($field: RecordField<R>),+> RecordFields<R> for ($($field,)+) {
            type Values = ($($field::Value,)+);

            fn read_all(&self, object: &Map<String, Value>, path: &str) -> Result<Self::Values, LoadError> {
                Ok(($(self.$idx.read(object, path)?,)+))
            }

            fn write_all(&self, record: &R, object: &mut Map<String, Value>) -> Result<(), LoadError> {
                $(self.$idx.write(record, object)?;)+
                Ok(())
            }

            fn decode_all(&self, reader: &mut ByteReader<'_>) -> Result<Self::Values, LoadError> {
                Ok(($(self.$idx.decode(reader)?,)+))
            }

            fn encode_all(&self, record: &R, writer: &mut ByteWriter) -> Result<(), LoadError> {
                $(self.$idx.encode(record, writer)?;)+
                Ok(())
            }

            fn keys(&self) -> Vec<&'static str> {
                vec![$(self.$idx.key()),+]
            }
        }
    };
}

impl_record_fields!(A 0);
impl_record_fields!(A 0, B 1);
impl_record_fields!(A 0, B 1, C 2);
impl_record_fields!(A 0, B 1, C 2, D 3);
impl_record_fields!(A 0, B 1, C 2, D 3, E 4);
impl_record_fields!(A 0, B 1, C 2, D 3, E 4, F 5);
impl_record_fields!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_record_fields!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

// ---------------------------------------------------------------------------
// RecordLoadable
// ---------------------------------------------------------------------------

/// Loadable for a record made of a fixed tuple of fields.
pub struct RecordLoadable<R, F, B> {
    fields: F,
    build: B,
    _record: PhantomData<fn() -> R>,
}

impl<R, F, B> RecordLoadable<R, F, B>
where
    F: RecordFields<R>,
    B: Fn(F::Values) -> Result<R, String>,
{
    /// `build` receives every field value in field order and may reject the
    /// combination.
    pub fn new(fields: F, build: B) -> Self {
        Self {
            fields,
            build,
            _record: PhantomData,
        }
    }

    /// Field keys in codec order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.fields.keys()
    }

    /// Read the record from an already-unwrapped object. Registries use this
    /// to share one object between the type key and the variant fields.
    pub fn convert_object(&self, object: &Map<String, Value>, path: &str) -> Result<R, LoadError> {
        let values = self.fields.read_all(object, path)?;
        (self.build)(values).map_err(|message| LoadError::custom(path, message))
    }
}

impl<R, F, B> Loadable for RecordLoadable<R, F, B>
where
    F: RecordFields<R>,
    B: Fn(F::Values) -> Result<R, String>,
{
    type Value = R;

    fn convert(&self, node: &Value, path: &str) -> Result<R, LoadError> {
        let object = node
            .as_object()
            .ok_or_else(|| LoadError::wrong_type(path, "object", node))?;
        self.convert_object(object, path)
    }

    fn serialize(&self, value: &R) -> Result<Value, LoadError> {
        let mut object = Map::new();
        self.fields.write_all(value, &mut object)?;
        Ok(Value::Object(object))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<R, LoadError> {
        let values = self.fields.decode_all(reader)?;
        (self.build)(values).map_err(LoadError::decode)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &R) -> Result<(), LoadError> {
        self.fields.encode_all(value, writer)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use crate::loadable::{LoadableExt, decode_from_slice, encode_to_vec};
    use crate::primitive::{FloatLoadable, IntLoadable, TextLoadable};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Leveling {
        flat: f32,
        each_level: f32,
    }

    fn leveling() -> impl Loadable<Value = Leveling> {
        RecordLoadable::new(
            (
                FloatLoadable::ANY.default_field("flat", 0.0, |l: &Leveling| &l.flat),
                FloatLoadable::ANY.default_field("each_level", 0.0, |l: &Leveling| &l.each_level),
            ),
            |(flat, each_level)| Ok(Leveling { flat, each_level }),
        )
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Material {
        name: String,
        tier: i32,
        display: Option<String>,
    }

    fn material() -> impl Loadable<Value = Material> {
        RecordLoadable::new(
            (
                TextLoadable::NON_EMPTY.required_field("name", |m: &Material| &m.name),
                IntLoadable::range(0, 4).default_field("tier", 0, |m: &Material| &m.tier),
                TextLoadable::ANY.nullable_field("display", |m: &Material| m.display.as_ref()),
            ),
            |(name, tier, display)| {
                if name == "bedrock" && tier < 4 {
                    return Err("bedrock must be tier 4".to_string());
                }
                Ok(Material {
                    name,
                    tier,
                    display,
                })
            },
        )
    }

    #[test]
    fn empty_object_yields_defaults() {
        let value = leveling().convert(&json!({}), "").unwrap();
        assert_eq!(value, Leveling { flat: 0.0, each_level: 0.0 });
    }

    #[test]
    fn defaults_are_omitted_when_serializing() {
        let zero = Leveling { flat: 0.0, each_level: 0.0 };
        assert_eq!(leveling().serialize(&zero).unwrap(), json!({}));
        let partial = Leveling { flat: 0.0, each_level: 1.5 };
        assert_eq!(leveling().serialize(&partial).unwrap(), json!({"each_level": 1.5}));
    }

    #[test]
    fn always_serialize_keeps_default() {
        let loadable = RecordLoadable::new(
            (FloatLoadable::ANY
                .default_field("flat", 0.0, |l: &Leveling| &l.flat)
                .always_serialize(),),
            |(flat,)| Ok(Leveling { flat, each_level: 0.0 }),
        );
        let zero = Leveling { flat: 0.0, each_level: 0.0 };
        assert_eq!(loadable.serialize(&zero).unwrap(), json!({"flat": 0.0}));
    }

    #[test]
    fn missing_required_field_reports_path() {
        let err = material().convert(&json!({"tier": 1}), "materials[3]").unwrap_err();
        assert_eq!(err.path, "materials[3].name");
        assert_eq!(err.kind, LoadErrorKind::Missing);
    }

    #[test]
    fn nullable_field_absent_and_null() {
        let m = material().convert(&json!({"name": "iron"}), "").unwrap();
        assert_eq!(m.display, None);
        let m = material()
            .convert(&json!({"name": "iron", "display": null}), "")
            .unwrap();
        assert_eq!(m.display, None);
        assert_eq!(material().serialize(&m).unwrap(), json!({"name": "iron"}));
    }

    #[test]
    fn build_rejection_is_a_load_error() {
        let err = material()
            .convert(&json!({"name": "bedrock", "tier": 2}), "material")
            .unwrap_err();
        assert_eq!(err.to_string(), "material: bedrock must be tier 4");
    }

    #[test]
    fn nested_field_error_path() {
        let err = material()
            .convert(&json!({"name": "iron", "tier": 9}), "materials[0]")
            .unwrap_err();
        assert_eq!(err.path, "materials[0].tier");
    }

    #[test]
    fn binary_follows_field_order() {
        let m = Material {
            name: "gold".to_string(),
            tier: 2,
            display: None,
        };
        let bytes = encode_to_vec(&material(), &m).unwrap();
        // name: len 4 + "gold", tier: var-int 2, display: absent flag
        assert_eq!(bytes, vec![4, b'g', b'o', b'l', b'd', 2, 0]);
        assert_eq!(decode_from_slice(&material(), &bytes).unwrap(), m);
    }

    #[test]
    fn binary_carries_default_values() {
        let zero = Leveling { flat: 0.0, each_level: 0.0 };
        let bytes = encode_to_vec(&leveling(), &zero).unwrap();
        assert_eq!(bytes.len(), 8);
    }

    #[test]
    fn keys_are_in_declaration_order() {
        let loadable = RecordLoadable::new(
            (
                TextLoadable::NON_EMPTY.required_field("name", |m: &Material| &m.name),
                IntLoadable::ANY.default_field("tier", 0, |m: &Material| &m.tier),
                TextLoadable::ANY.nullable_field("display", |m: &Material| m.display.as_ref()),
            ),
            |(name, tier, display)| Ok(Material { name, tier, display }),
        );
        assert_eq!(loadable.keys(), vec!["name", "tier", "display"]);
    }
}
