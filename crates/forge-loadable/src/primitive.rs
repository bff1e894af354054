//! Loadables for scalars: booleans, ranged integers and floats, strings,
//! and fixed name tables.

use serde_json::{Number, Value};

use crate::buf::{ByteReader, ByteWriter};
use crate::error::{LoadError, LoadErrorKind};
use crate::loadable::{Loadable, StringLoadable};

// ---------------------------------------------------------------------------
// Bool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolLoadable;

impl Loadable for BoolLoadable {
    type Value = bool;

    fn convert(&self, node: &Value, path: &str) -> Result<bool, LoadError> {
        node.as_bool()
            .ok_or_else(|| LoadError::wrong_type(path, "boolean", node))
    }

    fn serialize(&self, value: &bool) -> Result<Value, LoadError> {
        Ok(Value::Bool(*value))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<bool, LoadError> {
        reader.read_bool()
    }

    fn encode(&self, writer: &mut ByteWriter, value: &bool) -> Result<(), LoadError> {
        writer.write_bool(*value);
        Ok(())
    }
}

impl StringLoadable for BoolLoadable {
    fn parse_string(&self, text: &str, path: &str) -> Result<bool, LoadError> {
        match text {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(LoadError::unknown_name(path, "boolean", other)),
        }
    }

    fn to_key_string(&self, value: &bool) -> Result<String, LoadError> {
        Ok(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Int
// ---------------------------------------------------------------------------

/// An `i32` within an inclusive range. Var-int on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLoadable {
    pub min: i32,
    pub max: i32,
}

impl IntLoadable {
    pub const ANY: Self = Self::range(i32::MIN, i32::MAX);
    pub const NON_NEGATIVE: Self = Self::range(0, i32::MAX);
    pub const POSITIVE: Self = Self::range(1, i32::MAX);

    pub const fn range(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    fn check(&self, value: i32, path: &str) -> Result<i32, LoadError> {
        if value < self.min || value > self.max {
            return Err(LoadError::new(
                path,
                LoadErrorKind::OutOfRange {
                    value: value.to_string(),
                    min: self.min.to_string(),
                    max: self.max.to_string(),
                },
            ));
        }
        Ok(value)
    }
}

impl Loadable for IntLoadable {
    type Value = i32;

    fn convert(&self, node: &Value, path: &str) -> Result<i32, LoadError> {
        let raw = node
            .as_i64()
            .ok_or_else(|| LoadError::wrong_type(path, "integer", node))?;
        let value = i32::try_from(raw).map_err(|_| {
            LoadError::new(
                path,
                LoadErrorKind::OutOfRange {
                    value: raw.to_string(),
                    min: self.min.to_string(),
                    max: self.max.to_string(),
                },
            )
        })?;
        self.check(value, path)
    }

    fn serialize(&self, value: &i32) -> Result<Value, LoadError> {
        self.check(*value, "")?;
        Ok(Value::from(*value))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<i32, LoadError> {
        let value = reader.read_var_int()?;
        self.check(value, "")
            .map_err(|e| LoadError::decode(e.kind.to_string()))
    }

    fn encode(&self, writer: &mut ByteWriter, value: &i32) -> Result<(), LoadError> {
        self.check(*value, "")?;
        writer.write_var_int(*value);
        Ok(())
    }
}

impl StringLoadable for IntLoadable {
    fn parse_string(&self, text: &str, path: &str) -> Result<i32, LoadError> {
        let value = text
            .parse::<i32>()
            .map_err(|_| LoadError::custom(path, format!("'{text}' is not an integer")))?;
        self.check(value, path)
    }

    fn to_key_string(&self, value: &i32) -> Result<String, LoadError> {
        self.check(*value, "")?;
        Ok(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Float
// ---------------------------------------------------------------------------

/// An `f32` within an inclusive range. NaN is always rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLoadable {
    pub min: f32,
    pub max: f32,
}

impl FloatLoadable {
    pub const ANY: Self = Self::range(f32::NEG_INFINITY, f32::INFINITY);
    pub const NON_NEGATIVE: Self = Self::range(0.0, f32::INFINITY);
    pub const FINITE: Self = Self::range(f32::MIN, f32::MAX);

    pub const fn range(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn check(&self, value: f32, path: &str) -> Result<f32, LoadError> {
        if value.is_nan() || value < self.min || value > self.max {
            return Err(LoadError::new(
                path,
                LoadErrorKind::OutOfRange {
                    value: value.to_string(),
                    min: self.min.to_string(),
                    max: self.max.to_string(),
                },
            ));
        }
        Ok(value)
    }
}

impl Loadable for FloatLoadable {
    type Value = f32;

    fn convert(&self, node: &Value, path: &str) -> Result<f32, LoadError> {
        let raw = node
            .as_f64()
            .ok_or_else(|| LoadError::wrong_type(path, "number", node))?;
        let value = raw as f32;
        if value.is_infinite() && raw.is_finite() {
            return Err(LoadError::new(
                path,
                LoadErrorKind::OutOfRange {
                    value: raw.to_string(),
                    min: f32::MIN.to_string(),
                    max: f32::MAX.to_string(),
                },
            ));
        }
        self.check(value, path)
    }

    fn serialize(&self, value: &f32) -> Result<Value, LoadError> {
        self.check(*value, "")?;
        Number::from_f64(f64::from(*value))
            .map(Value::Number)
            .ok_or_else(|| LoadError::custom("", format!("{value} has no JSON representation")))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<f32, LoadError> {
        let value = reader.read_f32()?;
        self.check(value, "")
            .map_err(|e| LoadError::decode(e.kind.to_string()))
    }

    fn encode(&self, writer: &mut ByteWriter, value: &f32) -> Result<(), LoadError> {
        self.check(*value, "")?;
        writer.write_f32(*value);
        Ok(())
    }
}

impl StringLoadable for FloatLoadable {
    fn parse_string(&self, text: &str, path: &str) -> Result<f32, LoadError> {
        let value = text
            .parse::<f32>()
            .map_err(|_| LoadError::custom(path, format!("'{text}' is not a number")))?;
        self.check(value, path)
    }

    fn to_key_string(&self, value: &f32) -> Result<String, LoadError> {
        self.check(*value, "")?;
        Ok(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// A UTF-8 string, optionally required to be non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLoadable {
    pub allow_empty: bool,
}

impl TextLoadable {
    pub const ANY: Self = Self { allow_empty: true };
    pub const NON_EMPTY: Self = Self { allow_empty: false };

    fn check(&self, value: &str, path: &str) -> Result<(), LoadError> {
        if !self.allow_empty && value.is_empty() {
            return Err(LoadError::custom(path, "string must not be empty"));
        }
        Ok(())
    }
}

impl Loadable for TextLoadable {
    type Value = String;

    fn convert(&self, node: &Value, path: &str) -> Result<String, LoadError> {
        let text = node
            .as_str()
            .ok_or_else(|| LoadError::wrong_type(path, "string", node))?;
        self.parse_string(text, path)
    }

    fn serialize(&self, value: &String) -> Result<Value, LoadError> {
        self.check(value, "")?;
        Ok(Value::String(value.clone()))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<String, LoadError> {
        let value = reader.read_string()?;
        self.check(&value, "")
            .map_err(|e| LoadError::decode(e.kind.to_string()))?;
        Ok(value)
    }

    fn encode(&self, writer: &mut ByteWriter, value: &String) -> Result<(), LoadError> {
        self.check(value, "")?;
        writer.write_string(value)
    }
}

impl StringLoadable for TextLoadable {
    fn parse_string(&self, text: &str, path: &str) -> Result<String, LoadError> {
        self.check(text, path)?;
        Ok(text.to_string())
    }

    fn to_key_string(&self, value: &String) -> Result<String, LoadError> {
        self.check(value, "")?;
        Ok(value.clone())
    }
}

// ---------------------------------------------------------------------------
// Named enum
// ---------------------------------------------------------------------------

/// Maps a fixed table of names to values. The wire form is the table index.
#[derive(Debug, Clone, Copy)]
pub struct NamedEnumLoadable<T: 'static> {
    kind: &'static str,
    entries: &'static [(&'static str, T)],
}

impl<T: Copy + PartialEq + 'static> NamedEnumLoadable<T> {
    /// `kind` names the value family in errors, e.g. `"fallback"`.
    pub const fn new(kind: &'static str, entries: &'static [(&'static str, T)]) -> Self {
        Self { kind, entries }
    }

    fn index_of(&self, value: &T) -> Result<usize, LoadError> {
        self.entries
            .iter()
            .position(|(_, candidate)| candidate == value)
            .ok_or_else(|| LoadError::custom("", format!("{} value has no registered name", self.kind)))
    }
}

impl<T: Copy + PartialEq + 'static> Loadable for NamedEnumLoadable<T> {
    type Value = T;

    fn convert(&self, node: &Value, path: &str) -> Result<T, LoadError> {
        let text = node
            .as_str()
            .ok_or_else(|| LoadError::wrong_type(path, "string", node))?;
        self.parse_string(text, path)
    }

    fn serialize(&self, value: &T) -> Result<Value, LoadError> {
        Ok(Value::String(self.to_key_string(value)?))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<T, LoadError> {
        let index = reader.read_len()?;
        self.entries
            .get(index)
            .map(|(_, value)| *value)
            .ok_or_else(|| LoadError::decode(format!("{} index {index} out of range", self.kind)))
    }

    fn encode(&self, writer: &mut ByteWriter, value: &T) -> Result<(), LoadError> {
        writer.write_len(self.index_of(value)?)
    }
}

impl<T: Copy + PartialEq + 'static> StringLoadable for NamedEnumLoadable<T> {
    fn parse_string(&self, text: &str, path: &str) -> Result<T, LoadError> {
        self.entries
            .iter()
            .find(|(name, _)| *name == text)
            .map(|(_, value)| *value)
            .ok_or_else(|| LoadError::unknown_name(path, self.kind, text))
    }

    fn to_key_string(&self, value: &T) -> Result<String, LoadError> {
        let index = self.index_of(value)?;
        Ok(self.entries[index].0.to_string())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadable::{decode_from_slice, encode_to_vec};
    use serde_json::json;

    #[test]
    fn float_beyond_f32_range_is_rejected() {
        let err = FloatLoadable::ANY.convert(&json!(1e300), "scale").unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::OutOfRange { .. }));
        assert_eq!(err.path, "scale");
        assert!(FloatLoadable::ANY.convert(&json!(-1e39), "scale").is_err());

        let largest = FloatLoadable::ANY
            .convert(&json!(f64::from(f32::MAX)), "scale")
            .unwrap();
        assert_eq!(largest, f32::MAX);
        assert!(FloatLoadable::ANY.serialize(&largest).is_ok());
    }

    #[test]
    fn int_range_enforced_on_convert() {
        let level = IntLoadable::range(1, 10);
        assert_eq!(level.convert(&json!(5), "level").unwrap(), 5);
        let err = level.convert(&json!(11), "level").unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::OutOfRange { .. }));
        assert_eq!(err.path, "level");
    }

    #[test]
    fn int_rejects_fractional_number() {
        let err = IntLoadable::ANY.convert(&json!(1.5), "count").unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::WrongType { expected: "integer", .. }));
    }

    #[test]
    fn int_range_enforced_on_decode() {
        let bytes = encode_to_vec(&IntLoadable::ANY, &-3).unwrap();
        assert!(decode_from_slice(&IntLoadable::NON_NEGATIVE, &bytes).is_err());
        assert_eq!(decode_from_slice(&IntLoadable::ANY, &bytes).unwrap(), -3);
    }

    #[test]
    fn int_parses_map_keys() {
        assert_eq!(IntLoadable::ANY.parse_string("42", "k").unwrap(), 42);
        assert!(IntLoadable::ANY.parse_string("forty", "k").is_err());
    }

    #[test]
    fn float_round_trips_exactly() {
        let value = 0.1f32;
        let node = FloatLoadable::ANY.serialize(&value).unwrap();
        assert_eq!(FloatLoadable::ANY.convert(&node, "v").unwrap(), value);
        let bytes = encode_to_vec(&FloatLoadable::ANY, &value).unwrap();
        assert_eq!(decode_from_slice(&FloatLoadable::ANY, &bytes).unwrap(), value);
    }

    #[test]
    fn float_range_and_nan() {
        assert!(FloatLoadable::NON_NEGATIVE.convert(&json!(-0.5), "v").is_err());
        assert!(FloatLoadable::ANY.serialize(&f32::NAN).is_err());
        let mut w = ByteWriter::new();
        w.write_f32(f32::NAN);
        let bytes = w.into_bytes();
        assert!(decode_from_slice(&FloatLoadable::ANY, &bytes).is_err());
    }

    #[test]
    fn float_accepts_integers() {
        assert_eq!(FloatLoadable::ANY.convert(&json!(10), "v").unwrap(), 10.0);
    }

    #[test]
    fn bool_wrong_type() {
        let err = BoolLoadable.convert(&json!("yes"), "flag").unwrap_err();
        assert_eq!(err.to_string(), "flag: expected boolean, found string");
    }

    #[test]
    fn text_non_empty() {
        assert!(TextLoadable::NON_EMPTY.convert(&json!(""), "name").is_err());
        assert_eq!(TextLoadable::ANY.convert(&json!(""), "name").unwrap(), "");
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Slot {
        Head,
        Chest,
    }

    const SLOTS: NamedEnumLoadable<Slot> =
        NamedEnumLoadable::new("slot", &[("head", Slot::Head), ("chest", Slot::Chest)]);

    #[test]
    fn named_enum_by_name_and_index() {
        assert_eq!(SLOTS.convert(&json!("chest"), "slot").unwrap(), Slot::Chest);
        assert_eq!(SLOTS.serialize(&Slot::Head).unwrap(), json!("head"));
        let bytes = encode_to_vec(&SLOTS, &Slot::Chest).unwrap();
        assert_eq!(bytes, vec![1]);
        assert_eq!(decode_from_slice(&SLOTS, &bytes).unwrap(), Slot::Chest);
    }

    #[test]
    fn named_enum_unknown_name() {
        let err = SLOTS.convert(&json!("feet"), "armor.slot").unwrap_err();
        assert_eq!(err.to_string(), "armor.slot: unknown slot 'feet'");
    }
}
