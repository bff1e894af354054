//! Values that scale linearly with a level.

use std::sync::LazyLock;

use forge_loadable::record::DefaultField;
use forge_loadable::{FloatLoadable, LoadableExt, RecordLoadable};

/// `flat + each_level * level`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelingValue {
    pub flat: f32,
    pub each_level: f32,
}

impl LevelingValue {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(flat: f32, each_level: f32) -> Self {
        Self { flat, each_level }
    }

    /// A value that ignores the level.
    pub const fn flat(flat: f32) -> Self {
        Self::new(flat, 0.0)
    }

    /// A value of `each_level` per level, starting from zero.
    pub const fn each_level(each_level: f32) -> Self {
        Self::new(0.0, each_level)
    }

    pub fn compute(&self, level: f32) -> f32 {
        self.flat + self.each_level * level
    }
}

type LevelingField = DefaultField<LevelingValue, FloatLoadable>;

/// Record loadable behind [`LEVELING_LOADABLE`].
pub type LevelingLoadable = RecordLoadable<
    LevelingValue,
    (LevelingField, LevelingField),
    fn((f32, f32)) -> Result<LevelingValue, String>,
>;

fn build_leveling((flat, each_level): (f32, f32)) -> Result<LevelingValue, String> {
    Ok(LevelingValue::new(flat, each_level))
}

/// `{"flat": f, "each_level": e}`, both defaulting to zero. Two `f32`s on
/// the wire, `flat` first.
pub static LEVELING_LOADABLE: LazyLock<LevelingLoadable> = LazyLock::new(|| {
    RecordLoadable::new(
        (
            FloatLoadable::FINITE.default_field("flat", 0.0, |l: &LevelingValue| &l.flat),
            FloatLoadable::FINITE.default_field("each_level", 0.0, |l: &LevelingValue| {
                &l.each_level
            }),
        ),
        build_leveling as fn((f32, f32)) -> Result<LevelingValue, String>,
    )
});

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use forge_loadable::{Loadable, decode_from_slice, encode_to_vec};
    use serde_json::json;

    #[test]
    fn compute_is_linear() {
        let value = LevelingValue::new(10.0, 2.5);
        assert_eq!(value.compute(0.0), 10.0);
        assert_eq!(value.compute(1.0), 12.5);
        assert_eq!(value.compute(4.0), 20.0);
        assert_eq!(value.compute(-1.0), 7.5);
    }

    #[test]
    fn empty_object_is_zero() {
        let value = LEVELING_LOADABLE.convert(&json!({}), "leveling").unwrap();
        assert_eq!(value, LevelingValue::ZERO);
    }

    #[test]
    fn zero_serializes_to_empty_object() {
        let node = LEVELING_LOADABLE.serialize(&LevelingValue::ZERO).unwrap();
        assert_eq!(node, json!({}));
    }

    #[test]
    fn partial_objects() {
        assert_eq!(
            LEVELING_LOADABLE.convert(&json!({"each_level": 0.5}), "").unwrap(),
            LevelingValue::each_level(0.5)
        );
        assert_eq!(
            LEVELING_LOADABLE.serialize(&LevelingValue::flat(3.0)).unwrap(),
            json!({"flat": 3.0})
        );
    }

    #[test]
    fn wrong_field_type_reports_path() {
        let err = LEVELING_LOADABLE
            .convert(&json!({"flat": "high"}), "bonus")
            .unwrap_err();
        assert_eq!(err.path, "bonus.flat");
    }

    #[test]
    fn wire_form_is_two_floats() {
        let bytes = encode_to_vec(&*LEVELING_LOADABLE, &LevelingValue::new(1.0, 2.0)).unwrap();
        assert_eq!(bytes, vec![0x3F, 0x80, 0, 0, 0x40, 0, 0, 0]);
        assert_eq!(
            decode_from_slice(&*LEVELING_LOADABLE, &bytes).unwrap(),
            LevelingValue::new(1.0, 2.0)
        );
    }
}
