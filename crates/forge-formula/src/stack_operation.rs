//! Single instructions of a compiled postfix program, with their token and
//! wire forms.

use forge_loadable::error::json_type_name;
use forge_loadable::{ByteReader, ByteWriter, LoadError, StringLoadable};
use serde_json::{Number, Value};

use crate::operator::{OPERATOR_LOADABLE, PostFixOperator};

/// Opcode of [`StackOperation::PushConstant`]; an `f32` follows.
pub const VALUE_INDEX: i32 = 0;
/// Opcode of [`StackOperation::PushVariable`]; a var-int index follows.
pub const VARIABLE_INDEX: i32 = 1;
/// Opcode of the first operator. Operator `i` in the table is `OPERATOR_OFFSET + i`.
pub const OPERATOR_OFFSET: i32 = 2;

/// Prefix marking a variable reference token, as in `"$level"`.
pub const VARIABLE_PREFIX: char = '$';

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StackOperation {
    PushConstant(f32),
    /// Index into the variable list the program was compiled against.
    PushVariable(usize),
    Apply(PostFixOperator),
}

impl StackOperation {
    /// Change in stack depth after this instruction runs.
    pub fn depth_delta(&self) -> isize {
        match self {
            Self::PushConstant(_) | Self::PushVariable(_) => 1,
            Self::Apply(op) => 1 - op.arity() as isize,
        }
    }

    /// Parse one postfix token: a number, a numeric string, `$name`, or an
    /// operator symbol.
    pub fn from_token(node: &Value, path: &str, variables: &[String]) -> Result<Self, LoadError> {
        match node {
            Value::Number(number) => {
                let value = number
                    .as_f64()
                    .ok_or_else(|| LoadError::wrong_type(path, "number", node))?;
                finite_constant(value as f32, path)
            }
            Value::String(text) => {
                if let Some(name) = text.strip_prefix(VARIABLE_PREFIX) {
                    return variables
                        .iter()
                        .position(|candidate| candidate == name)
                        .map(Self::PushVariable)
                        .ok_or_else(|| LoadError::unknown_name(path, "variable", name));
                }
                match OPERATOR_LOADABLE.parse_string(text, path) {
                    Ok(op) => Ok(Self::Apply(op)),
                    Err(unknown) => match text.parse::<f32>() {
                        Ok(value) => finite_constant(value, path),
                        Err(_) => Err(unknown),
                    },
                }
            }
            other => Err(LoadError::custom(
                path,
                format!(
                    "expected number, variable or operator, found {}",
                    json_type_name(other)
                ),
            )),
        }
    }

    /// Inverse of [`from_token`](Self::from_token).
    pub fn to_token(&self, variables: &[String]) -> Result<Value, LoadError> {
        match *self {
            Self::PushConstant(value) => Number::from_f64(f64::from(value))
                .map(Value::Number)
                .ok_or_else(|| LoadError::custom("", format!("constant {value} is not finite"))),
            Self::PushVariable(index) => variables
                .get(index)
                .map(|name| Value::String(format!("{VARIABLE_PREFIX}{name}")))
                .ok_or_else(|| {
                    LoadError::custom("", format!("variable index {index} has no name"))
                }),
            Self::Apply(op) => Ok(Value::String(op.symbol().to_string())),
        }
    }

    /// Read one instruction. Variable indices must be below `variable_count`.
    pub fn decode(reader: &mut ByteReader<'_>, variable_count: usize) -> Result<Self, LoadError> {
        match reader.read_var_int()? {
            VALUE_INDEX => {
                let value = reader.read_f32()?;
                finite_constant(value, "").map_err(|e| LoadError::decode(e.kind.to_string()))
            }
            VARIABLE_INDEX => {
                let index = reader.read_len()?;
                if index >= variable_count {
                    return Err(LoadError::decode(format!(
                        "variable index {index} out of range for {variable_count} variables"
                    )));
                }
                Ok(Self::PushVariable(index))
            }
            opcode => opcode
                .checked_sub(OPERATOR_OFFSET)
                .and_then(|index| usize::try_from(index).ok())
                .and_then(PostFixOperator::from_index)
                .map(Self::Apply)
                .ok_or_else(|| LoadError::decode(format!("unknown opcode {opcode}"))),
        }
    }

    pub fn encode(&self, writer: &mut ByteWriter) -> Result<(), LoadError> {
        match *self {
            Self::PushConstant(value) => {
                writer.write_var_int(VALUE_INDEX);
                writer.write_f32(value);
            }
            Self::PushVariable(index) => {
                writer.write_var_int(VARIABLE_INDEX);
                writer.write_len(index)?;
            }
            Self::Apply(op) => writer.write_var_int(OPERATOR_OFFSET + op.index() as i32),
        }
        Ok(())
    }
}

fn finite_constant(value: f32, path: &str) -> Result<StackOperation, LoadError> {
    if value.is_finite() {
        Ok(StackOperation::PushConstant(value))
    } else {
        Err(LoadError::custom(path, format!("constant {value} is not finite")))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use forge_loadable::LoadErrorKind;
    use serde_json::json;

    fn vars() -> Vec<String> {
        vec!["level".to_string(), "value".to_string()]
    }

    #[test]
    fn parses_every_token_kind() {
        let v = vars();
        assert_eq!(
            StackOperation::from_token(&json!(2.5), "t", &v).unwrap(),
            StackOperation::PushConstant(2.5)
        );
        assert_eq!(
            StackOperation::from_token(&json!("-4"), "t", &v).unwrap(),
            StackOperation::PushConstant(-4.0)
        );
        assert_eq!(
            StackOperation::from_token(&json!("$value"), "t", &v).unwrap(),
            StackOperation::PushVariable(1)
        );
        assert_eq!(
            StackOperation::from_token(&json!("-"), "t", &v).unwrap(),
            StackOperation::Apply(PostFixOperator::Subtract)
        );
        assert_eq!(
            StackOperation::from_token(&json!("max"), "t", &v).unwrap(),
            StackOperation::Apply(PostFixOperator::Max)
        );
    }

    #[test]
    fn unresolved_variable_is_rejected() {
        let err = StackOperation::from_token(&json!("$damage"), "formula[0]", &vars()).unwrap_err();
        assert_eq!(err.path, "formula[0]");
        assert_eq!(
            err.kind,
            LoadErrorKind::UnknownName {
                kind: "variable",
                name: "damage".to_string()
            }
        );
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = StackOperation::from_token(&json!("**"), "formula[2]", &vars()).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::UnknownName { kind: "operator", .. }));
    }

    #[test]
    fn non_finite_numeric_strings_are_rejected() {
        assert!(StackOperation::from_token(&json!("inf"), "t", &vars()).is_err());
        assert!(StackOperation::from_token(&json!("NaN"), "t", &vars()).is_err());
    }

    #[test]
    fn other_shapes_are_rejected() {
        assert!(StackOperation::from_token(&json!(true), "t", &vars()).is_err());
        assert!(StackOperation::from_token(&json!([1]), "t", &vars()).is_err());
    }

    #[test]
    fn tokens_serialize_back() {
        let v = vars();
        assert_eq!(StackOperation::PushVariable(0).to_token(&v).unwrap(), json!("$level"));
        assert_eq!(
            StackOperation::Apply(PostFixOperator::Sqrt).to_token(&v).unwrap(),
            json!("sqrt")
        );
        assert_eq!(StackOperation::PushConstant(0.5).to_token(&v).unwrap(), json!(0.5));
        assert!(StackOperation::PushVariable(2).to_token(&v).is_err());
    }

    #[test]
    fn wire_layout() {
        let mut writer = ByteWriter::new();
        StackOperation::PushVariable(1).encode(&mut writer).unwrap();
        StackOperation::Apply(PostFixOperator::Multiply).encode(&mut writer).unwrap();
        StackOperation::PushConstant(1.0).encode(&mut writer).unwrap();
        assert_eq!(writer.as_bytes(), &[1, 1, 4, 0, 0x3F, 0x80, 0, 0]);

        let mut reader = ByteReader::new(writer.as_bytes());
        assert_eq!(
            StackOperation::decode(&mut reader, 2).unwrap(),
            StackOperation::PushVariable(1)
        );
        assert_eq!(
            StackOperation::decode(&mut reader, 2).unwrap(),
            StackOperation::Apply(PostFixOperator::Multiply)
        );
        assert_eq!(
            StackOperation::decode(&mut reader, 2).unwrap(),
            StackOperation::PushConstant(1.0)
        );
        assert!(reader.is_exhausted());
    }

    #[test]
    fn decode_checks_variable_bounds_and_opcodes() {
        assert!(StackOperation::decode(&mut ByteReader::new(&[1, 2]), 2).is_err());
        assert!(StackOperation::decode(&mut ByteReader::new(&[99]), 2).is_err());
        assert!(StackOperation::decode(&mut ByteReader::new(&[0x7F]), 2).is_err());
    }

    #[test]
    fn depth_deltas() {
        assert_eq!(StackOperation::PushConstant(1.0).depth_delta(), 1);
        assert_eq!(StackOperation::Apply(PostFixOperator::Add).depth_delta(), -1);
        assert_eq!(StackOperation::Apply(PostFixOperator::Abs).depth_delta(), 0);
    }
}
