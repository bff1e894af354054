//! Compiled modifier formulas and the loadable that produces them.
//!
//! A formula is written in postfix notation over a fixed, ordered list of
//! variable names chosen by the call site:
//!
//! ```json
//! ["$level", 2.5, "*", 10, "+"]
//! ```
//!
//! Compilation resolves every `$name` to its slot and proves the program
//! leaves exactly one value on the stack, so evaluation never validates
//! anything. Programs of the form `flat + each_level * level` compile to a
//! [`SimpleLevelingFormula`], which skips the stack machine.

use forge_loadable::error::{index_path, json_type_name};
use forge_loadable::{ByteReader, ByteWriter, LoadError, Loadable, NamedEnumLoadable};
use serde_json::Value;

use crate::leveling::{LEVELING_LOADABLE, LevelingValue};
use crate::operator::PostFixOperator;
use crate::stack_operation::StackOperation;

/// Name of the variable in slot 0 of every leveling-capable variable list.
pub const LEVEL_VARIABLE: &str = "level";

/// Wire count marking the leveling form.
const LEVELING_SENTINEL: i16 = -1;

// ---------------------------------------------------------------------------
// Compile errors
// ---------------------------------------------------------------------------

/// A postfix program that cannot run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("formula has no operations")]
    Empty,
    #[error("operator '{operator}' needs {arity} operands but the stack holds {depth}")]
    Underflow {
        index: usize,
        operator: PostFixOperator,
        arity: usize,
        depth: usize,
    },
    #[error("formula leaves {depth} values on the stack, expected exactly 1")]
    Unbalanced { depth: usize },
    #[error("variable index {index} out of range for {count} variables")]
    VariableOutOfRange { index: usize, count: usize },
}

impl CompileError {
    /// Locate the error inside the token list at `path`.
    fn at(&self, path: &str) -> LoadError {
        let path = match self {
            Self::Underflow { index, .. } => index_path(path, *index),
            _ => path.to_string(),
        };
        LoadError::custom(path, self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Fallback formulas
// ---------------------------------------------------------------------------

/// How a call site combines a leveled value with its base value (slot 1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FallbackFormula {
    /// The leveled value itself.
    #[default]
    Identity,
    /// `value + leveled`
    Add,
    /// `value * (1 + leveled)`
    Boost,
    /// `value * leveled`
    Percent,
}

pub const FALLBACK_LOADABLE: NamedEnumLoadable<FallbackFormula> = NamedEnumLoadable::new(
    "fallback",
    &[
        ("identity", FallbackFormula::Identity),
        ("add", FallbackFormula::Add),
        ("boost", FallbackFormula::Boost),
        ("percent", FallbackFormula::Percent),
    ],
);

impl FallbackFormula {
    pub fn apply(self, leveled: f32, values: &[f32]) -> f32 {
        if self == Self::Identity {
            return leveled;
        }
        debug_assert!(values.len() > 1, "fallback {self:?} reads variable slot 1");
        let value = values[1];
        match self {
            Self::Identity => leveled,
            Self::Add => value + leveled,
            Self::Boost => value * (1.0 + leveled),
            Self::Percent => value * leveled,
        }
    }
}

// ---------------------------------------------------------------------------
// Postfix programs
// ---------------------------------------------------------------------------

/// A validated postfix program.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFixFormula {
    operations: Box<[StackOperation]>,
    max_depth: usize,
}

impl PostFixFormula {
    /// Validate `operations` against a list of `variable_count` variables.
    pub fn compile(
        operations: Vec<StackOperation>,
        variable_count: usize,
    ) -> Result<Self, CompileError> {
        if operations.is_empty() {
            return Err(CompileError::Empty);
        }
        let mut depth = 0usize;
        let mut max_depth = 0usize;
        for (index, operation) in operations.iter().enumerate() {
            match *operation {
                StackOperation::PushVariable(variable) if variable >= variable_count => {
                    return Err(CompileError::VariableOutOfRange {
                        index: variable,
                        count: variable_count,
                    });
                }
                StackOperation::Apply(operator) if depth < operator.arity() => {
                    return Err(CompileError::Underflow {
                        index,
                        operator,
                        arity: operator.arity(),
                        depth,
                    });
                }
                StackOperation::Apply(operator) => depth = depth + 1 - operator.arity(),
                StackOperation::PushConstant(_) | StackOperation::PushVariable(_) => depth += 1,
            }
            max_depth = max_depth.max(depth);
        }
        if depth != 1 {
            return Err(CompileError::Unbalanced { depth });
        }
        Ok(Self {
            operations: operations.into_boxed_slice(),
            max_depth,
        })
    }

    /// A program pushing one constant.
    pub fn constant(value: f32) -> Self {
        Self {
            operations: Box::new([StackOperation::PushConstant(value)]),
            max_depth: 1,
        }
    }

    pub fn operations(&self) -> &[StackOperation] {
        &self.operations
    }

    /// Deepest stack the program reaches.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Run the program. Variable `i` is `values[i]`.
    pub fn apply(&self, values: &[f32]) -> f32 {
        if let [StackOperation::PushConstant(value)] = *self.operations {
            return value;
        }
        let mut stack = Vec::with_capacity(self.max_depth);
        for operation in self.operations.iter() {
            match *operation {
                StackOperation::PushConstant(value) => stack.push(value),
                StackOperation::PushVariable(index) => {
                    debug_assert!(
                        index < values.len(),
                        "variable {index} missing from {} values",
                        values.len()
                    );
                    stack.push(values[index]);
                }
                StackOperation::Apply(operator) => {
                    let Some(base) = stack.len().checked_sub(operator.arity()) else {
                        malformed_program(format!("stack underflow at '{operator}'"));
                    };
                    let result = operator.evaluate(&stack[base..]);
                    stack.truncate(base);
                    stack.push(result);
                }
            }
        }
        match stack.as_slice() {
            [result] => *result,
            rest => malformed_program(format!("{} values left on the stack", rest.len())),
        }
    }
}

/// Compilation guarantees a balanced program; reaching this is a bug.
#[cold]
#[track_caller]
fn malformed_program(detail: String) -> ! {
    panic!("malformed formula program: {detail}")
}

// ---------------------------------------------------------------------------
// Leveling shortcut
// ---------------------------------------------------------------------------

/// A leveled value combined with a fallback, evaluated without a stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleLevelingFormula {
    pub leveling: LevelingValue,
    pub fallback: FallbackFormula,
}

impl SimpleLevelingFormula {
    pub fn new(leveling: LevelingValue, fallback: FallbackFormula) -> Self {
        Self { leveling, fallback }
    }

    /// Slot 0 is the level.
    pub fn apply(&self, values: &[f32]) -> f32 {
        debug_assert!(!values.is_empty(), "leveling formula reads variable slot 0");
        self.fallback.apply(self.leveling.compute(values[0]), values)
    }
}

/// Recognise `flat + each_level * level` in any operand order, `flat`
/// optional, where `level` is variable 0.
fn match_leveling(operations: &[StackOperation]) -> Option<LevelingValue> {
    use PostFixOperator::{Add, Multiply};
    use StackOperation::{Apply, PushConstant as C, PushVariable as V};

    match *operations {
        [V(0), C(each), Apply(Multiply)] | [C(each), V(0), Apply(Multiply)] => {
            Some(LevelingValue::each_level(each))
        }
        [V(0), C(each), Apply(Multiply), C(flat), Apply(Add)]
        | [C(each), V(0), Apply(Multiply), C(flat), Apply(Add)]
        | [C(flat), V(0), C(each), Apply(Multiply), Apply(Add)]
        | [C(flat), C(each), V(0), Apply(Multiply), Apply(Add)] => {
            Some(LevelingValue::new(flat, each))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ModifierFormula
// ---------------------------------------------------------------------------

/// A compiled formula, evaluated against the variable values of the list it
/// was compiled for.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierFormula {
    PostFix(PostFixFormula),
    Simple(SimpleLevelingFormula),
}

impl ModifierFormula {
    pub fn constant(value: f32) -> Self {
        Self::PostFix(PostFixFormula::constant(value))
    }

    pub fn leveling(leveling: LevelingValue, fallback: FallbackFormula) -> Self {
        Self::Simple(SimpleLevelingFormula::new(leveling, fallback))
    }

    pub fn apply(&self, values: &[f32]) -> f32 {
        match self {
            Self::PostFix(program) => program.apply(values),
            Self::Simple(simple) => simple.apply(values),
        }
    }

    pub fn as_leveling(&self) -> Option<&SimpleLevelingFormula> {
        match self {
            Self::Simple(simple) => Some(simple),
            Self::PostFix(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FormulaLoadable
// ---------------------------------------------------------------------------

/// Compiles formulas against one call site's variable list.
///
/// Text accepts a token array, a bare number, or (when the first variable
/// is `level`) a `{flat, each_level}` object. The wire form is an `i16`
/// instruction count followed by the instructions, or `-1` followed by the
/// two leveling floats.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaLoadable {
    variables: Box<[String]>,
    fallback: FallbackFormula,
}

impl FormulaLoadable {
    pub fn new<S: Into<String>>(
        variables: impl IntoIterator<Item = S>,
        fallback: FallbackFormula,
    ) -> Self {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            fallback,
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn fallback(&self) -> FallbackFormula {
        self.fallback
    }

    /// Whether variable 0 is the level, enabling the leveling form.
    pub fn supports_leveling(&self) -> bool {
        self.variables.first().is_some_and(|name| name == LEVEL_VARIABLE)
    }

    /// Compile resolved operations, taking the leveling shortcut when the
    /// program is linear in the level.
    pub fn compile(
        &self,
        operations: Vec<StackOperation>,
        path: &str,
    ) -> Result<ModifierFormula, LoadError> {
        if self.supports_leveling() && self.fallback == FallbackFormula::Identity {
            if let Some(leveling) = match_leveling(&operations) {
                tracing::debug!(
                    path,
                    flat = leveling.flat,
                    each_level = leveling.each_level,
                    "formula compiled to leveling shortcut"
                );
                return Ok(ModifierFormula::leveling(leveling, self.fallback));
            }
        }
        PostFixFormula::compile(operations, self.variables.len())
            .map(ModifierFormula::PostFix)
            .map_err(|e| e.at(path))
    }

    /// The leveling form reads slot 0, and every fallback but `Identity`
    /// also reads slot 1.
    fn check_leveling(&self, path: &str) -> Result<(), LoadError> {
        if !self.supports_leveling() {
            return Err(LoadError::custom(
                path,
                format!("leveling form requires '{LEVEL_VARIABLE}' as the first variable"),
            ));
        }
        if self.fallback != FallbackFormula::Identity && self.variables.len() < 2 {
            return Err(LoadError::custom(
                path,
                format!(
                    "leveling form with fallback {:?} requires a value variable after '{LEVEL_VARIABLE}'",
                    self.fallback
                ),
            ));
        }
        Ok(())
    }
}

impl Loadable for FormulaLoadable {
    type Value = ModifierFormula;

    fn convert(&self, node: &Value, path: &str) -> Result<ModifierFormula, LoadError> {
        match node {
            Value::Array(tokens) => {
                let operations = tokens
                    .iter()
                    .enumerate()
                    .map(|(i, token)| {
                        StackOperation::from_token(token, &index_path(path, i), &self.variables)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.compile(operations, path)
            }
            Value::Object(_) => {
                self.check_leveling(path)?;
                let leveling = LEVELING_LOADABLE.convert(node, path)?;
                Ok(ModifierFormula::leveling(leveling, self.fallback))
            }
            Value::Number(_) => {
                let operation = StackOperation::from_token(node, path, &self.variables)?;
                self.compile(vec![operation], path)
            }
            other => Err(LoadError::custom(
                path,
                format!(
                    "expected formula list, leveling object or number, found {}",
                    json_type_name(other)
                ),
            )),
        }
    }

    fn serialize(&self, value: &ModifierFormula) -> Result<Value, LoadError> {
        match value {
            ModifierFormula::PostFix(program) => program
                .operations()
                .iter()
                .map(|operation| operation.to_token(&self.variables))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            ModifierFormula::Simple(simple) => {
                self.check_leveling("")?;
                LEVELING_LOADABLE.serialize(&simple.leveling)
            }
        }
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<ModifierFormula, LoadError> {
        let count = reader.read_short()?;
        if count == LEVELING_SENTINEL {
            self.check_leveling("")
                .map_err(|e| LoadError::decode(e.kind.to_string()))?;
            let leveling = LEVELING_LOADABLE.decode(reader)?;
            return Ok(ModifierFormula::leveling(leveling, self.fallback));
        }
        let count = usize::try_from(count)
            .map_err(|_| LoadError::decode(format!("invalid formula length {count}")))?;
        let mut operations = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            operations.push(StackOperation::decode(reader, self.variables.len())?);
        }
        PostFixFormula::compile(operations, self.variables.len())
            .map(ModifierFormula::PostFix)
            .map_err(|e| LoadError::decode(e.to_string()))
    }

    fn encode(&self, writer: &mut ByteWriter, value: &ModifierFormula) -> Result<(), LoadError> {
        match value {
            ModifierFormula::PostFix(program) => {
                let operations = program.operations();
                let count = i16::try_from(operations.len()).map_err(|_| {
                    LoadError::custom("", format!("formula of {} operations is too long", operations.len()))
                })?;
                writer.write_short(count);
                for operation in operations {
                    operation.encode(writer)?;
                }
                Ok(())
            }
            ModifierFormula::Simple(simple) => {
                self.check_leveling("")?;
                writer.write_short(LEVELING_SENTINEL);
                LEVELING_LOADABLE.encode(writer, &simple.leveling)
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use forge_loadable::{LoadErrorKind, decode_from_slice, encode_to_vec};
    use serde_json::json;

    fn level_only() -> FormulaLoadable {
        FormulaLoadable::new(["level"], FallbackFormula::Identity)
    }

    fn stat() -> FormulaLoadable {
        FormulaLoadable::new(["level", "value"], FallbackFormula::Identity)
    }

    fn program(ops: &[StackOperation]) -> PostFixFormula {
        PostFixFormula::compile(ops.to_vec(), 2).unwrap()
    }

    // -- Scenarios ----------------------------------------------------------

    #[test]
    fn level_scaled_damage() {
        let formula = level_only()
            .convert(&json!(["$level", 2.5, "*", 10, "+"]), "formula")
            .unwrap();
        assert_eq!(formula.apply(&[4.0]), 20.0);
    }

    #[test]
    fn linear_program_takes_shortcut() {
        let formula = level_only()
            .convert(&json!(["$level", 2.5, "*", 10, "+"]), "formula")
            .unwrap();
        assert_eq!(
            formula,
            ModifierFormula::leveling(LevelingValue::new(10.0, 2.5), FallbackFormula::Identity)
        );
    }

    #[test]
    fn every_linear_shape_is_recognised() {
        let shapes = [
            json!(["$level", 3, "*"]),
            json!([3, "$level", "*"]),
            json!(["$level", 3, "*", 1, "+"]),
            json!([3, "$level", "*", 1, "+"]),
            json!([1, "$level", 3, "*", "+"]),
            json!([1, 3, "$level", "*", "+"]),
        ];
        for shape in shapes {
            let formula = level_only().convert(&shape, "").unwrap();
            assert!(formula.as_leveling().is_some(), "{shape} was not simplified");
        }
    }

    #[test]
    fn shortcut_equals_stack_program() {
        let shortcut = SimpleLevelingFormula::new(LevelingValue::new(10.0, 2.5), FallbackFormula::Identity);
        let stack = program(&[
            StackOperation::PushVariable(0),
            StackOperation::PushConstant(2.5),
            StackOperation::Apply(PostFixOperator::Multiply),
            StackOperation::PushConstant(10.0),
            StackOperation::Apply(PostFixOperator::Add),
        ]);
        for level in [0.0, 1.0, 5.0, -1.0, 100.0] {
            let expected = 10.0 + 2.5 * level;
            assert_eq!(shortcut.apply(&[level, 0.0]), expected);
            assert_eq!(stack.apply(&[level, 0.0]), expected);
        }
    }

    #[test]
    fn non_level_lists_never_take_shortcut() {
        let loadable = FormulaLoadable::new(["damage", "level"], FallbackFormula::Identity);
        let formula = loadable.convert(&json!(["$damage", 2, "*"]), "").unwrap();
        assert!(formula.as_leveling().is_none());
    }

    #[test]
    fn non_identity_fallback_keeps_program() {
        let loadable = FormulaLoadable::new(["level", "value"], FallbackFormula::Boost);
        let formula = loadable.convert(&json!(["$level", 2, "*"]), "").unwrap();
        assert!(formula.as_leveling().is_none());
        assert_eq!(formula.apply(&[3.0, 100.0]), 6.0);
    }

    // -- Compile-time rejection -----------------------------------------------

    #[test]
    fn every_operator_rejects_missing_operands() {
        for (symbol, op) in crate::operator::OPERATORS {
            let tokens: Vec<Value> = std::iter::repeat_n(json!(1), op.arity() - 1)
                .chain(std::iter::once(json!(symbol)))
                .collect();
            let err = stat().convert(&Value::Array(tokens), "formula").unwrap_err();
            assert_eq!(err.path, format!("formula[{}]", op.arity() - 1), "{symbol}");
        }
    }

    #[test]
    fn unbalanced_program_is_rejected() {
        let err = stat().convert(&json!([1, 2]), "formula").unwrap_err();
        assert_eq!(err.path, "formula");
        assert!(err.to_string().contains("2 values"));
    }

    #[test]
    fn empty_program_is_rejected() {
        assert!(stat().convert(&json!([]), "formula").is_err());
    }

    #[test]
    fn unresolved_variable_names_token() {
        let err = stat()
            .convert(&json!(["$level", "$damage", "+"]), "formula")
            .unwrap_err();
        assert_eq!(err.path, "formula[1]");
        assert!(matches!(err.kind, LoadErrorKind::UnknownName { kind: "variable", .. }));
    }

    #[test]
    fn compile_reports_variable_bounds() {
        let err = PostFixFormula::compile(vec![StackOperation::PushVariable(3)], 2).unwrap_err();
        assert_eq!(err, CompileError::VariableOutOfRange { index: 3, count: 2 });
    }

    #[test]
    fn max_depth_is_tracked() {
        let formula = program(&[
            StackOperation::PushConstant(1.0),
            StackOperation::PushConstant(2.0),
            StackOperation::PushConstant(3.0),
            StackOperation::Apply(PostFixOperator::Add),
            StackOperation::Apply(PostFixOperator::Add),
        ]);
        assert_eq!(formula.max_depth(), 3);
        assert_eq!(formula.apply(&[]), 6.0);
    }

    // -- Other text forms ---------------------------------------------------

    #[test]
    fn bare_number_is_constant() {
        let formula = stat().convert(&json!(7.5), "").unwrap();
        assert_eq!(formula, ModifierFormula::constant(7.5));
        assert_eq!(formula.apply(&[1.0, 2.0]), 7.5);
    }

    #[test]
    fn leveling_object_uses_call_site_fallback() {
        let loadable = FormulaLoadable::new(["level", "value"], FallbackFormula::Boost);
        let formula = loadable.convert(&json!({"each_level": 0.25}), "").unwrap();
        // value * (1 + 0.25 * level)
        assert_eq!(formula.apply(&[2.0, 10.0]), 15.0);
    }

    #[test]
    fn leveling_object_requires_level_variable() {
        let loadable = FormulaLoadable::new(["damage"], FallbackFormula::Identity);
        assert!(loadable.convert(&json!({"flat": 1}), "formula").is_err());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let err = stat().convert(&json!("oops"), "formula").unwrap_err();
        assert_eq!(err.path, "formula");
    }

    // -- Fallbacks ------------------------------------------------------------

    #[test]
    fn fallback_formulas() {
        let values = [3.0, 10.0];
        assert_eq!(FallbackFormula::Identity.apply(0.5, &values), 0.5);
        assert_eq!(FallbackFormula::Add.apply(0.5, &values), 10.5);
        assert_eq!(FallbackFormula::Boost.apply(0.5, &values), 15.0);
        assert_eq!(FallbackFormula::Percent.apply(0.5, &values), 5.0);
    }

    // -- Serialization --------------------------------------------------------

    #[test]
    fn program_serializes_to_tokens() {
        let loadable = stat();
        // Constants come back as floats, so the literal is written as one.
        let tokens = json!(["$value", "$level", 2.0, "^", "min"]);
        let formula = loadable.convert(&tokens, "").unwrap();
        assert_eq!(loadable.serialize(&formula).unwrap(), tokens);
    }

    #[test]
    fn zero_leveling_serializes_to_empty_object() {
        let formula = ModifierFormula::leveling(LevelingValue::ZERO, FallbackFormula::Identity);
        assert_eq!(stat().serialize(&formula).unwrap(), json!({}));
    }

    #[test]
    fn leveling_wire_form() {
        let formula = ModifierFormula::leveling(LevelingValue::new(1.0, 2.0), FallbackFormula::Identity);
        let bytes = encode_to_vec(&stat(), &formula).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFF, 0x3F, 0x80, 0, 0, 0x40, 0, 0, 0]);
        assert_eq!(decode_from_slice(&stat(), &bytes).unwrap(), formula);
    }

    #[test]
    fn program_wire_form() {
        let loadable = stat();
        let formula = loadable.convert(&json!(["$value", "abs"]), "").unwrap();
        let bytes = encode_to_vec(&loadable, &formula).unwrap();
        assert_eq!(bytes, vec![0, 2, 1, 1, 10]);
        assert_eq!(decode_from_slice(&loadable, &bytes).unwrap(), formula);
    }

    #[test]
    fn decode_rejects_bad_counts_and_programs() {
        let loadable = stat();
        // count -2
        assert!(decode_from_slice(&loadable, &[0xFF, 0xFE]).is_err());
        // empty program
        assert!(decode_from_slice(&loadable, &[0, 0]).is_err());
        // "+" with an empty stack
        assert!(decode_from_slice(&loadable, &[0, 1, 2]).is_err());
        // leveling form on a list without a level
        let no_level = FormulaLoadable::new(["damage"], FallbackFormula::Identity);
        assert!(decode_from_slice(&no_level, &[0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn leveling_fallback_needs_value_variable() {
        let loadable = FormulaLoadable::new(["level"], FallbackFormula::Boost);
        let err = loadable.convert(&json!({"flat": 1}), "bonus").unwrap_err();
        assert_eq!(err.path, "bonus");

        let formula = ModifierFormula::leveling(LevelingValue::flat(1.0), FallbackFormula::Boost);
        assert!(encode_to_vec(&loadable, &formula).is_err());
        assert!(decode_from_slice(&loadable, &[0xFF, 0xFF, 0x3F, 0x80, 0, 0, 0, 0, 0, 0]).is_err());

        // With a value slot the same node compiles and applies.
        let boosted = FormulaLoadable::new(["level", "value"], FallbackFormula::Boost)
            .convert(&json!({"flat": 1}), "bonus")
            .unwrap();
        assert_eq!(boosted.apply(&[3.0, 4.0]), 8.0);
    }

    #[test]
    fn flat_less_leveling_matches_stack_program() {
        let formula = level_only()
            .convert(&json!(["$level", -2.5, "*"]), "")
            .unwrap();
        assert!(formula.as_leveling().is_some());
        let stack = PostFixFormula::compile(
            vec![
                StackOperation::PushVariable(0),
                StackOperation::PushConstant(-2.5),
                StackOperation::Apply(PostFixOperator::Multiply),
            ],
            1,
        )
        .unwrap();
        for level in [0.0f32, 1.0, 5.0, -1.0, 100.0] {
            assert_eq!(formula.apply(&[level]), stack.apply(&[level]), "level {level}");
        }
    }

    #[test]
    fn leveling_cannot_be_written_without_level_variable() {
        let loadable = FormulaLoadable::new(["damage"], FallbackFormula::Identity);
        let formula = ModifierFormula::leveling(LevelingValue::flat(1.0), FallbackFormula::Identity);
        assert!(loadable.serialize(&formula).is_err());
        assert!(encode_to_vec(&loadable, &formula).is_err());
    }

    #[test]
    #[should_panic(expected = "malformed formula program")]
    fn unbalanced_program_panics_at_runtime() {
        // Bypasses compile() to build an invalid program.
        let formula = PostFixFormula {
            operations: Box::new([
                StackOperation::PushConstant(1.0),
                StackOperation::PushConstant(2.0),
            ]),
            max_depth: 2,
        };
        formula.apply(&[]);
    }
}
