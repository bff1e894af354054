//! The fixed operator table of the postfix language.

use forge_loadable::NamedEnumLoadable;

/// An operator token. Declaration order is the wire order: the operator at
/// table index `i` has opcode `2 + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostFixOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    Min,
    Max,
    Abs,
    Negate,
    Sqrt,
    Floor,
    Ceil,
}

/// Symbol table, in opcode order.
pub const OPERATORS: &[(&str, PostFixOperator)] = &[
    ("+", PostFixOperator::Add),
    ("-", PostFixOperator::Subtract),
    ("*", PostFixOperator::Multiply),
    ("/", PostFixOperator::Divide),
    ("%", PostFixOperator::Remainder),
    ("^", PostFixOperator::Power),
    ("min", PostFixOperator::Min),
    ("max", PostFixOperator::Max),
    ("abs", PostFixOperator::Abs),
    ("negate", PostFixOperator::Negate),
    ("sqrt", PostFixOperator::Sqrt),
    ("floor", PostFixOperator::Floor),
    ("ceil", PostFixOperator::Ceil),
];

/// Operators by symbol, e.g. `"*"`.
pub const OPERATOR_LOADABLE: NamedEnumLoadable<PostFixOperator> =
    NamedEnumLoadable::new("operator", OPERATORS);

impl PostFixOperator {
    /// Number of operands popped from the stack.
    pub const fn arity(self) -> usize {
        match self {
            Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide
            | Self::Remainder
            | Self::Power
            | Self::Min
            | Self::Max => 2,
            Self::Abs | Self::Negate | Self::Sqrt | Self::Floor | Self::Ceil => 1,
        }
    }

    pub fn symbol(self) -> &'static str {
        OPERATORS[self.index()].0
    }

    /// Position in [`OPERATORS`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(name, _)| *name == symbol)
            .map(|(_, op)| *op)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        OPERATORS.get(index).map(|(_, op)| *op)
    }

    /// Apply to exactly [`arity`](Self::arity) operands, deepest first.
    /// Division and remainder by zero yield zero.
    pub fn evaluate(self, operands: &[f32]) -> f32 {
        debug_assert_eq!(operands.len(), self.arity());
        match self {
            Self::Add => operands[0] + operands[1],
            Self::Subtract => operands[0] - operands[1],
            Self::Multiply => operands[0] * operands[1],
            Self::Divide => {
                if operands[1] == 0.0 {
                    0.0
                } else {
                    operands[0] / operands[1]
                }
            }
            Self::Remainder => {
                if operands[1] == 0.0 {
                    0.0
                } else {
                    operands[0] % operands[1]
                }
            }
            Self::Power => operands[0].powf(operands[1]),
            Self::Min => operands[0].min(operands[1]),
            Self::Max => operands[0].max(operands[1]),
            Self::Abs => operands[0].abs(),
            Self::Negate => -operands[0],
            Self::Sqrt => operands[0].sqrt(),
            Self::Floor => operands[0].floor(),
            Self::Ceil => operands[0].ceil(),
        }
    }
}

impl std::fmt::Display for PostFixOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
