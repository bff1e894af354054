//! Forge Formula -- compiled postfix formulas for tool modifiers.
//!
//! Formulas are loaded once per data reload and evaluated many times per
//! tick. Compilation resolves every variable and proves the program is
//! balanced, so evaluation is a tight loop over a small stack with no
//! validation at all.
//!
//! # Pipeline
//!
//! 1. **Tokens** -- a JSON list such as `["$level", 2.5, "*", 10, "+"]`,
//!    a `{flat, each_level}` object, or a bare number.
//! 2. **Compile** -- [`formula::FormulaLoadable`] resolves `$names` against
//!    the call site's variable list and simulates stack depth. Programs
//!    linear in the level become [`formula::SimpleLevelingFormula`].
//! 3. **Evaluate** -- [`formula::ModifierFormula::apply`] takes the variable
//!    values in compile order and returns one `f32`.
//!
//! # Tool variables
//!
//! [`variable_formula::VariableFormula`] adds data-defined variables
//! ([`variable::ToolVariable`]) read from a [`variable::ToolContext`]
//! snapshot, placed after the call site's built-ins in sorted name order.
//!
//! ```rust,ignore
//! let loaders = ToolLoaders::new()?;
//! let loadable = VariableFormulaLoadable::new(
//!     STAT_VARIABLES,
//!     FallbackFormula::Identity,
//!     loaders.variables.clone(),
//! );
//! let formula = loadable.convert(&node, "mining_speed")?;
//! let speed = formula.apply(&tool, &stat_values(&tool, base_speed));
//! ```

pub mod formula;
pub mod leveling;
pub mod operator;
pub mod stack_operation;
pub mod variable;
pub mod variable_formula;

pub use formula::{
    CompileError, FallbackFormula, FormulaLoadable, ModifierFormula, PostFixFormula,
    SimpleLevelingFormula,
};
pub use leveling::{LEVELING_LOADABLE, LevelingValue};
pub use operator::PostFixOperator;
pub use stack_operation::StackOperation;
pub use variable::{ToolContext, ToolLoaders, ToolPredicate, ToolVariable};
pub use variable_formula::{
    MELEE_VARIABLES, STAT_VARIABLES, VariableFormula, VariableFormulaLoadable, melee_values,
    stat_values,
};
