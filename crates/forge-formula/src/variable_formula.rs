//! Formulas with data-defined variables on top of a call site's built-ins.
//!
//! ```json
//! {
//!   "variables": {"speed": {"type": "stat", "stat": "mining_speed"}},
//!   "formula": ["$value", "$speed", 0.1, "*", "+"]
//! }
//! ```
//!
//! The formula is compiled against the built-in names followed by the custom
//! names in sorted order. A formula without custom variables may be written
//! bare, without the wrapping object.

use std::collections::BTreeMap;
use std::sync::Arc;

use forge_loadable::collection::MapLoadable;
use forge_loadable::error::key_path;
use forge_loadable::{
    ByteReader, ByteWriter, GenericLoaderRegistry, LoadError, Loadable, TextLoadable,
};
use serde_json::{Map, Value};

use crate::formula::{FallbackFormula, FormulaLoadable, ModifierFormula};
use crate::variable::{ToolContext, ToolVariable};

/// Built-ins of melee damage formulas.
pub const MELEE_VARIABLES: &[&str] = &["level", "damage", "multiplier", "base_damage"];
/// Built-ins of tool stat formulas.
pub const STAT_VARIABLES: &[&str] = &["level", "value"];

const VARIABLES_KEY: &str = "variables";
const FORMULA_KEY: &str = "formula";

/// Built-in values for [`MELEE_VARIABLES`].
pub fn melee_values(tool: &ToolContext, damage: f32, multiplier: f32, base_damage: f32) -> [f32; 4] {
    [tool.level as f32, damage, multiplier, base_damage]
}

/// Built-in values for [`STAT_VARIABLES`].
pub fn stat_values(tool: &ToolContext, value: f32) -> [f32; 2] {
    [tool.level as f32, value]
}

// ---------------------------------------------------------------------------
// VariableFormula
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct VariableFormula {
    variables: BTreeMap<String, ToolVariable>,
    formula: ModifierFormula,
    builtin_count: usize,
}

impl VariableFormula {
    pub fn variables(&self) -> &BTreeMap<String, ToolVariable> {
        &self.variables
    }

    pub fn formula(&self) -> &ModifierFormula {
        &self.formula
    }

    /// Evaluate with the call site's built-in values, in built-in order.
    ///
    /// # Panics
    ///
    /// If `builtins` does not hold exactly one value per built-in variable.
    pub fn apply(&self, tool: &ToolContext, builtins: &[f32]) -> f32 {
        assert_eq!(builtins.len(), self.builtin_count, "wrong number of built-ins");
        if self.variables.is_empty() {
            return self.formula.apply(builtins);
        }
        let mut values = Vec::with_capacity(builtins.len() + self.variables.len());
        values.extend_from_slice(builtins);
        values.extend(self.variables.values().map(|variable| variable.compute(tool)));
        self.formula.apply(&values)
    }
}

// ---------------------------------------------------------------------------
// VariableFormulaLoadable
// ---------------------------------------------------------------------------

/// Loads [`VariableFormula`]s for one call site.
#[derive(Debug, Clone)]
pub struct VariableFormulaLoadable {
    builtins: Vec<String>,
    fallback: FallbackFormula,
    variable_loader: Arc<GenericLoaderRegistry<ToolVariable>>,
}

impl VariableFormulaLoadable {
    pub fn new(
        builtins: &[&str],
        fallback: FallbackFormula,
        variable_loader: Arc<GenericLoaderRegistry<ToolVariable>>,
    ) -> Self {
        Self {
            builtins: builtins.iter().map(|name| name.to_string()).collect(),
            fallback,
            variable_loader,
        }
    }

    pub fn builtins(&self) -> &[String] {
        &self.builtins
    }

    fn variable_map(&self) -> MapLoadable<TextLoadable, &GenericLoaderRegistry<ToolVariable>> {
        MapLoadable::new(TextLoadable::NON_EMPTY, &*self.variable_loader, 0)
    }

    /// Formula loadable over the built-ins plus `custom` names.
    fn formula_loadable(
        &self,
        custom: &BTreeMap<String, ToolVariable>,
        path: &str,
    ) -> Result<FormulaLoadable, LoadError> {
        if let Some(name) = custom.keys().find(|name| self.builtins.contains(*name)) {
            return Err(LoadError::custom(
                key_path(&key_path(path, VARIABLES_KEY), name),
                format!("'{name}' shadows a built-in variable"),
            ));
        }
        Ok(FormulaLoadable::new(
            self.builtins.iter().chain(custom.keys()).cloned(),
            self.fallback,
        ))
    }

    fn finish(
        &self,
        variables: BTreeMap<String, ToolVariable>,
        formula: ModifierFormula,
    ) -> VariableFormula {
        VariableFormula {
            variables,
            formula,
            builtin_count: self.builtins.len(),
        }
    }
}

impl Loadable for VariableFormulaLoadable {
    type Value = VariableFormula;

    fn convert(&self, node: &Value, path: &str) -> Result<VariableFormula, LoadError> {
        let Some((object, formula_node)) = node
            .as_object()
            .and_then(|object| Some((object, object.get(FORMULA_KEY)?)))
        else {
            if node.get(VARIABLES_KEY).is_some() {
                return Err(LoadError::missing(key_path(path, FORMULA_KEY)));
            }
            let formula = self.formula_loadable(&BTreeMap::new(), path)?.convert(node, path)?;
            return Ok(self.finish(BTreeMap::new(), formula));
        };
        let variables = match object.get(VARIABLES_KEY) {
            Some(Value::Null) | None => BTreeMap::new(),
            Some(node) => self
                .variable_map()
                .convert(node, &key_path(path, VARIABLES_KEY))?,
        };
        let formula = self
            .formula_loadable(&variables, path)?
            .convert(formula_node, &key_path(path, FORMULA_KEY))?;
        tracing::debug!(path, custom = variables.len(), "compiled variable formula");
        Ok(self.finish(variables, formula))
    }

    fn serialize(&self, value: &VariableFormula) -> Result<Value, LoadError> {
        let formula = self
            .formula_loadable(&value.variables, "")?
            .serialize(&value.formula)?;
        if value.variables.is_empty() {
            return Ok(formula);
        }
        let mut object = Map::new();
        object.insert(
            VARIABLES_KEY.to_string(),
            self.variable_map().serialize(&value.variables)?,
        );
        object.insert(FORMULA_KEY.to_string(), formula);
        Ok(Value::Object(object))
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> Result<VariableFormula, LoadError> {
        let variables = self.variable_map().decode(reader)?;
        let formula = self
            .formula_loadable(&variables, "")
            .map_err(|e| LoadError::decode(e.to_string()))?
            .decode(reader)?;
        Ok(self.finish(variables, formula))
    }

    fn encode(&self, writer: &mut ByteWriter, value: &VariableFormula) -> Result<(), LoadError> {
        self.variable_map().encode(writer, &value.variables)?;
        self.formula_loadable(&value.variables, "")?
            .encode(writer, &value.formula)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
