//! Tool snapshots and the data-driven variables and predicates read from
//! them.
//!
//! A [`ToolContext`] is a plain snapshot of the tool a formula runs for.
//! [`ToolVariable`]s turn it into numbers for custom formula slots, and
//! [`ToolPredicate`]s test it. Both are tagged unions loaded through the
//! registries held by [`ToolLoaders`].

use std::collections::BTreeMap;
use std::sync::Arc;

use forge_loadable::predicate::{all_match, any_match, register_combinators};
use forge_loadable::{
    FloatLoadable, GenericLoaderRegistry, IntLoadable, LoadableExt, Predicate, PredicateUnion,
    RecordLoadable, RegistryError, TextLoadable,
};

// ---------------------------------------------------------------------------
// ToolContext
// ---------------------------------------------------------------------------

/// Read-only view of a tool at evaluation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolContext {
    /// Level of the modifier being evaluated.
    pub level: i32,
    pub stats: BTreeMap<String, f32>,
    /// Modifier name to level.
    pub modifiers: BTreeMap<String, i32>,
    pub durability: i32,
    pub max_durability: i32,
    pub broken: bool,
}

impl ToolContext {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_stat(mut self, name: impl Into<String>, value: f32) -> Self {
        self.stats.insert(name.into(), value);
        self
    }

    pub fn with_modifier(mut self, name: impl Into<String>, level: i32) -> Self {
        self.modifiers.insert(name.into(), level);
        self
    }

    /// Set durability. A tool at zero durability is broken.
    pub fn with_durability(mut self, current: i32, max: i32) -> Self {
        self.durability = current;
        self.max_durability = max;
        self.broken = current <= 0;
        self
    }

    pub fn stat(&self, name: &str) -> Option<f32> {
        self.stats.get(name).copied()
    }

    /// Zero for modifiers the tool lacks.
    pub fn modifier_level(&self, name: &str) -> i32 {
        self.modifiers.get(name).copied().unwrap_or(0)
    }

    /// Remaining durability in `[0, 1]`; zero when the tool has no maximum.
    pub fn durability_percent(&self) -> f32 {
        if self.max_durability <= 0 {
            return 0.0;
        }
        (self.durability as f32 / self.max_durability as f32).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// ToolPredicate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HasModifierPredicate {
    pub modifier: String,
    pub min_level: i32,
}

/// Inclusive on both ends. Fails when the stat is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRangePredicate {
    pub stat: String,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolPredicate {
    Any,
    Broken,
    HasModifier(HasModifierPredicate),
    StatInRange(StatRangePredicate),
    And(Vec<ToolPredicate>),
    Or(Vec<ToolPredicate>),
    Inverted(Box<ToolPredicate>),
}

impl Predicate<ToolContext> for ToolPredicate {
    fn matches(&self, tool: &ToolContext) -> bool {
        match self {
            Self::Any => true,
            Self::Broken => tool.broken,
            Self::HasModifier(p) => tool.modifier_level(&p.modifier) >= p.min_level,
            Self::StatInRange(p) => tool
                .stat(&p.stat)
                .is_some_and(|value| value >= p.min && value <= p.max),
            Self::And(children) => all_match(children, tool),
            Self::Or(children) => any_match(children, tool),
            Self::Inverted(inner) => !inner.matches(tool),
        }
    }
}

impl PredicateUnion for ToolPredicate {
    fn and(children: Vec<Self>) -> Self {
        Self::And(children)
    }

    fn or(children: Vec<Self>) -> Self {
        Self::Or(children)
    }

    fn inverted(inner: Self) -> Self {
        Self::Inverted(Box::new(inner))
    }

    fn as_and(&self) -> Option<&Vec<Self>> {
        match self {
            Self::And(children) => Some(children),
            _ => None,
        }
    }

    fn as_or(&self) -> Option<&Vec<Self>> {
        match self {
            Self::Or(children) => Some(children),
            _ => None,
        }
    }

    fn as_inverted(&self) -> Option<&Self> {
        match self {
            Self::Inverted(inner) => Some(&**inner),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ToolVariable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StatVariable {
    pub stat: String,
    /// Used when the tool lacks the stat.
    pub fallback: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalVariable {
    pub condition: ToolPredicate,
    pub if_true: ToolVariable,
    pub if_false: ToolVariable,
}

/// A number read from a tool for a custom formula slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolVariable {
    Constant(f32),
    Stat(StatVariable),
    ModifierLevel(String),
    Durability,
    DurabilityPercent,
    Conditional(Box<ConditionalVariable>),
}

impl ToolVariable {
    pub fn compute(&self, tool: &ToolContext) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::Stat(v) => tool.stat(&v.stat).unwrap_or(v.fallback),
            Self::ModifierLevel(modifier) => tool.modifier_level(modifier) as f32,
            Self::Durability => tool.durability as f32,
            Self::DurabilityPercent => tool.durability_percent(),
            Self::Conditional(c) => {
                if c.condition.matches(tool) {
                    c.if_true.compute(tool)
                } else {
                    c.if_false.compute(tool)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// The tool predicate and tool variable registries, built once per reload.
#[derive(Debug, Clone)]
pub struct ToolLoaders {
    pub predicates: Arc<GenericLoaderRegistry<ToolPredicate>>,
    pub variables: Arc<GenericLoaderRegistry<ToolVariable>>,
}

impl ToolLoaders {
    pub fn new() -> Result<Self, RegistryError> {
        let predicates = Arc::new(predicate_registry()?);
        let variables = variable_registry(&predicates)?;
        Ok(Self {
            predicates,
            variables,
        })
    }
}

fn predicate_registry() -> Result<GenericLoaderRegistry<ToolPredicate>, RegistryError> {
    let mut b = GenericLoaderRegistry::builder("tool_predicate");
    b.register_singleton("any", ToolPredicate::Any, |p| matches!(p, ToolPredicate::Any))?;
    b.register_singleton("broken", ToolPredicate::Broken, |p| {
        matches!(p, ToolPredicate::Broken)
    })?;
    b.register(
        "has_modifier",
        RecordLoadable::new(
            (
                TextLoadable::NON_EMPTY
                    .required_field("modifier", |p: &HasModifierPredicate| &p.modifier),
                IntLoadable::POSITIVE
                    .default_field("min_level", 1, |p: &HasModifierPredicate| &p.min_level),
            ),
            |(modifier, min_level)| {
                Ok(HasModifierPredicate {
                    modifier,
                    min_level,
                })
            },
        ),
        ToolPredicate::HasModifier,
        |p| match p {
            ToolPredicate::HasModifier(inner) => Some(inner),
            _ => None,
        },
    )?;
    b.register(
        "stat_in_range",
        RecordLoadable::new(
            (
                TextLoadable::NON_EMPTY.required_field("stat", |p: &StatRangePredicate| &p.stat),
                FloatLoadable::ANY.default_field("min", f32::NEG_INFINITY, |p: &StatRangePredicate| {
                    &p.min
                }),
                FloatLoadable::ANY.default_field("max", f32::INFINITY, |p: &StatRangePredicate| {
                    &p.max
                }),
            ),
            |(stat, min, max)| {
                if min > max {
                    return Err(format!("min {min} is greater than max {max}"));
                }
                Ok(StatRangePredicate { stat, min, max })
            },
        ),
        ToolPredicate::StatInRange,
        |p| match p {
            ToolPredicate::StatInRange(inner) => Some(inner),
            _ => None,
        },
    )?;
    register_combinators(&mut b)?;
    Ok(b.build())
}

fn variable_registry(
    predicates: &Arc<GenericLoaderRegistry<ToolPredicate>>,
) -> Result<Arc<GenericLoaderRegistry<ToolVariable>>, RegistryError> {
    GenericLoaderRegistry::build_cyclic("tool_variable", |b, this| {
        b.register(
            "constant",
            RecordLoadable::new(
                (FloatLoadable::FINITE.required_field("value", |v: &f32| v),),
                |(value,)| Ok(value),
            ),
            ToolVariable::Constant,
            |v| match v {
                ToolVariable::Constant(value) => Some(value),
                _ => None,
            },
        )?;
        b.register(
            "stat",
            RecordLoadable::new(
                (
                    TextLoadable::NON_EMPTY.required_field("stat", |v: &StatVariable| &v.stat),
                    FloatLoadable::FINITE.default_field("fallback", 0.0, |v: &StatVariable| {
                        &v.fallback
                    }),
                ),
                |(stat, fallback)| Ok(StatVariable { stat, fallback }),
            ),
            ToolVariable::Stat,
            |v| match v {
                ToolVariable::Stat(inner) => Some(inner),
                _ => None,
            },
        )?;
        b.register(
            "modifier_level",
            RecordLoadable::new(
                (TextLoadable::NON_EMPTY.required_field("modifier", |m: &String| m),),
                |(modifier,)| Ok(modifier),
            ),
            ToolVariable::ModifierLevel,
            |v| match v {
                ToolVariable::ModifierLevel(modifier) => Some(modifier),
                _ => None,
            },
        )?;
        b.register_singleton("durability", ToolVariable::Durability, |v| {
            matches!(v, ToolVariable::Durability)
        })?;
        b.register_singleton("durability_percent", ToolVariable::DurabilityPercent, |v| {
            matches!(v, ToolVariable::DurabilityPercent)
        })?;
        b.register(
            "conditional",
            RecordLoadable::new(
                (
                    Arc::clone(predicates)
                        .required_field("condition", |c: &ConditionalVariable| &c.condition),
                    this.clone()
                        .required_field("if_true", |c: &ConditionalVariable| &c.if_true),
                    this.required_field("if_false", |c: &ConditionalVariable| &c.if_false),
                ),
                |(condition, if_true, if_false)| {
                    Ok(ConditionalVariable {
                        condition,
                        if_true,
                        if_false,
                    })
                },
            ),
            |c| ToolVariable::Conditional(Box::new(c)),
            |v| match v {
                ToolVariable::Conditional(c) => Some(c.as_ref()),
                _ => None,
            },
        )
    })
}

// ===========================================================================
// Tests
// ===========================================================================
