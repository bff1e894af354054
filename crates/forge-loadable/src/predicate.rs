//! Boolean predicates over a context, and the generic `and` / `or` /
//! `inverted` variants shared by every predicate union.

use crate::registry::{RegistryBuilder, RegistryError};

/// Tests a context value.
pub trait Predicate<C: ?Sized> {
    fn matches(&self, context: &C) -> bool;
}

/// True if every predicate matches. Stops at the first failure.
pub fn all_match<C: ?Sized, P: Predicate<C>>(predicates: &[P], context: &C) -> bool {
    predicates.iter().all(|p| p.matches(context))
}

/// True if any predicate matches. Stops at the first success.
pub fn any_match<C: ?Sized, P: Predicate<C>>(predicates: &[P], context: &C) -> bool {
    predicates.iter().any(|p| p.matches(context))
}

/// A predicate sum type with variants for the three logical combinators.
pub trait PredicateUnion: Sized + 'static {
    fn and(children: Vec<Self>) -> Self;
    fn or(children: Vec<Self>) -> Self;
    fn inverted(inner: Self) -> Self;

    fn as_and(&self) -> Option<&Vec<Self>>;
    fn as_or(&self) -> Option<&Vec<Self>>;
    fn as_inverted(&self) -> Option<&Self>;
}

/// Register `and` and `or` (children under `predicates`, at least one) and
/// `inverted` (child under `predicate`).
pub fn register_combinators<T: PredicateUnion>(
    builder: &mut RegistryBuilder<T>,
) -> Result<(), RegistryError> {
    builder.register_nested_list("and", "predicates", 1, T::and, T::as_and)?;
    builder.register_nested_list("or", "predicates", 1, T::or, T::as_or)?;
    builder.register_nested("inverted", "predicate", T::inverted, T::as_inverted)
}

// ===========================================================================
// Tests
// ===========================================================================
