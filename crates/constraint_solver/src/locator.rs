//! Constraint locators: a hash-consed path from an anchor AST node through
//! structural steps. Locators are the naming scheme for everything the
//! solver records — constraints, opened generics, selected overloads,
//! diagnostics all key off a `Locator`.
//!
//! Hash-consing is delegated to [`la_arena::Interner`]; once interned,
//! `Locator` equality is plain `Idx` equality — pointer equality, not a
//! recursive structural comparison.

use la_arena::{Idx, Interner};

use crate::ast::ExprId;

/// A single structural step appended to a locator path: function argument
/// #k, result, member lookup, tuple element, subscript index, generic
/// opening, key path component, and so on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathElement {
    FunctionArgument(u32),
    FunctionResult,
    Member(std::sync::Arc<str>),
    TupleElement(u32),
    SubscriptIndex,
    GenericParameter(u32),
    OpenedGeneric,
    KeyPathComponent(u32),
    OptionalPayload,
    ContextualType,
    ApplyArgument,
    ApplyFunction,
    ArrayElement,
    DictionaryKey,
    DictionaryValue,
    ConditionalOperand(bool),
    InOutOperand,
}

/// Summary flags computed over a path, letting callers reject a gathered
/// locator cheaply without walking its full path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathSummaryFlags {
    pub has_function_argument: bool,
    pub has_member: bool,
    pub has_generic_parameter: bool,
    pub has_key_path_component: bool,
}

impl PathSummaryFlags {
    fn compute(path: &[PathElement]) -> Self {
        let mut flags = PathSummaryFlags::default();
        for step in path {
            match step {
                PathElement::FunctionArgument(_) => flags.has_function_argument = true,
                PathElement::Member(_) => flags.has_member = true,
                PathElement::GenericParameter(_) => flags.has_generic_parameter = true,
                PathElement::KeyPathComponent(_) => flags.has_key_path_component = true,
                _ => {}
            }
        }
        flags
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct LocatorData {
    anchor: ExprId,
    path: Vec<PathElement>,
}

/// A hash-consed locator handle. Cheap to copy, compares by identity once
/// interned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Locator(Idx<LocatorData>);

/// Owns the hash-consing table locators are interned inside.
#[derive(Default)]
pub struct LocatorAllocator {
    interner: Interner<LocatorData>,
}

impl LocatorAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get_locator(anchor, path)`: hash-conses a full path into a
    /// `Locator`.
    pub fn get_locator(&mut self, anchor: ExprId, path: Vec<PathElement>) -> Locator {
        Locator(self.interner.intern(LocatorData { anchor, path }))
    }

    /// The builder variant: append a single `PathElement` onto an existing
    /// locator's path without requiring the caller to rebuild the whole
    /// path vector by hand.
    pub fn extend(&mut self, base: Locator, step: PathElement) -> Locator {
        let mut path = self.interner.lookup(base.0).path.clone();
        let anchor = self.interner.lookup(base.0).anchor;
        path.push(step);
        self.get_locator(anchor, path)
    }

    pub fn anchor(&self, locator: Locator) -> ExprId {
        self.interner.lookup(locator.0).anchor
    }

    pub fn path(&self, locator: Locator) -> &[PathElement] {
        &self.interner.lookup(locator.0).path
    }

    pub fn summary_flags(&self, locator: Locator) -> PathSummaryFlags {
        PathSummaryFlags::compute(self.path(locator))
    }

    pub fn len(&self) -> usize {
        self.interner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use la_arena::Arena;

    fn dummy_anchor() -> ExprId {
        let mut arena = Arena::new();
        arena.alloc(Expr::IntegerLiteral)
    }

    #[test]
    fn same_path_interns_to_same_locator() {
        let mut alloc = LocatorAllocator::new();
        let anchor = dummy_anchor();
        let a = alloc.get_locator(anchor, vec![PathElement::FunctionArgument(0)]);
        let b = alloc.get_locator(anchor, vec![PathElement::FunctionArgument(0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_paths_intern_differently() {
        let mut alloc = LocatorAllocator::new();
        let anchor = dummy_anchor();
        let a = alloc.get_locator(anchor, vec![PathElement::FunctionArgument(0)]);
        let b = alloc.get_locator(anchor, vec![PathElement::FunctionArgument(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn extend_builds_on_existing_path() {
        let mut alloc = LocatorAllocator::new();
        let anchor = dummy_anchor();
        let base = alloc.get_locator(anchor, vec![PathElement::ApplyFunction]);
        let extended = alloc.extend(base, PathElement::FunctionArgument(2));
        assert_eq!(alloc.path(extended), &[PathElement::ApplyFunction, PathElement::FunctionArgument(2)]);
        assert!(alloc.summary_flags(extended).has_function_argument);
    }
}
