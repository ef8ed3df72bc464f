//! The constraint store: an arena of every constraint ever allocated during
//! a solve, plus the active/inactive worklist split the simplifier and
//! solver pull from. Grounded on the active/inactive intrusive lists
//! `ConstraintSystem` keeps in the original compiler, reworked onto
//! `la_arena::Arena` the way the rest of this crate represents owned,
//! append-only collections (`ast.rs`'s `Arena<Expr>`, `locator.rs`'s
//! interned path arena).

use la_arena::{Arena, Idx};

use crate::constraint::{Constraint, ConstraintKind};
use crate::types::TypeVarId;

pub type ConstraintId = Idx<Constraint>;

impl Constraint {
    /// The type variables directly mentioned by this constraint's operand
    /// types, used by the graph's all-mentions gather mode and by the
    /// generator's adjacency bookkeeping.
    pub fn operand_type_variables(&self) -> Vec<TypeVarId> {
        fn collect(ty: &crate::types::Type, out: &mut Vec<TypeVarId>) {
            match ty {
                crate::types::Type::TypeVariable(id) => out.push(*id),
                crate::types::Type::Nominal { parent, generic_args, .. } => {
                    if let Some(p) = parent.as_deref() {
                        collect(p, out);
                    }
                    for a in generic_args.iter() {
                        collect(a, out);
                    }
                }
                crate::types::Type::Tuple(elems) => {
                    for e in elems.iter() {
                        collect(&e.ty, out);
                    }
                }
                crate::types::Type::Function { params, result, .. } => {
                    for p in params.iter() {
                        collect(&p.ty, out);
                    }
                    collect(result, out);
                }
                crate::types::Type::Metatype(t)
                | crate::types::Type::Optional(t)
                | crate::types::Type::LValue(t)
                | crate::types::Type::InOut(t) => collect(t, out),
                crate::types::Type::DependentMember { base, .. } => collect(base, out),
                crate::types::Type::Existential(_) | crate::types::Type::Unbound(_) | crate::types::Type::Error => {}
            }
        }

        let mut out = Vec::new();
        match &self.kind {
            ConstraintKind::Bind(a, b)
            | ConstraintKind::Equal(a, b)
            | ConstraintKind::Subtype(a, b)
            | ConstraintKind::Conversion(a, b)
            | ConstraintKind::ArgumentConversion(a, b)
            | ConstraintKind::OperatorArgumentConversion(a, b)
            | ConstraintKind::BridgingConversion(a, b)
            | ConstraintKind::CheckedCast(a, b)
            | ConstraintKind::DynamicTypeOf(a, b)
            | ConstraintKind::OptionalObject { optional: a, object: b }
            | ConstraintKind::EscapableFunctionOf(a, b)
            | ConstraintKind::OpenedExistentialOf(a, b)
            | ConstraintKind::Restricted { lhs: a, rhs: b, .. } => {
                collect(a, &mut out);
                collect(b, &mut out);
            }
            ConstraintKind::LiteralConformsTo(a, _)
            | ConstraintKind::ConformsTo(a, _)
            | ConstraintKind::SelfObjectOfProtocol(a, _) => collect(a, &mut out),
            ConstraintKind::Member { base, result, .. } | ConstraintKind::UnresolvedMember { base, result, .. } => {
                collect(base, &mut out);
                collect(result, &mut out);
            }
            ConstraintKind::Defaultable { target, default } => {
                collect(target, &mut out);
                collect(default, &mut out);
            }
            ConstraintKind::ApplicableFunction { function, call } => {
                collect(function, &mut out);
                collect(call, &mut out);
            }
            ConstraintKind::KeyPath { key_path, root, value }
            | ConstraintKind::KeyPathApplication { key_path, root, value } => {
                collect(key_path, &mut out);
                collect(root, &mut out);
                collect(value, &mut out);
            }
            ConstraintKind::BindOverload(b) => out.push(b.target),
            ConstraintKind::Disjunction(terms) | ConstraintKind::Conjunction(terms) => {
                for t in terms {
                    out.extend(t.operand_type_variables());
                }
            }
        }
        out
    }
}

/// Where a constraint currently sits in the solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Active,
    Inactive,
    /// Consumed by `merge`/`bind` and will never be re-simplified, but kept
    /// in the arena so its `ConstraintId` stays valid for anyone still
    /// holding one (e.g. a `Solution::fixes` entry).
    Retired,
}

/// Owns every constraint allocated during a solve, split into the active
/// worklist and the inactive set the graph re-activates as bindings land.
pub struct ConstraintStore {
    constraints: Arena<Constraint>,
    lifecycle: Vec<Lifecycle>,
    active: Vec<ConstraintId>,
}

impl ConstraintStore {
    pub fn new() -> Self {
        ConstraintStore { constraints: Arena::new(), lifecycle: Vec::new(), active: Vec::new() }
    }

    pub fn push_active(&mut self, c: Constraint) -> ConstraintId {
        let id = self.constraints.alloc(c);
        self.lifecycle.push(Lifecycle::Active);
        self.active.push(id);
        id
    }

    pub fn push_inactive(&mut self, c: Constraint) -> ConstraintId {
        let id = self.constraints.alloc(c);
        self.lifecycle.push(Lifecycle::Inactive);
        id
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id]
    }

    pub fn is_active(&self, id: ConstraintId) -> bool {
        self.lifecycle[id_index(id)] == Lifecycle::Active
    }

    pub fn is_inactive(&self, id: ConstraintId) -> bool {
        self.lifecycle[id_index(id)] == Lifecycle::Inactive
    }

    /// Moves a constraint from active to inactive, e.g. because simplifying
    /// it determined it can't make progress until a variable gets bound.
    pub fn deactivate(&mut self, id: ConstraintId) {
        if let Some(pos) = self.active.iter().position(|x| *x == id) {
            self.active.remove(pos);
        }
        self.lifecycle[id_index(id)] = Lifecycle::Inactive;
    }

    /// Moves a constraint from inactive back onto the active worklist.
    pub fn reactivate(&mut self, id: ConstraintId) {
        if self.lifecycle[id_index(id)] == Lifecycle::Inactive {
            self.lifecycle[id_index(id)] = Lifecycle::Active;
            self.active.push(id);
        }
    }

    /// Removes a constraint from the worklist permanently, e.g. once
    /// `merge`/`bind` has fully consumed it.
    pub fn retire(&mut self, id: ConstraintId) {
        if let Some(pos) = self.active.iter().position(|x| *x == id) {
            self.active.remove(pos);
        }
        self.lifecycle[id_index(id)] = Lifecycle::Retired;
    }

    /// Pops one constraint off the active worklist, FIFO, matching the
    /// breadth-first simplification order the generator relies on for
    /// deterministic diagnostics.
    pub fn pop_active(&mut self) -> Option<ConstraintId> {
        if self.active.is_empty() {
            None
        } else {
            Some(self.active.remove(0))
        }
    }

    pub fn push_front_active(&mut self, id: ConstraintId) {
        self.active.insert(0, id);
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Every constraint currently inactive, for the solver's disjunction
    /// selection scan (§4.8.1), which needs to look for live disjunctions
    /// rather than just pop the FIFO active worklist.
    pub fn inactive_ids(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.lifecycle
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == Lifecycle::Inactive)
            .map(|(i, _)| Idx::from_raw(la_arena::RawIdx::from(i as u32)))
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// A snapshot of the store's mutable lengths, used by `SolverScope` to
    /// undo everything allocated/moved since the scope opened.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot { constraint_count: self.constraints.len(), lifecycle: self.lifecycle.clone(), active: self.active.clone() }
    }

    pub fn rollback_to(&mut self, snap: StoreSnapshot) {
        self.constraints.truncate(snap.constraint_count);
        self.lifecycle = snap.lifecycle;
        self.active = snap.active;
    }
}

impl Default for ConstraintStore {
    fn default() -> Self {
        Self::new()
    }
}

fn id_index(id: ConstraintId) -> usize {
    u32::from(id.into_raw()) as usize
}

/// Snapshot of a [`ConstraintStore`]'s mutable state, opaque to callers
/// beyond feeding it back to [`ConstraintStore::rollback_to`].
#[derive(Clone)]
pub struct StoreSnapshot {
    constraint_count: usize,
    lifecycle: Vec<Lifecycle>,
    active: Vec<ConstraintId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::LocatorAllocator;
    use crate::types::Type;

    fn dummy_locator() -> crate::locator::Locator {
        let mut expr_arena = la_arena::Arena::new();
        let anchor = expr_arena.alloc(crate::ast::Expr::IntegerLiteral);
        let mut locs = LocatorAllocator::new();
        locs.get_locator(anchor, vec![])
    }

    #[test]
    fn active_worklist_is_fifo() {
        let mut store = ConstraintStore::new();
        let loc = dummy_locator();
        let a = store.push_active(Constraint::new(ConstraintKind::Equal(Type::Error, Type::Error), loc));
        let b = store.push_active(Constraint::new(ConstraintKind::Equal(Type::Error, Type::Error), loc));
        assert_eq!(store.pop_active(), Some(a));
        assert_eq!(store.pop_active(), Some(b));
        assert_eq!(store.pop_active(), None);
    }

    #[test]
    fn deactivate_then_reactivate_restores_membership() {
        let mut store = ConstraintStore::new();
        let loc = dummy_locator();
        let a = store.push_active(Constraint::new(ConstraintKind::Equal(Type::Error, Type::Error), loc));
        store.deactivate(a);
        assert!(store.is_inactive(a));
        assert_eq!(store.active_len(), 0);
        store.reactivate(a);
        assert!(store.is_active(a));
        assert_eq!(store.active_len(), 1);
    }

    #[test]
    fn rollback_undoes_allocations_and_moves() {
        let mut store = ConstraintStore::new();
        let loc = dummy_locator();
        let a = store.push_active(Constraint::new(ConstraintKind::Equal(Type::Error, Type::Error), loc));
        let snap = store.snapshot();
        store.deactivate(a);
        let _b = store.push_active(Constraint::new(ConstraintKind::Equal(Type::Error, Type::Error), loc));
        assert_eq!(store.len(), 2);
        store.rollback_to(snap);
        assert_eq!(store.len(), 1);
        assert!(store.is_active(a));
    }
}
