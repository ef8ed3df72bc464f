//! The constraint graph: an undirected graph whose nodes are type
//! variables and whose edges are the constraints mentioning them.
//! Union-find equivalence classes are backed by `ena`'s
//! `InPlaceUnificationTable`, the same crate `hir_ty` uses for its own
//! inference-variable unification (`infer/unify.rs`'s
//! `var_unification_table`), including its built-in transactional
//! snapshot/rollback support — which is exactly the undo facility a
//! scoped solver needs, so the solver scope delegates graph rollback to
//! `ena` rather than hand-rolling a journal for this part.
//!
//! Deviation recorded in DESIGN.md: representative choice on merge is not
//! "the smaller id wins" but whatever `ena` picks by rank, for amortized
//! `find()`. Nothing in the core relies on which side's id survives — only
//! that `find()` is stable, idempotent, and that the two classes'
//! `OptionFlags` combine by the documented rule (both bits must be set in
//! both inputs to survive).

use ena::unify::{InPlace, InPlaceUnificationTable, NoError, Snapshot, UnifyKey, UnifyValue};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::constraint::Constraint;
use crate::store::{ConstraintId, ConstraintStore};
use crate::types::{OptionFlags, Type, TypeVarId};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct VarKey(u32);

impl UnifyKey for VarKey {
    type Value = VarValue;
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> Self {
        VarKey(u)
    }
    fn tag() -> &'static str {
        "TypeVar"
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct VarValue {
    pub fixed: Option<Type>,
    pub options: OptionFlags,
}

impl UnifyValue for VarValue {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, NoError> {
        // By the time the simplifier calls `merge`, it has already checked
        // the two variables' fixed bindings (if any) for compatibility via
        // `matchTypes`; this just picks whichever side actually carries a
        // fixed binding.
        let fixed = a.fixed.clone().or_else(|| b.fixed.clone());
        Ok(VarValue { fixed, options: a.options & b.options })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// Whether this variable participates in any non-trivial relation.
    pub has_nontrivial_relation: bool,
}

/// How [`ConstraintGraph::gather`] collects the constraints touching a
/// variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatherMode {
    VarOnly,
    EquivalenceClass,
    /// Transitively follow fixed-type references until a fixed point —
    /// required to produce complete worklists after a binding.
    AllMentions,
}

pub struct ConstraintGraph {
    table: InPlaceUnificationTable<VarKey>,
    adjacency: Vec<SmallVec<[ConstraintId; 4]>>,
    node_flags: Vec<NodeFlags>,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        ConstraintGraph { table: InPlaceUnificationTable::new(), adjacency: Vec::new(), node_flags: Vec::new() }
    }

    /// Creates a fresh node (and therefore a fresh type variable id —
    /// callers should treat the returned id as canonical).
    pub fn new_variable(&mut self, options: OptionFlags) -> TypeVarId {
        let key = self.table.new_key(VarValue { fixed: None, options });
        self.adjacency.push(SmallVec::new());
        self.node_flags.push(NodeFlags::default());
        TypeVarId(key.index())
    }

    pub fn num_variables(&self) -> u32 {
        self.adjacency.len() as u32
    }

    fn key(var: TypeVarId) -> VarKey {
        VarKey(var.0)
    }

    pub fn find(&mut self, var: TypeVarId) -> TypeVarId {
        TypeVarId(self.table.find(Self::key(var)).index())
    }

    pub fn fixed_binding(&mut self, var: TypeVarId) -> Option<Type> {
        self.table.probe_value(Self::key(var)).fixed
    }

    pub fn options(&mut self, var: TypeVarId) -> OptionFlags {
        self.table.probe_value(Self::key(var)).options
    }

    /// Records that `var`'s equivalence class has fixed type `ty`, and
    /// re-activates its adjacency so the worklist picks the affected
    /// constraints back up.
    pub fn bind(&mut self, var: TypeVarId, ty: Type, store: &mut ConstraintStore) {
        let key = Self::key(var);
        let mut value = self.table.probe_value(key);
        value.fixed = Some(ty);
        self.table.union_value(key, value);
        for c in self.gather(var, GatherMode::EquivalenceClass, store) {
            store.reactivate(c);
        }
    }

    /// Unions two equivalence classes.
    pub fn merge(&mut self, v1: TypeVarId, v2: TypeVarId) {
        self.table.union(Self::key(v1), Self::key(v2));
    }

    pub fn add_constraint(&mut self, var: TypeVarId, c: ConstraintId) {
        self.adjacency[var.0 as usize].push(c);
        self.node_flags[var.0 as usize].has_nontrivial_relation = true;
    }

    pub fn remove_constraint(&mut self, var: TypeVarId, c: ConstraintId) {
        if let Some(pos) = self.adjacency[var.0 as usize].iter().position(|x| *x == c) {
            self.adjacency[var.0 as usize].remove(pos);
        }
    }

    /// Collects constraints for a variable per `mode`.
    pub fn gather(&mut self, v: TypeVarId, mode: GatherMode, store: &ConstraintStore) -> Vec<ConstraintId> {
        match mode {
            GatherMode::VarOnly => self.adjacency[v.0 as usize].to_vec(),
            GatherMode::EquivalenceClass => self.gather_class(v),
            GatherMode::AllMentions => self.gather_all_mentions(v, store),
        }
    }

    fn members_of_class(&mut self, v: TypeVarId) -> Vec<TypeVarId> {
        let root = self.find(v);
        let n = self.adjacency.len() as u32;
        (0..n)
            .map(TypeVarId)
            .filter(|&w| self.find(w) == root)
            .collect()
    }

    fn gather_class(&mut self, v: TypeVarId) -> Vec<ConstraintId> {
        let mut out = Vec::new();
        for w in self.members_of_class(v) {
            out.extend(self.adjacency[w.0 as usize].iter().copied());
        }
        out
    }

    fn gather_all_mentions(&mut self, v: TypeVarId, store: &ConstraintStore) -> Vec<ConstraintId> {
        let mut seen_vars: FxHashSet<TypeVarId> = FxHashSet::default();
        let mut worklist: Vec<TypeVarId> = self.members_of_class(v);
        let mut result_constraints: FxHashSet<ConstraintId> = FxHashSet::default();

        while let Some(w) = worklist.pop() {
            let root = self.find(w);
            if !seen_vars.insert(root) {
                continue;
            }
            let adjacent = self.adjacency[w.0 as usize].clone();
            for cid in adjacent {
                result_constraints.insert(cid);
                for other in store.constraint(cid).operand_type_variables() {
                    if self.fixed_binding(other).is_some() {
                        worklist.push(other);
                    }
                }
            }
        }
        result_constraints.into_iter().collect()
    }

    pub fn node_flags(&self, v: TypeVarId) -> NodeFlags {
        self.node_flags[v.0 as usize]
    }

    pub fn snapshot(&mut self) -> Snapshot<InPlace<VarKey>> {
        self.table.snapshot()
    }

    pub fn rollback_to(&mut self, snapshot: Snapshot<InPlace<VarKey>>) {
        self.table.rollback_to(snapshot);
    }

    pub fn commit(&mut self, snapshot: Snapshot<InPlace<VarKey>>) {
        self.table.commit(snapshot);
    }
}

impl Default for ConstraintGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::LocatorAllocator;

    fn fresh() -> (ConstraintGraph, ConstraintStore, la_arena::Idx<crate::ast::Expr>) {
        let mut arena = la_arena::Arena::new();
        let anchor = arena.alloc(crate::ast::Expr::IntegerLiteral);
        (ConstraintGraph::new(), ConstraintStore::new(), anchor)
    }

    #[test]
    fn merge_unifies_classes() {
        let (mut graph, _store, _anchor) = fresh();
        let a = graph.new_variable(OptionFlags::NONE);
        let b = graph.new_variable(OptionFlags::NONE);
        assert_ne!(graph.find(a), graph.find(b));
        graph.merge(a, b);
        assert_eq!(graph.find(a), graph.find(b));
    }

    #[test]
    fn bind_reactivates_adjacency() {
        let (mut graph, mut store, anchor) = fresh();
        let mut locs = LocatorAllocator::new();
        let a = graph.new_variable(OptionFlags::NONE);
        let loc = locs.get_locator(anchor, vec![]);
        let cid = store.push_active(Constraint::new(
            crate::constraint::ConstraintKind::Defaultable {
                target: Type::TypeVariable(a),
                default: Type::Error,
            },
            loc,
        ));
        graph.add_constraint(a, cid);
        store.deactivate(cid);
        assert!(store.is_inactive(cid));
        graph.bind(a, Type::Error, &mut store);
        assert!(store.is_active(cid));
    }

    #[test]
    fn option_flags_merge_clears_unless_both_set() {
        let (mut graph, _store, _anchor) = fresh();
        let a = graph.new_variable(OptionFlags::CAN_BIND_LVALUE);
        let b = graph.new_variable(OptionFlags::NONE);
        graph.merge(a, b);
        let root = graph.find(a);
        assert!(!graph.options(root).contains(OptionFlags::CAN_BIND_LVALUE));
    }
}
