//! Binding inference: for a free type variable, gather every candidate
//! type the constraints touching it suggest, and rank variables against
//! each other so the solver knows which one to assign next. Modeled on
//! the original compiler's `ConstraintSystem::getPotentialBindings` and
//! its `TypeVariableBinding` ordering heuristic — a variable's candidate
//! set is read off its equivalence class's adjacency in the constraint
//! graph rather than recomputed from scratch on every solver step.

use itertools::Itertools;

use crate::collab::SharedCollaborators;
use crate::constraint::ConstraintKind;
use crate::generate::LangItems;
use crate::graph::{ConstraintGraph, GatherMode};
use crate::store::{ConstraintId, ConstraintStore};
use crate::types::{Type, TypeVarId};

/// How a [`PotentialBinding`] relates its candidate type to the variable
/// it was gathered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Exact,
    Subtype,
    Supertype,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PotentialBinding {
    pub ty: Type,
    pub kind: BindingKind,
    pub source: ConstraintId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralBindingKind {
    None,
    Collection,
    Float,
    Atom,
}

/// Everything gathered about one free variable, enough both to drive the
/// solver's binding loop and to order it against its siblings.
#[derive(Clone, Debug)]
pub struct VariableBindings {
    pub var: TypeVarId,
    pub bindings: Vec<PotentialBinding>,
    pub fully_bound: bool,
    pub subtype_of_existential: bool,
    pub literal_kind: LiteralBindingKind,
    pub num_defaultable: usize,
}

fn literal_kind_for(lang: &LangItems, protocol: crate::types::ProtocolId) -> LiteralBindingKind {
    if protocol == lang.expressible_by_array_literal || protocol == lang.expressible_by_dictionary_literal {
        LiteralBindingKind::Collection
    } else if protocol == lang.expressible_by_float_literal {
        LiteralBindingKind::Float
    } else {
        LiteralBindingKind::Atom
    }
}

/// Collects every [`PotentialBinding`] for `var` by walking its
/// equivalence class's adjacency in `graph`, classifying each touching
/// constraint per §4.7's rules.
pub fn gather_bindings(
    graph: &mut ConstraintGraph,
    store: &ConstraintStore,
    collab: &SharedCollaborators,
    lang: &LangItems,
    var: TypeVarId,
) -> VariableBindings {
    let root = graph.find(var);
    let mut bindings = Vec::new();
    let mut fully_bound = false;
    let mut literal_kind = LiteralBindingKind::None;
    let mut num_defaultable = 0usize;
    let mut bind_partners: Vec<Type> = Vec::new();

    for id in graph.gather(root, GatherMode::EquivalenceClass, store) {
        let c = store.constraint(id);
        match &c.kind {
            ConstraintKind::Bind(a, b) | ConstraintKind::Equal(a, b) => {
                let a_is_root = a.as_type_variable().map(|v| graph.find(v)) == Some(root);
                let b_is_root = b.as_type_variable().map(|v| graph.find(v)) == Some(root);
                let other = if a_is_root { Some(b) } else if b_is_root { Some(a) } else { None };
                if let Some(other) = other {
                    if !other.has_type_variable() {
                        bindings.push(PotentialBinding { ty: other.clone(), kind: BindingKind::Exact, source: id });
                    }
                    bind_partners.push(other.clone());
                }
            }
            ConstraintKind::Subtype(a, b) => {
                if a.as_type_variable().map(|v| graph.find(v)) == Some(root) && !b.has_type_variable() {
                    bindings.push(PotentialBinding { ty: b.clone(), kind: BindingKind::Subtype, source: id });
                } else if b.as_type_variable().map(|v| graph.find(v)) == Some(root) && !a.has_type_variable() {
                    bindings.push(PotentialBinding { ty: a.clone(), kind: BindingKind::Supertype, source: id });
                }
            }
            ConstraintKind::Conversion(a, b) | ConstraintKind::ArgumentConversion(a, b) => {
                if a.as_type_variable().map(|v| graph.find(v)) == Some(root) && !b.has_type_variable() {
                    bindings.push(PotentialBinding { ty: b.clone(), kind: BindingKind::Supertype, source: id });
                }
            }
            ConstraintKind::LiteralConformsTo(a, protocol) => {
                if a.as_type_variable().map(|v| graph.find(v)) == Some(root) {
                    if let Some(default_ty) = collab.default_type_for(*protocol) {
                        bindings.push(PotentialBinding { ty: default_ty, kind: BindingKind::Exact, source: id });
                        num_defaultable += 1;
                        literal_kind = literal_kind_for(lang, *protocol);
                    }
                }
            }
            ConstraintKind::Defaultable { target, default } => {
                if target.as_type_variable().map(|v| graph.find(v)) == Some(root) {
                    bindings.push(PotentialBinding { ty: default.clone(), kind: BindingKind::Exact, source: id });
                    num_defaultable += 1;
                }
            }
            _ => {}
        }
    }

    // `FullyBound`: the variable was forced equal to something else by at
    // least two distinct `Bind`/`Equal` partners — a single partner is just
    // its one binding, not evidence of over-constraint.
    if bind_partners.iter().unique().count() > 1 {
        fully_bound = true;
    }

    let subtype_of_existential =
        !bindings.is_empty() && bindings.iter().all(|b| matches!(b.ty, Type::Existential(_)));

    VariableBindings { var: root, bindings, fully_bound, subtype_of_existential, literal_kind, num_defaultable }
}

/// The ordering key from §4.7: `(has-non-defaultable, not-fully-bound,
/// not-existential-only, involves-type-variables, literal-kind,
/// -candidate-count)`, compared lexicographically — lower sorts first.
/// Each "good" boolean is negated so that `true` (good) maps to `false`
/// (0), which sorts ahead of `true` (1) under the derived `Ord`.
pub fn ordering_key(vb: &VariableBindings) -> (bool, bool, bool, bool, u8, i64) {
    let has_non_defaultable = vb.bindings.len() > vb.num_defaultable;
    let not_fully_bound = !vb.fully_bound;
    let not_existential_only = !vb.subtype_of_existential;
    let involves_type_variables = vb.bindings.iter().any(|b| b.ty.has_type_variable());
    let literal_rank = match vb.literal_kind {
        LiteralBindingKind::None => 0,
        LiteralBindingKind::Collection => 1,
        LiteralBindingKind::Float => 2,
        LiteralBindingKind::Atom => 3,
    };
    if !has_non_defaultable {
        cov_mark::hit!(defaultable_binding_only);
    }
    (
        !has_non_defaultable,
        !not_fully_bound,
        !not_existential_only,
        involves_type_variables,
        literal_rank,
        -(vb.bindings.len() as i64),
    )
}

/// Orders `var`'s own candidates by kind — exact first, then subtype, then
/// supertype — the order the solver's binding loop tries them in.
pub fn order_bindings(vb: &VariableBindings) -> Vec<PotentialBinding> {
    fn rank(k: BindingKind) -> u8 {
        match k {
            BindingKind::Exact => 0,
            BindingKind::Subtype => 1,
            BindingKind::Supertype => 2,
        }
    }
    vb.bindings.iter().cloned().sorted_by_key(|b| rank(b.kind)).collect()
}

/// Picks the next variable to bind from `candidates`, applying the §4.7
/// ordering key and breaking ties via [`break_tie`].
pub fn pick_next_variable(
    graph: &mut ConstraintGraph,
    store: &ConstraintStore,
    collab: &SharedCollaborators,
    lang: &LangItems,
    candidates: &[TypeVarId],
) -> Option<TypeVarId> {
    let mut scored: Vec<(TypeVarId, (bool, bool, bool, bool, u8, i64))> = candidates
        .iter()
        .map(|&v| (v, ordering_key(&gather_bindings(graph, store, collab, lang, v))))
        .collect();
    scored.sort_by(|a, b| a.1.cmp(&b.1));
    let best_key = scored.first()?.1;
    let tied: Vec<TypeVarId> = scored.iter().filter(|(_, k)| *k == best_key).map(|(v, _)| *v).collect();
    if tied.len() == 1 {
        return Some(tied[0]);
    }
    let mut winner = tied[0];
    for &candidate in &tied[1..] {
        if break_tie(store, candidate, winner) == Some(std::cmp::Ordering::Less) {
            winner = candidate;
        }
    }
    Some(winner)
}

/// "If one variable appears on the left of a subtype constraint whose
/// right side is the other, the LHS wins" — `Less` means `a` should be
/// preferred over `b`.
fn break_tie(store: &ConstraintStore, a: TypeVarId, b: TypeVarId) -> Option<std::cmp::Ordering> {
    for id in store.inactive_ids() {
        if let ConstraintKind::Subtype(lhs, rhs) = &store.constraint(id).kind {
            if lhs.as_type_variable() == Some(a) && rhs.as_type_variable() == Some(b) {
                return Some(std::cmp::Ordering::Less);
            }
            if lhs.as_type_variable() == Some(b) && rhs.as_type_variable() == Some(a) {
                return Some(std::cmp::Ordering::Greater);
            }
        }
    }
    None
}
