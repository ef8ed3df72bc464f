//! Invariant and quantified-property checks from the design notes: these
//! exercise individual stages directly (binding, ranking, budget
//! enforcement, type simplification) rather than the full pipeline, the
//! way the in-module `#[cfg(test)]` blocks in `graph.rs`/`store.rs`/
//! `locator.rs` already do for their own stage.

mod support;

use constraint_solver::binding::{self, BindingKind};
use constraint_solver::constraint::{ConstraintKind, Constraint, OverloadChoice, Score, ScoreKind, SelectedOverload, Solution};
use constraint_solver::diagnostic::SolveError;
use constraint_solver::generate::LangItems;
use constraint_solver::graph::ConstraintGraph;
use constraint_solver::locator::LocatorAllocator;
use constraint_solver::rank;
use constraint_solver::store::ConstraintStore;
use constraint_solver::types::{DeclId, FixedLookup, OptionFlags, Type, TypeVarId};
use la_arena::Arena;
use rustc_hash::FxHashMap;

fn dummy_anchor() -> la_arena::Idx<constraint_solver::ast::Expr> {
    let mut arena = Arena::new();
    arena.alloc(constraint_solver::ast::Expr::IntegerLiteral)
}

/// Picking a variable whose only candidates come from `Defaultable`
/// constraints (no hard `Bind`/`Conversion` evidence) hits the
/// defaultable-only branch of the ordering key.
#[test]
fn defaultable_only_variable_hits_its_coverage_mark() {
    cov_mark::check!(defaultable_binding_only);

    let mut graph = ConstraintGraph::new();
    let mut store = ConstraintStore::new();
    let mut locs = LocatorAllocator::new();
    let collab = support::collaborators();
    let lang = support::lang_items();

    let anchor = dummy_anchor();
    let loc = locs.get_locator(anchor, vec![]);
    let var = graph.new_variable(OptionFlags::NONE);
    let id = store.push_active(Constraint::new(
        ConstraintKind::Defaultable { target: Type::TypeVariable(var), default: support::any_ty() },
        loc,
    ));
    graph.add_constraint(var, id);

    let vb = binding::gather_bindings(&mut graph, &store, &collab, &lang, var);
    assert_eq!(vb.bindings.len(), 1);
    assert_eq!(vb.bindings[0].kind, BindingKind::Exact);
    let _ = binding::ordering_key(&vb);
}

/// A variable with no free constraints at all, under a budget whose scope
/// count is already saturated at zero, trips the budget check as soon as
/// the solver opens its first scope.
#[test]
fn exhausted_scope_budget_hits_its_coverage_mark() {
    cov_mark::check!(solver_budget_exceeded);

    let mut graph = ConstraintGraph::new();
    let mut store = ConstraintStore::new();
    let mut locs = LocatorAllocator::new();
    let collab = support::collaborators();
    let lang = support::lang_items();

    let anchor = dummy_anchor();
    let loc = locs.get_locator(anchor, vec![]);
    let var = graph.new_variable(OptionFlags::NONE);
    let id = store.push_active(Constraint::new(
        ConstraintKind::Conversion(Type::TypeVariable(var), support::int_ty()),
        loc,
    ));
    graph.add_constraint(var, id);

    let budget = limit::Budget::new(0, 1 << 20);
    let result = constraint_solver::solve::run(&mut graph, &mut store, &mut locs, &collab, &lang, budget, false);
    assert!(matches!(result, Err(SolveError::TooComplex { .. })));
}

struct NoFixedBindings;

impl FixedLookup for NoFixedBindings {
    fn fixed_binding(&self, _var: TypeVarId) -> Option<Type> {
        None
    }
    fn associated_type_witness(&self, _base: &Type, _assoc: constraint_solver::types::AssocId) -> Option<Type> {
        None
    }
}

struct OneFixedBinding(TypeVarId, Type);

impl FixedLookup for OneFixedBinding {
    fn fixed_binding(&self, var: TypeVarId) -> Option<Type> {
        (var == self.0).then(|| self.1.clone())
    }
    fn associated_type_witness(&self, _base: &Type, _assoc: constraint_solver::types::AssocId) -> Option<Type> {
        None
    }
}

/// `simplify` is idempotent: running it twice over a type with no further
/// fixed bindings to discover doesn't change the result.
#[test]
fn simplify_is_idempotent_with_no_bindings() {
    let ty = Type::Nominal { decl: DeclId(0), parent: None, generic_args: std::sync::Arc::from([Type::TypeVariable(TypeVarId(0))]) };
    let lookup = NoFixedBindings;
    let once = constraint_solver::types::simplify(&ty, &lookup);
    let twice = constraint_solver::types::simplify(&once, &lookup);
    assert_eq!(once, twice);
}

/// Same property once a variable actually has a fixed binding: simplifying
/// the already-simplified result changes nothing further.
#[test]
fn simplify_is_idempotent_with_a_fixed_binding() {
    let var = TypeVarId(0);
    let ty = Type::TypeVariable(var);
    let lookup = OneFixedBinding(var, support::int_ty());
    let once = constraint_solver::types::simplify(&ty, &lookup);
    assert_eq!(once, support::int_ty());
    let twice = constraint_solver::types::simplify(&once, &lookup);
    assert_eq!(once, twice);
}

fn solution_with(score: Score, loc: constraint_solver::locator::Locator, decl: DeclId) -> Solution {
    let mut overload_choices = FxHashMap::default();
    overload_choices.insert(
        loc,
        SelectedOverload {
            choice: OverloadChoice::Decl { decl, ref_kind: constraint_solver::ast::RefKind::Unapplied },
            opened_full: Type::Error,
            opened_type: Type::Error,
        },
    );
    Solution { score, overload_choices, ..Solution::default() }
}

/// Two solutions tied on score but disagreeing on which overload they
/// picked are both kept as winners, leaving the ambiguity for the caller
/// to report rather than arbitrarily preferring one.
#[test]
fn tied_solutions_with_different_choices_are_not_reduced_to_one() {
    let mut locs = LocatorAllocator::new();
    let anchor = dummy_anchor();
    let loc = locs.get_locator(anchor, vec![]);

    let a = solution_with(Score::zero(), loc, DeclId(1));
    let b = solution_with(Score::zero(), loc, DeclId(2));

    let winners = rank::select_winners(vec![a, b], false);
    assert_eq!(winners.len(), 2);
}

/// Under `return_all_discovered_solutions`, winners are only reduced when
/// one solution's score dominates another's in every dimension — two
/// solutions that each do better in some dimension and worse in another
/// both survive.
#[test]
fn incomparable_solutions_both_survive_minimize_mode() {
    let mut locs = LocatorAllocator::new();
    let anchor = dummy_anchor();
    let loc = locs.get_locator(anchor, vec![]);

    let mut better_fix = Score::zero();
    better_fix.bump(ScoreKind::NonDefaultLiteral);
    let mut better_conversion = Score::zero();
    better_conversion.bump(ScoreKind::Fix);

    assert!(better_fix.is_incomparable_with(&better_conversion));

    let a = solution_with(better_fix, loc, DeclId(1));
    let b = solution_with(better_conversion, loc, DeclId(2));
    let winners = rank::select_winners(vec![a, b], true);
    assert_eq!(winners.len(), 2);
}

/// A solution whose score strictly dominates another's (every dimension
/// at least as good, one strictly better) is the only minimize-mode
/// survivor.
#[test]
fn dominated_solution_is_dropped_in_minimize_mode() {
    let mut locs = LocatorAllocator::new();
    let anchor = dummy_anchor();
    let loc = locs.get_locator(anchor, vec![]);

    let best = Score::zero();
    let mut worse = Score::zero();
    worse.bump(ScoreKind::Fix);

    let a = solution_with(best, loc, DeclId(1));
    let b = solution_with(worse, loc, DeclId(2));
    let winners = rank::select_winners(vec![a, b], true);
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].score, best);
}
