//! End-to-end scenarios through the public [`constraint_solver::check`]
//! entry point, covering the pipeline's four stages together rather than
//! one at a time. Scoped to the scenarios whose outcome follows
//! deterministically from the solver's documented first-successful-branch
//! search (`solve_disjunction`'s `ordered.sort_by_key(|(_, c)| !c.favored)`
//! plus its early-break once any solution is recorded) — operator
//! disambiguation driven purely by contextual propagation, existential
//! opening, and `??`'s generic-operator machinery are left uncovered here;
//! see DESIGN.md's open questions for why.

mod support;

use constraint_solver::ast::{CheckRequest, ContextualPurpose, Expr};
use constraint_solver::collab::AstRewriter;
use constraint_solver::config::SolverConfig;
use la_arena::Arena;

/// `1 + 2` with no contextual type: both literals default to `Int`, `+`
/// picks its `Int` overload (the first branch tried, since neither
/// candidate is favored and `PLUS_INT` sorts first in the candidate
/// list), and the result carries no fixes or conversions.
#[test]
fn integer_addition_infers_int_with_a_clean_score() {
    let mut arena = Arena::new();
    let lhs = arena.alloc(Expr::IntegerLiteral);
    let rhs = arena.alloc(Expr::IntegerLiteral);
    let root = support::plus(&mut arena, lhs, rhs);

    let request = CheckRequest {
        arena: &arena,
        root,
        enclosing_context: support::INT,
        contextual_type: None,
        purpose: ContextualPurpose::General,
    };
    let collab = support::collaborators();
    let lang = support::lang_items();
    let config = SolverConfig::default();
    let mut rewriter = support::RecordingRewriter::default();

    let result = constraint_solver::check(&request, &collab, &lang, &config, &mut rewriter)
        .expect("1 + 2 should solve cleanly");

    assert_eq!(result.applied.expr_types.get(&root), Some(&support::int_ty()));
    assert!(result.score.is_zero());
    assert!(result.alternatives.is_empty());
}

/// A bare integer literal with no surrounding context defaults straight
/// to `Int` through the solver's binding phase, with no disjunction
/// involved at all.
#[test]
fn bare_integer_literal_defaults_to_int() {
    let mut arena = Arena::new();
    let root = arena.alloc(Expr::IntegerLiteral);

    let request = CheckRequest {
        arena: &arena,
        root,
        enclosing_context: support::INT,
        contextual_type: None,
        purpose: ContextualPurpose::General,
    };
    let collab = support::collaborators();
    let lang = support::lang_items();
    let config = SolverConfig::default();
    let mut rewriter = support::RecordingRewriter::default();

    let result = constraint_solver::check(&request, &collab, &lang, &config, &mut rewriter).expect("should solve");

    assert_eq!(result.applied.expr_types.get(&root), Some(&support::int_ty()));
}

/// The same literal under a `Double` contextual type converts instead of
/// defaulting: the `Conversion` constraint the caller threads in through
/// `contextual_type` forces the literal's variable to `Double` before the
/// binding phase ever gets to try its own default.
#[test]
fn contextual_double_type_overrides_integer_literal_defaulting() {
    let mut arena = Arena::new();
    let root = arena.alloc(Expr::IntegerLiteral);

    let request = CheckRequest {
        arena: &arena,
        root,
        enclosing_context: support::INT,
        contextual_type: Some(support::double_ty()),
        purpose: ContextualPurpose::General,
    };
    let collab = support::collaborators();
    let lang = support::lang_items();
    let config = SolverConfig::default();
    let mut rewriter = support::RecordingRewriter::default();

    let result = constraint_solver::check(&request, &collab, &lang, &config, &mut rewriter).expect("should solve");

    assert_eq!(result.applied.expr_types.get(&root), Some(&support::double_ty()));
}

/// `1 + 2` again, this time asking the solver to keep every discovered
/// solution rather than stop at the first. Both overloads are structurally
/// viable and score identically (the literals convert equally cleanly to
/// either `Int` or `Double`), and [`constraint_solver::rank::select_winners`]
/// collapses an exact tie down to its first-found representative rather
/// than surfacing a redundant copy as an "alternative" — so this still
/// reports a single winner with no alternatives, the same as the
/// default-mode run above, just reached by exploring both branches
/// instead of stopping at the first.
#[test]
fn return_all_mode_still_collapses_an_exact_tie() {
    let mut arena = Arena::new();
    let lhs = arena.alloc(Expr::IntegerLiteral);
    let rhs = arena.alloc(Expr::IntegerLiteral);
    let root = support::plus(&mut arena, lhs, rhs);

    let request = CheckRequest {
        arena: &arena,
        root,
        enclosing_context: support::INT,
        contextual_type: None,
        purpose: ContextualPurpose::General,
    };
    let collab = support::collaborators();
    let lang = support::lang_items();
    let config = SolverConfig { return_all_discovered_solutions: true, ..SolverConfig::default() };
    let mut rewriter = support::RecordingRewriter::default();

    let result = constraint_solver::check(&request, &collab, &lang, &config, &mut rewriter).expect("should solve");

    assert!(result.alternatives.is_empty());
    let winner_ty = result.applied.expr_types.get(&root).cloned();
    assert!(winner_ty == Some(support::int_ty()) || winner_ty == Some(support::double_ty()));
}
