//! Constraint-based type checker core: given an expression, a contextual
//! type, and a caller-supplied set of [`collab`] collaborators, generates a
//! constraint system, solves it, picks the winning solution, and applies it
//! back onto the caller's AST. The four stages (`generate` → `solve` →
//! `rank` → `apply`) are each independently usable; this module's [`check`]
//! is the convenience entry point that runs them end to end the way a
//! driver normally wants.
//!
//! Modeled on `hir_ty::infer::infer_query` as the top-level pipeline
//! function a downstream crate calls without needing to know the stages
//! exist, the way `hir_ty` hides `InferenceContext` behind one query.

pub mod apply;
pub mod ast;
pub mod binding;
pub mod collab;
pub mod config;
pub mod constraint;
pub mod diagnostic;
pub mod generate;
pub mod graph;
pub mod locator;
pub mod rank;
pub mod simplify;
pub mod solve;
pub mod store;
pub mod types;

use ast::{CheckRequest, ExprId};
use collab::{AstRewriter, SharedCollaborators};
use config::SolverConfig;
use diagnostic::{SolveError, SolveResult};
use generate::{Generator, LangItems};
use graph::ConstraintGraph;
use locator::LocatorAllocator;
use rustc_hash::FxHashMap;
use store::ConstraintStore;
use types::Type;

/// Everything a successful [`check`] produced: the winning solution applied
/// over the checked tree, plus every other solution the solver found tied
/// or incomparable with it (empty unless
/// [`SolverConfig::return_all_discovered_solutions`] was set, in which case
/// the driver's failure-diagnosis pass wants to inspect the runners-up
/// without re-solving).
pub struct CheckResult {
    pub applied: apply::AppliedResult,
    pub score: constraint::Score,
    pub alternatives: Vec<constraint::Solution>,
}

/// Runs the full pipeline over `request`: generate constraints, solve,
/// pick a winner, and apply it via `rewriter`. `contextual_type`, if
/// present, is threaded in as a `Conversion` constraint against the root
/// expression's generated type, the same way the generator's own doc
/// comment on `generate_root` says the caller must.
///
/// With [`SolverConfig::return_all_discovered_solutions`] unset, more than
/// one solution tying for best is reported as
/// [`SolveError::AmbiguousSolutions`] (built from [`rank::score_diff_dimensions`])
/// rather than applying an arbitrary one. With it set, the best-ranked
/// solution is applied and the rest come back as `alternatives` for the
/// caller's own diagnosis pass — in that mode a non-empty `alternatives`
/// means incomparable, not necessarily tied, solutions, so it isn't treated
/// as ambiguity.
pub fn check(
    request: &CheckRequest<'_>,
    collab: &SharedCollaborators,
    lang: &LangItems,
    solver_config: &SolverConfig,
    rewriter: &mut dyn AstRewriter,
) -> SolveResult<CheckResult> {
    let mut graph = ConstraintGraph::new();
    let mut store = ConstraintStore::new();
    let mut locs = LocatorAllocator::new();

    let (expr_types, site_exprs) = {
        let mut generator = Generator::new(request.arena, &mut graph, &mut store, &mut locs, collab, lang);
        let root_ty = generator.generate_root(request.root, request.purpose);
        if let Some(contextual) = &request.contextual_type {
            generator.require_contextual_conversion(request.root, root_ty, contextual.clone());
        }
        generator.into_results()
    };

    let return_all = solver_config.return_all_discovered_solutions;
    let budget = limit::Budget::new(solver_config.solver_scope_threshold, solver_config.solver_memory_threshold);
    let solutions = solve::run(&mut graph, &mut store, &mut locs, collab, lang, budget, return_all)?;

    let mut winners = rank::select_winners(solutions, return_all);
    if !return_all && winners.len() > 1 {
        let differing_locators: Vec<locator::Locator> = winners[0]
            .overload_choices
            .keys()
            .copied()
            .filter(|loc| winners[1..].iter().any(|s| s.overload_choices.get(loc) != winners[0].overload_choices.get(loc)))
            .collect();
        let tied_scores = winners.iter().map(|s| s.score).collect();
        return Err(SolveError::AmbiguousSolutions { differing_locators, tied_scores });
    }

    let winner = winners.remove(0);
    let applied = apply::apply(request.arena, &expr_types, &site_exprs, &winner, rewriter);
    let result = CheckResult { score: winner.score, applied, alternatives: winners };
    Ok(result)
}

/// Recovers the per-expression type map a caller may want independent of
/// `apply`, e.g. to report "expression X has type Y" without performing a
/// full AST rewrite. `expr_id` must have been visited during generation
/// for the same request; anything else returns `None`.
pub fn expr_type<'a>(expr_types: &'a FxHashMap<ExprId, Type>, expr_id: ExprId) -> Option<&'a Type> {
    expr_types.get(&expr_id)
}
