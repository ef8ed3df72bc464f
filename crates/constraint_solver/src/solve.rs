//! The solver: depth-first search over live disjunctions and free type
//! variable bindings, backtracking through `ena`'s snapshot/rollback the
//! same way `ConstraintGraph` already does for `merge`/`bind`. Modeled on
//! the original compiler's `ConstraintSystem::solve`/`solveSimplified`
//! pair — one fixed-point simplification per scope, then either branch on
//! the best disjunction or assign the best-ordered binding for the next
//! free variable.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use scoped_tls::scoped_thread_local;

use crate::binding;
use crate::collab::SharedCollaborators;
use crate::constraint::{BranchIndex, Constraint, ConstraintKind, OverloadChoice, Score, SelectedOverload, Solution};
use crate::diagnostic::{Diagnostic, SolveError, SolveResult, TooComplexReason};
use crate::generate::{open_generic, requirement_to_constraint_kind, strip_for_ref_kind, LangItems};
use crate::graph::ConstraintGraph;
use crate::locator::Locator;
use crate::simplify::Simplifier;
use crate::store::{ConstraintId, ConstraintStore};
use crate::types::{Type, TypeVarId};

// Shared across a solve's whole recursion tree rather than threaded as a
// parameter: the budget itself never changes mid-solve, and a future
// shrinking pre-pass (§4.8.2, not implemented here — see DESIGN.md) would
// need to run its own nested `solve` invocations against the same
// remaining budget without every intermediate helper taking one more
// argument just to pass it along.
scoped_thread_local!(static ACTIVE_BUDGET: limit::Budget);

static DEFAULT_BUDGET: Lazy<limit::Budget> = Lazy::new(limit::Budget::default);

fn current_budget() -> limit::Budget {
    if ACTIVE_BUDGET.is_set() {
        ACTIVE_BUDGET.with(|b| *b)
    } else {
        *DEFAULT_BUDGET
    }
}

/// Runs the solver to completion from the constraints already pushed onto
/// `store`'s active worklist, returning every solution found (more than
/// one only when `return_all_discovered_solutions` is set).
pub fn run(
    graph: &mut ConstraintGraph,
    store: &mut ConstraintStore,
    locs: &mut crate::locator::LocatorAllocator,
    collab: &SharedCollaborators,
    lang: &LangItems,
    budget: limit::Budget,
    return_all_discovered_solutions: bool,
) -> SolveResult<Vec<Solution>> {
    let _span = profile::span("solve");
    let mut solver = Solver {
        graph,
        store,
        locs,
        collab,
        lang,
        scopes_opened: 0,
        best_score: None,
        return_all: return_all_discovered_solutions,
        solutions: Vec::new(),
        diagnostics: Vec::new(),
    };
    ACTIVE_BUDGET.set(&budget, || solver.solve_inner(Solution::default(), 0))?;
    if solver.solutions.is_empty() {
        return Err(SolveError::NoSolution { diagnostics: solver.diagnostics });
    }
    Ok(solver.solutions)
}

struct Solver<'a> {
    graph: &'a mut ConstraintGraph,
    store: &'a mut ConstraintStore,
    locs: &'a mut crate::locator::LocatorAllocator,
    collab: &'a SharedCollaborators,
    lang: &'a LangItems,
    scopes_opened: usize,
    best_score: Option<Score>,
    return_all: bool,
    solutions: Vec<Solution>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Solver<'a> {
    fn check_budget(&mut self) -> SolveResult<()> {
        let budget = current_budget();
        if budget.scope_count.check(self.scopes_opened).is_err() {
            cov_mark::hit!(solver_budget_exceeded);
            return Err(SolveError::TooComplex { reason: TooComplexReason::ScopeCountExceeded });
        }
        if budget.memory.check(self.store.len()).is_err() {
            cov_mark::hit!(solver_budget_exceeded);
            return Err(SolveError::TooComplex { reason: TooComplexReason::MemoryExceeded });
        }
        if budget.is_exponential_blowup(self.scopes_opened, self.graph.num_variables()) {
            cov_mark::hit!(solver_budget_exceeded);
            return Err(SolveError::TooComplex { reason: TooComplexReason::ExponentialBlowupDetected });
        }
        Ok(())
    }

    fn is_worse_than_best(&self, score: &Score) -> bool {
        match &self.best_score {
            Some(best) => score.compare(best) == std::cmp::Ordering::Greater,
            None => false,
        }
    }

    fn record_solution(&mut self, solution: Solution) {
        self.best_score = Some(match self.best_score {
            Some(best) if best.compare(&solution.score) != std::cmp::Ordering::Greater => best,
            _ => solution.score,
        });
        self.solutions.push(solution);
    }

    /// Every canonical, still-unbound type variable that participates in
    /// at least one remaining relation — variables the generator minted
    /// but nothing ever constrained again aren't worth the solver's time.
    fn free_variables(&mut self) -> Vec<TypeVarId> {
        let n = self.graph.num_variables();
        let mut seen = rustc_hash::FxHashSet::default();
        let mut out = Vec::new();
        for i in 0..n {
            let root = self.graph.find(TypeVarId(i));
            if !seen.insert(root) {
                continue;
            }
            if self.graph.fixed_binding(root).is_some() {
                continue;
            }
            if self.graph.node_flags(root).has_nontrivial_relation {
                out.push(root);
            }
        }
        out
    }

    /// §4.8.1: among inactive `Disjunction`s with at least one non-disabled
    /// branch, prefer fewest live branches, then prefer one with a favored
    /// branch among the live ones.
    fn find_disjunction(&mut self) -> Option<ConstraintId> {
        let mut best: Option<(ConstraintId, usize, bool)> = None;
        let candidates: Vec<ConstraintId> = self.store.inactive_ids().collect();
        for id in candidates {
            let ConstraintKind::Disjunction(terms) = &self.store.constraint(id).kind else { continue };
            let live = terms.iter().filter(|c| !c.disabled).count();
            if live == 0 {
                continue;
            }
            let favored = terms.iter().any(|c| !c.disabled && c.favored);
            let better = match &best {
                None => true,
                Some((_, best_live, best_favored)) => live < *best_live || (live == *best_live && favored && !*best_favored),
            };
            if better {
                best = Some((id, live, favored));
            }
        }
        best.map(|(id, _, _)| id)
    }

    fn collect_bindings(&mut self) -> FxHashMap<TypeVarId, Type> {
        let n = self.graph.num_variables();
        let mut out = FxHashMap::default();
        for i in 0..n {
            let v = TypeVarId(i);
            let root = self.graph.find(v);
            if let Some(ty) = self.graph.fixed_binding(root) {
                let mut simplifier = Simplifier::new(self.graph, self.store, self.locs, self.collab);
                out.insert(v, simplifier.canonicalize(&ty));
            }
        }
        out
    }

    /// One scope: simplify to a fixed point, then either record a solution,
    /// prune, or branch on a disjunction / variable binding.
    fn solve_inner(&mut self, mut partial: Solution, depth: u32) -> SolveResult<()> {
        self.check_budget()?;
        log::trace!("solve_inner: depth={depth} scopes_opened={}", self.scopes_opened);

        let mut simplifier = Simplifier::new(self.graph, self.store, self.locs, self.collab);
        let outcome = simplifier.run_to_fixed_point();
        for (lhs, rhs, kind) in simplifier.restrictions.drain(..) {
            partial.conversion_restrictions.insert((lhs, rhs), kind);
        }
        let unviable: Vec<Diagnostic> = simplifier.unviable.drain(..).collect();
        drop(simplifier);
        self.diagnostics.extend(unviable);

        if let Err(diag) = outcome {
            self.diagnostics.push(diag);
            return Ok(());
        }

        if !self.return_all && self.is_worse_than_best(&partial.score) {
            return Ok(());
        }

        if let Some(disjunction_id) = self.find_disjunction() {
            return self.solve_disjunction(disjunction_id, partial, depth);
        }

        let free_vars = self.free_variables();
        if free_vars.is_empty() {
            partial.type_bindings = self.collect_bindings();
            self.record_solution(partial);
            return Ok(());
        }

        self.solve_variable_binding(&free_vars, partial, depth)
    }

    fn solve_disjunction(&mut self, id: ConstraintId, partial: Solution, depth: u32) -> SolveResult<()> {
        let ConstraintKind::Disjunction(terms) = self.store.constraint(id).kind.clone() else {
            unreachable!("find_disjunction only returns Disjunction ids")
        };
        let disjunction_loc = self.store.constraint(id).locator;
        self.store.retire(id);

        let mut ordered: Vec<(usize, Constraint)> = terms.into_iter().enumerate().filter(|(_, c)| !c.disabled).collect();
        ordered.sort_by_key(|(_, c)| !c.favored);

        for (index, branch) in ordered {
            if !self.return_all && self.best_score.is_some() {
                break;
            }
            let graph_snap = self.graph.snapshot();
            let store_snap = self.store.snapshot();
            self.scopes_opened += 1;
            log::debug!("solve_disjunction: trying branch {index} at depth {depth}");

            let mut branch_partial = partial.clone();
            branch_partial.disjunction_choices.insert(disjunction_loc, BranchIndex(index as u32));
            self.apply_branch(&branch, &mut branch_partial);
            self.solve_inner(branch_partial, depth + 1)?;

            self.graph.rollback_to(graph_snap);
            self.store.rollback_to(store_snap);
        }
        Ok(())
    }

    /// Pushes a chosen branch back onto the worklist for the next scope's
    /// simplification pass to resolve, recording whatever the branch
    /// already tells us (the overload choice itself) straight into the
    /// partial solution.
    fn apply_branch(&mut self, branch: &Constraint, partial: &mut Solution) {
        match &branch.kind {
            ConstraintKind::BindOverload(bo) => {
                let (opened_full, opened_type) = match &bo.choice {
                    OverloadChoice::Decl { decl, ref_kind } => {
                        let (opened, reqs) = open_generic(self.collab, self.graph, self.locs, *decl, branch.locator);
                        for (req, req_loc) in reqs {
                            if let Some(kind) = requirement_to_constraint_kind(req) {
                                self.push_active(kind, req_loc);
                            }
                        }
                        let stripped = strip_for_ref_kind(&opened, *ref_kind);
                        (opened, stripped)
                    }
                    OverloadChoice::DeclViaDynamic(decl)
                    | OverloadChoice::DeclViaBridge(decl)
                    | OverloadChoice::DeclViaUnwrappedOptional(decl) => {
                        let iface = self.collab.interface_type(*decl);
                        (iface.clone(), iface)
                    }
                    OverloadChoice::TupleIndex(_) | OverloadChoice::KeyPathApplication => (Type::Error, Type::Error),
                    OverloadChoice::BaseType(t) => (t.clone(), t.clone()),
                };
                partial.overload_choices.insert(
                    branch.locator,
                    SelectedOverload { choice: bo.choice.clone(), opened_full, opened_type: opened_type.clone() },
                );
                self.push_active(ConstraintKind::Bind(Type::TypeVariable(bo.target), opened_type), branch.locator);
            }
            ConstraintKind::Disjunction(_) => {
                let id = self.store.push_inactive(branch.clone());
                for v in self.store.constraint(id).operand_type_variables() {
                    self.graph.add_constraint(v, id);
                }
            }
            _ => {
                self.push_active(branch.kind.clone(), branch.locator);
            }
        }
    }

    fn push_active(&mut self, kind: ConstraintKind, loc: Locator) -> ConstraintId {
        let id = self.store.push_active(Constraint::new(kind, loc));
        for v in self.store.constraint(id).operand_type_variables() {
            self.graph.add_constraint(v, id);
        }
        id
    }

    fn solve_variable_binding(&mut self, free_vars: &[TypeVarId], partial: Solution, depth: u32) -> SolveResult<()> {
        let Some(var) = binding::pick_next_variable(self.graph, self.store, self.collab, self.lang, free_vars) else {
            return Ok(());
        };
        let vb = binding::gather_bindings(self.graph, self.store, self.collab, self.lang, var);
        let ordered = binding::order_bindings(&vb);
        if ordered.is_empty() {
            return Ok(());
        }

        for pb in ordered {
            if !self.return_all && self.best_score.is_some() {
                break;
            }
            let graph_snap = self.graph.snapshot();
            let store_snap = self.store.snapshot();
            self.scopes_opened += 1;
            log::debug!("solve_variable_binding: trying {:?} for {:?} at depth {depth}", pb.kind, var);

            self.graph.bind(var, pb.ty.clone(), self.store);
            self.solve_inner(partial.clone(), depth + 1)?;

            self.graph.rollback_to(graph_snap);
            self.store.rollback_to(store_snap);
        }
        Ok(())
    }
}
