//! Solution application: once the solver has produced a winning
//! [`Solution`], walk the checked expression back over and make every
//! choice concrete — substitute each expression's inferred type with its
//! solved form, turn `OverloadedDeclRef`/`UnresolvedMember` into the
//! concrete reference the solver picked, and insert the implicit
//! conversions/coercions recorded as fixes. Mirrors the shape of the
//! original compiler's `ConstraintSystem::applySolution`, but expressed
//! over the narrower `AstRewriter` boundary this core exposes: we never
//! touch the caller's expression arena directly, we only ask for
//! replacements and hand the substitution map back.

use la_arena::Arena;
use rustc_hash::FxHashMap;

use crate::ast::{Expr, ExprId};
use crate::collab::AstRewriter;
use crate::constraint::{Fix, OverloadChoice, Solution};
use crate::locator::Locator;
use crate::types::{Type, TypeVarId};

/// Everything solution application produced: the fully-resolved type of
/// every expression the generator visited, the node-for-node AST
/// substitutions the caller should splice back into its own tree, and
/// whichever recorded fixes this module had no `AstRewriter` primitive to
/// act on (argument-list-shape fixes — the caller's own diagnostic
/// renderer still needs to know about these even though this module
/// can't materialize them as syntax).
pub struct AppliedResult {
    pub expr_types: FxHashMap<ExprId, Type>,
    pub rewrites: FxHashMap<ExprId, ExprId>,
    pub unhandled_fixes: Vec<(Fix, Locator)>,
}

/// Resolves `ty` against `bindings`, recursively, the same way
/// [`crate::types::simplify`] does against a live [`crate::graph::ConstraintGraph`] —
/// this version reads a plain map instead, since by the time a solution
/// exists every type variable in scope has already been canonicalized
/// into `Solution::type_bindings` by the solver's `collect_bindings`.
fn resolve_type(ty: &Type, bindings: &FxHashMap<TypeVarId, Type>) -> Type {
    match ty {
        Type::TypeVariable(id) => match bindings.get(id) {
            Some(bound) => resolve_type(bound, bindings),
            None => ty.clone(),
        },
        Type::Nominal { decl, parent, generic_args } => Type::Nominal {
            decl: *decl,
            parent: parent.as_deref().map(|t| std::sync::Arc::new(resolve_type(t, bindings))),
            generic_args: generic_args.iter().map(|t| resolve_type(t, bindings)).collect::<Vec<_>>().into(),
        },
        Type::Tuple(elems) => Type::Tuple(
            elems
                .iter()
                .map(|e| crate::types::TupleElement { name: e.name.clone(), ty: resolve_type(&e.ty, bindings) })
                .collect::<Vec<_>>()
                .into(),
        ),
        Type::Function { params, result, effects } => Type::Function {
            params: params
                .iter()
                .map(|p| crate::types::Param { ty: resolve_type(&p.ty, bindings), ..p.clone() })
                .collect::<Vec<_>>()
                .into(),
            result: std::sync::Arc::new(resolve_type(result, bindings)),
            effects: *effects,
        },
        Type::Metatype(t) => Type::Metatype(std::sync::Arc::new(resolve_type(t, bindings))),
        Type::Optional(t) => Type::Optional(std::sync::Arc::new(resolve_type(t, bindings))),
        Type::LValue(t) => Type::LValue(std::sync::Arc::new(resolve_type(t, bindings))),
        Type::InOut(t) => Type::InOut(std::sync::Arc::new(resolve_type(t, bindings))),
        Type::Existential(_) | Type::Unbound(_) | Type::Error => ty.clone(),
        Type::DependentMember { base, assoc } => {
            Type::DependentMember { base: std::sync::Arc::new(resolve_type(base, bindings)), assoc: *assoc }
        }
    }
}

/// Applies `solution` over the expressions the generator visited.
///
/// - `expr_types`/`site_exprs` come from [`crate::generate::Generator::into_results`].
/// - `rewriter` is the caller's AST-mutation boundary; every call to it
///   returns a fresh `ExprId` which gets folded into the returned
///   substitution map rather than spliced into `arena` directly, since
///   `arena` here is a read-only view of the tree being checked.
pub fn apply(
    arena: &Arena<Expr>,
    expr_types: &FxHashMap<ExprId, Type>,
    site_exprs: &FxHashMap<Locator, ExprId>,
    solution: &Solution,
    rewriter: &mut dyn AstRewriter,
) -> AppliedResult {
    let resolved: FxHashMap<ExprId, Type> = expr_types
        .iter()
        .map(|(id, ty)| {
            let resolved_ty = resolve_type(ty, &solution.type_bindings);
            stdx::never!(resolved_ty.has_type_variable(), "leftover type variable in resolved type of {:?}", id);
            (*id, resolved_ty)
        })
        .collect();

    let mut rewrites: FxHashMap<ExprId, ExprId> = FxHashMap::default();
    apply_overload_choices(arena, site_exprs, solution, rewriter, &mut rewrites);
    apply_conversion_restrictions(&resolved, solution, rewriter, &mut rewrites);
    let unhandled_fixes = apply_fixes(&resolved, site_exprs, solution, rewriter, &mut rewrites);

    AppliedResult { expr_types: resolved, rewrites, unhandled_fixes }
}

/// `OverloadedDeclRef` → `DeclRef`, `UnresolvedMember` → `MemberRef`, per
/// `solution.overload_choices`. Both source shapes only ever generate
/// `OverloadChoice::Decl` branches (`generate_overloaded_decl_ref`,
/// `resolve_member_candidates`); any other choice kind reaching one of
/// these sites would mean the generator and simplifier have drifted out
/// of sync, so it's left unrewritten rather than guessed at.
fn apply_overload_choices(
    arena: &Arena<Expr>,
    site_exprs: &FxHashMap<Locator, ExprId>,
    solution: &Solution,
    rewriter: &mut dyn AstRewriter,
    rewrites: &mut FxHashMap<ExprId, ExprId>,
) {
    for (loc, selected) in &solution.overload_choices {
        let Some(&expr_id) = site_exprs.get(loc) else { continue };
        let OverloadChoice::Decl { decl, ref_kind } = &selected.choice else { continue };
        match &arena[expr_id] {
            Expr::OverloadedDeclRef { .. } => {
                let new_id = rewriter.replace_expr(expr_id, Expr::DeclRef { decl: *decl, ref_kind: *ref_kind, is_iuo: false });
                rewrites.insert(expr_id, new_id);
            }
            Expr::UnresolvedMember { .. } => {
                // No literal base expression exists for `.foo`-style
                // shorthand; `expr_id` stands in as the anchor the
                // collaborator synthesizes an implicit type-expr base
                // against.
                let new_id = rewriter.make_member_ref(expr_id, *decl);
                rewrites.insert(expr_id, new_id);
            }
            _ => {}
        }
    }
}

/// Best-effort implicit-conversion insertion for `solution.conversion_restrictions`.
/// The restriction map is keyed by `(Type, Type)`, not by site — the
/// simplifier doesn't thread a locator through
/// `Simplifier::restrictions` — so this matches by the expression's own
/// resolved type rather than by exact provenance. Two distinct
/// expressions of the same type requiring the same restriction both get
/// rewritten, which is the correct outcome in practice since the
/// restriction only depends on the type pair to begin with.
fn apply_conversion_restrictions(
    resolved: &FxHashMap<ExprId, Type>,
    solution: &Solution,
    rewriter: &mut dyn AstRewriter,
    rewrites: &mut FxHashMap<ExprId, ExprId>,
) {
    if solution.conversion_restrictions.is_empty() {
        return;
    }
    for (expr_id, ty) in resolved {
        for ((lhs, rhs), _kind) in &solution.conversion_restrictions {
            if ty == lhs {
                let source = *rewrites.get(expr_id).unwrap_or(expr_id);
                let new_id = rewriter.make_implicit_conversion(source, rhs);
                rewrites.insert(*expr_id, new_id);
            }
        }
    }
}

/// Acts on the fixes that map directly onto an `AstRewriter` primitive
/// (`InsertCoercion` carries its own target type; `ForceOptional` wraps
/// the site in a conversion to its own already-resolved, already-unwrapped
/// type) and passes the rest back for the caller's diagnostic layer,
/// since `AddMissingArgumentLabel`/`RemoveExtraArgument`/
/// `SupplyMissingArgument`/`TreatRValueAsLValue`/`AllowTupleLabelMismatch`
/// describe argument-list shape changes this trait has no constructor for.
fn apply_fixes(
    resolved: &FxHashMap<ExprId, Type>,
    site_exprs: &FxHashMap<Locator, ExprId>,
    solution: &Solution,
    rewriter: &mut dyn AstRewriter,
    rewrites: &mut FxHashMap<ExprId, ExprId>,
) -> Vec<(Fix, Locator)> {
    let mut unhandled = Vec::new();
    for (fix, loc) in &solution.fixes {
        let Some(&expr_id) = site_exprs.get(loc) else {
            unhandled.push((fix.clone(), *loc));
            continue;
        };
        let source = *rewrites.get(&expr_id).unwrap_or(&expr_id);
        match fix {
            Fix::InsertCoercion(target) => {
                let new_id = rewriter.make_implicit_conversion(source, target);
                rewrites.insert(expr_id, new_id);
            }
            Fix::ForceOptional => {
                if let Some(ty) = resolved.get(&expr_id) {
                    let new_id = rewriter.make_implicit_conversion(source, ty);
                    rewrites.insert(expr_id, new_id);
                }
            }
            _ => unhandled.push((fix.clone(), *loc)),
        }
    }
    unhandled
}
