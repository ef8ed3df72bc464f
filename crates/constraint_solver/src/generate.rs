//! Constraint generation: walks a caller-owned [`Arena<Expr>`] from a root
//! expression, minting type variables and constraints as it goes. Modeled
//! on `hir_ty::infer::expr`'s `InferenceContext::infer_expr`, which does
//! the analogous walk over `hir_def::expr::Expr` to produce Chalk
//! obligations — same shape (one big `match` over an expression sum
//! type, each arm minting fresh inference variables and pushing
//! constraints/obligations), different target system.
//!
//! The input arena is immutable (`CheckRequest::arena: &Arena<Expr>`), so
//! unlike a mutating "sanitizer pass" that rewrites the tree in place, the
//! handful of normalizations the original two-phase design calls for are
//! folded into the generator itself: where a normalization would apply,
//! the relevant `match` arm looks one level into its operand instead of
//! emitting a rewrite.

use std::sync::Arc;

use la_arena::Arena;
use rustc_hash::FxHashMap;

use crate::ast::{ClosureBody, ContextualPurpose, Expr, ExprId, KeyPathComponent, RefKind};
use crate::collab::{Requirement, SharedCollaborators};
use crate::constraint::{BindOverload, Constraint, ConstraintKind, MemberRefKind, OverloadChoice};
use crate::graph::ConstraintGraph;
use crate::locator::{Locator, LocatorAllocator, PathElement};
use crate::store::ConstraintStore;
use crate::types::{AssocId, DeclId, Effects, OptionFlags, Param, ProtocolId, Type, TupleElement, TypeVarId};

/// Declarations and protocols the generator needs to know about ahead of
/// time, supplied by the driver the way a compiler's "known decls" table
/// is — the core has no independent way to discover what `Bool` or
/// `ExpressibleByIntegerLiteral` resolve to.
#[derive(Clone, Debug)]
pub struct LangItems {
    pub expressible_by_integer_literal: ProtocolId,
    pub expressible_by_float_literal: ProtocolId,
    pub expressible_by_string_literal: ProtocolId,
    pub expressible_by_string_interpolation: ProtocolId,
    pub expressible_by_boolean_literal: ProtocolId,
    pub expressible_by_array_literal: ProtocolId,
    pub expressible_by_dictionary_literal: ProtocolId,
    pub bool_decl: DeclId,
    pub any_decl: DeclId,
    pub any_hashable_decl: DeclId,
    pub void_decl: DeclId,
    pub array_element_assoc: AssocId,
    pub dictionary_key_assoc: AssocId,
    pub dictionary_value_assoc: AssocId,
    pub subscript_name: Arc<str>,
}

impl LangItems {
    fn bool_type(&self) -> Type {
        Type::Nominal { decl: self.bool_decl, parent: None, generic_args: Arc::from([]) }
    }
    fn any_type(&self) -> Type {
        Type::Nominal { decl: self.any_decl, parent: None, generic_args: Arc::from([]) }
    }
    fn any_hashable_type(&self) -> Type {
        Type::Nominal { decl: self.any_hashable_decl, parent: None, generic_args: Arc::from([]) }
    }
    fn void_type(&self) -> Type {
        Type::Nominal { decl: self.void_decl, parent: None, generic_args: Arc::from([]) }
    }
}

pub struct Generator<'a> {
    arena: &'a Arena<Expr>,
    graph: &'a mut ConstraintGraph,
    store: &'a mut ConstraintStore,
    locs: &'a mut LocatorAllocator,
    collab: &'a SharedCollaborators,
    lang: &'a LangItems,
    /// Every expression's generated result type, recorded as `generate`
    /// visits it — solution application walks this back out once the
    /// solver has fixed each variable, the same way `hir_ty`'s
    /// `InferenceResult::type_of_expr` is built up during inference rather
    /// than recomputed afterward.
    expr_types: FxHashMap<ExprId, Type>,
    /// The expression each locator used during generation was generated
    /// for — locators anchor to the whole checked root, not to the
    /// subexpression that created them, so solution application needs this
    /// side table to map a `Solution::overload_choices` or `Solution::fixes`
    /// locator back to the `ExprId` it concerns. Populated for every
    /// locator `generate` is called with, not just the overload-bearing
    /// ones, since a fix's locator is as likely to equal some expression's
    /// own top-level generation locator as an overload choice's is.
    site_exprs: FxHashMap<Locator, ExprId>,
}

impl<'a> Generator<'a> {
    pub fn new(
        arena: &'a Arena<Expr>,
        graph: &'a mut ConstraintGraph,
        store: &'a mut ConstraintStore,
        locs: &'a mut LocatorAllocator,
        collab: &'a SharedCollaborators,
        lang: &'a LangItems,
    ) -> Self {
        Generator { arena, graph, store, locs, collab, lang, expr_types: FxHashMap::default(), site_exprs: FxHashMap::default() }
    }

    /// Hands over the per-expression type map and the locator-to-expression
    /// side table accumulated during generation, consuming the generator.
    pub fn into_results(self) -> (FxHashMap<ExprId, Type>, FxHashMap<Locator, ExprId>) {
        (self.expr_types, self.site_exprs)
    }

    fn fresh(&mut self, options: OptionFlags) -> Type {
        Type::TypeVariable(self.graph.new_variable(options))
    }

    fn emit(&mut self, kind: ConstraintKind, locator: Locator) {
        let id = self.store.push_active(Constraint::new(kind, locator));
        for v in self.store.constraint(id).operand_type_variables() {
            self.graph.add_constraint(v, id);
        }
    }

    /// Entry point: generates constraints for the expression the caller is
    /// checking, returning its result type. This is the outermost call;
    /// `contextual_type`, when present, still has to be threaded in by the
    /// caller as a `Conversion` constraint against the returned type,
    /// since the generator itself has no notion of "the type this whole
    /// expression is expected to have".
    pub fn generate_root(&mut self, root: ExprId, purpose: ContextualPurpose) -> Type {
        let loc = self.locs.get_locator(root, vec![]);
        let _ = purpose;
        self.generate(root, loc)
    }

    /// Emits the contextual-type `Conversion` constraint `generate_root`'s
    /// own doc comment defers to the caller, anchored at the root locator.
    pub fn require_contextual_conversion(&mut self, root: ExprId, from: Type, to: Type) {
        let loc = self.locs.get_locator(root, vec![]);
        self.emit(ConstraintKind::Conversion(from, to), loc);
    }

    fn generate(&mut self, expr_id: ExprId, loc: Locator) -> Type {
        self.site_exprs.insert(loc, expr_id);
        let ty = self.generate_uncached(expr_id, loc);
        self.expr_types.insert(expr_id, ty.clone());
        ty
    }

    fn generate_uncached(&mut self, expr_id: ExprId, loc: Locator) -> Type {
        match &self.arena[expr_id] {
            Expr::IntegerLiteral => {
                let t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::LiteralConformsTo(t.clone(), self.lang.expressible_by_integer_literal), loc);
                t
            }
            Expr::FloatLiteral => {
                let t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::LiteralConformsTo(t.clone(), self.lang.expressible_by_float_literal), loc);
                t
            }
            Expr::StringLiteral => {
                let t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::LiteralConformsTo(t.clone(), self.lang.expressible_by_string_literal), loc);
                t
            }
            Expr::BooleanLiteral => {
                let t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::LiteralConformsTo(t.clone(), self.lang.expressible_by_boolean_literal), loc);
                t
            }
            Expr::InterpolatedString(parts) => {
                let t = self.fresh(OptionFlags::NONE);
                self.emit(
                    ConstraintKind::LiteralConformsTo(t.clone(), self.lang.expressible_by_string_interpolation),
                    loc,
                );
                let parts = parts.clone();
                for (i, part) in parts.into_iter().enumerate() {
                    let part_loc = self.locs.extend(loc, PathElement::TupleElement(i as u32));
                    self.generate(part, part_loc);
                }
                t
            }
            Expr::DeclRef { decl, ref_kind, is_iuo: _ } => self.generate_decl_ref(*decl, *ref_kind, loc),
            Expr::OverloadedDeclRef { candidates } => self.generate_overloaded_decl_ref(candidates.clone(), loc, None),
            Expr::MemberRef { base, name, ref_kind: _ } => {
                // Label stripping for member references is applied once the
                // simplifier resolves this constraint against a concrete
                // candidate set, not here, since no declaration is known yet.
                let base_loc = self.locs.extend(loc, PathElement::Member(name.clone()));
                let base_ty = self.generate(*base, base_loc);
                let result = self.fresh(OptionFlags::NONE);
                let member_loc = self.locs.extend(loc, PathElement::Member(name.clone()));
                self.emit(
                    ConstraintKind::Member {
                        base: base_ty,
                        name: name.clone(),
                        result: result.clone(),
                        kind: MemberRefKind::Value,
                    },
                    member_loc,
                );
                result
            }
            Expr::UnresolvedMember { name, args } => {
                let base_t = self.fresh(OptionFlags::NONE);
                let member_t = self.fresh(OptionFlags::NONE);
                let member_loc = self.locs.extend(loc, PathElement::Member(name.clone()));
                self.site_exprs.insert(member_loc, expr_id);
                self.emit(
                    ConstraintKind::UnresolvedMember {
                        base: Type::Metatype(Arc::new(base_t)),
                        name: name.clone(),
                        result: member_t.clone(),
                    },
                    member_loc,
                );
                if let Some(args) = args.clone() {
                    let (params, _) = self.generate_argument_list(&args, loc);
                    let result = self.fresh(OptionFlags::NONE);
                    self.emit(
                        ConstraintKind::ApplicableFunction {
                            function: member_t.clone(),
                            call: Type::function(params, result.clone(), Effects::default()),
                        },
                        loc,
                    );
                    return result;
                }
                member_t
            }
            Expr::Subscript { base, args } => {
                let base_loc = self.locs.extend(loc, PathElement::SubscriptIndex);
                let base_ty = self.generate(*base, base_loc);
                let args = args.clone();
                let (params, _) = self.generate_argument_list(&args, loc);
                let elem_t = self.fresh(OptionFlags::NONE);
                let fn_ty = Type::function(params.clone(), elem_t.clone(), Effects::default());
                let member_loc = self.locs.extend(loc, PathElement::Member(self.lang.subscript_name.clone()));
                self.emit(
                    ConstraintKind::Member { base: base_ty, name: self.lang.subscript_name.clone(), result: fn_ty, kind: MemberRefKind::Value },
                    member_loc,
                );
                // The call's argument types are threaded straight into
                // `fn_ty`'s params above, so the index-to-parameter match is
                // structural rather than a separate conversion constraint.
                elem_t
            }
            Expr::Apply { callee, args } => {
                let callee_loc = self.locs.extend(loc, PathElement::ApplyFunction);
                let args = args.clone();
                let callee_ty = self.generate_callee(*callee, callee_loc, args.len());
                let (params, _) = self.generate_argument_list(&args, loc);
                let result = self.fresh(OptionFlags::NONE);
                self.emit(
                    ConstraintKind::ApplicableFunction {
                        function: callee_ty,
                        call: Type::function(params, result.clone(), Effects::default()),
                    },
                    loc,
                );
                result
            }
            Expr::Paren(sub) => {
                let sub_loc = self.locs.extend(loc, PathElement::FunctionArgument(0));
                self.generate(*sub, sub_loc)
            }
            Expr::Tuple(elems) => {
                let elems = elems.clone();
                let mut elements = Vec::with_capacity(elems.len());
                let mut last_literal_var: Option<(std::mem::Discriminant<Expr>, TypeVarId)> = None;
                for (i, (name, elem_id)) in elems.into_iter().enumerate() {
                    let elem_loc = self.locs.extend(loc, PathElement::TupleElement(i as u32));
                    let ty = self.generate(elem_id, elem_loc);
                    let elem_expr = self.arena[elem_id].clone();
                    self.favor_literal_cluster(&elem_expr, &ty, &mut last_literal_var);
                    elements.push(TupleElement { name, ty });
                }
                Type::tuple(elements)
            }
            Expr::ArrayLiteral(elems) => {
                let t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::LiteralConformsTo(t.clone(), self.lang.expressible_by_array_literal), loc);
                let elem_member = Type::DependentMember { base: Arc::new(t.clone()), assoc: self.lang.array_element_assoc };
                let elems = elems.clone();
                let mut last_literal_var = None;
                for (i, elem_id) in elems.into_iter().enumerate() {
                    let elem_loc = self.locs.extend(loc, PathElement::ArrayElement);
                    let elem_ty = self.generate(elem_id, elem_loc);
                    let elem_expr = self.arena[elem_id].clone();
                    self.favor_literal_cluster(&elem_expr, &elem_ty, &mut last_literal_var);
                    self.emit(ConstraintKind::Conversion(elem_ty, elem_member.clone()), elem_loc);
                    let _ = i;
                }
                self.emit(ConstraintKind::Defaultable { target: elem_member, default: self.lang.any_type() }, loc);
                t
            }
            Expr::DictionaryLiteral(pairs) => {
                let t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::LiteralConformsTo(t.clone(), self.lang.expressible_by_dictionary_literal), loc);
                let key_member = Type::DependentMember { base: Arc::new(t.clone()), assoc: self.lang.dictionary_key_assoc };
                let value_member = Type::DependentMember { base: Arc::new(t.clone()), assoc: self.lang.dictionary_value_assoc };
                let pairs = pairs.clone();
                for (key_id, value_id) in pairs {
                    let key_loc = self.locs.extend(loc, PathElement::DictionaryKey);
                    let key_ty = self.generate(key_id, key_loc);
                    self.emit(ConstraintKind::Conversion(key_ty, key_member.clone()), key_loc);
                    let value_loc = self.locs.extend(loc, PathElement::DictionaryValue);
                    let value_ty = self.generate(value_id, value_loc);
                    self.emit(ConstraintKind::Conversion(value_ty, value_member.clone()), value_loc);
                }
                self.emit(ConstraintKind::Defaultable { target: key_member, default: self.lang.any_hashable_type() }, loc);
                self.emit(ConstraintKind::Defaultable { target: value_member, default: self.lang.any_type() }, loc);
                t
            }
            Expr::If { cond, then_branch, else_branch } => {
                let cond_loc = self.locs.extend(loc, PathElement::ApplyArgument);
                // The sanitizer fold: a condition that is already an
                // explicit coercion to Bool from an earlier pass doesn't
                // need a second one layered on top.
                let cond_ty = match &self.arena[*cond] {
                    Expr::Coerce { sub, target } if *target == self.lang.bool_type() => {
                        let sub = *sub;
                        self.generate(sub, cond_loc)
                    }
                    _ => self.generate(*cond, cond_loc),
                };
                self.emit(ConstraintKind::Conversion(cond_ty, self.lang.bool_type()), cond_loc);
                let result = self.fresh(OptionFlags::NONE);
                let then_loc = self.locs.extend(loc, PathElement::ConditionalOperand(true));
                let then_ty = self.generate(*then_branch, then_loc);
                self.emit(ConstraintKind::Conversion(then_ty, result.clone()), then_loc);
                let else_loc = self.locs.extend(loc, PathElement::ConditionalOperand(false));
                let else_ty = self.generate(*else_branch, else_loc);
                self.emit(ConstraintKind::Conversion(else_ty, result.clone()), else_loc);
                result
            }
            Expr::Coerce { sub, target } => {
                let target = target.clone();
                let sub_loc = self.locs.extend(loc, PathElement::ContextualType);
                let sub_ty = self.generate(*sub, sub_loc);
                self.emit(ConstraintKind::Conversion(sub_ty, target.clone()), sub_loc);
                target
            }
            Expr::ForcedCast { sub, target } => {
                let target = target.clone();
                let sub_loc = self.locs.extend(loc, PathElement::ContextualType);
                let sub_ty = self.generate(*sub, sub_loc);
                self.emit(ConstraintKind::CheckedCast(sub_ty, target.clone()), sub_loc);
                target
            }
            Expr::ConditionalCast { sub, target } => {
                let target = target.clone();
                let sub_loc = self.locs.extend(loc, PathElement::ContextualType);
                let sub_ty = self.generate(*sub, sub_loc);
                self.emit(ConstraintKind::CheckedCast(sub_ty, target.clone()), sub_loc);
                Type::optional(target)
            }
            Expr::Is { sub, target } => {
                let target = target.clone();
                let sub_loc = self.locs.extend(loc, PathElement::ContextualType);
                let sub_ty = self.generate(*sub, sub_loc);
                self.emit(ConstraintKind::CheckedCast(sub_ty, target), sub_loc);
                self.lang.bool_type()
            }
            Expr::Assign { lhs, rhs } => {
                let lhs_loc = self.locs.extend(loc, PathElement::InOutOperand);
                let lhs_ty = self.generate(*lhs, lhs_loc);
                let rhs_loc = self.locs.extend(loc, PathElement::FunctionArgument(0));
                let rhs_ty = self.generate(*rhs, rhs_loc);
                self.emit(ConstraintKind::Conversion(rhs_ty, lhs_ty), rhs_loc);
                self.lang.void_type()
            }
            Expr::BindOptional(sub) => {
                let sub_loc = self.locs.extend(loc, PathElement::OptionalPayload);
                let sub_ty = self.generate(*sub, sub_loc);
                let obj_t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::OptionalObject { optional: sub_ty, object: obj_t.clone() }, sub_loc);
                obj_t
            }
            Expr::ForceValue(sub) => {
                let sub_loc = self.locs.extend(loc, PathElement::OptionalPayload);
                let sub_ty = self.generate(*sub, sub_loc);
                let obj_t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::OptionalObject { optional: sub_ty, object: obj_t.clone() }, sub_loc);
                obj_t
            }
            Expr::OptionalEvaluation(sub) => {
                let sub_loc = self.locs.extend(loc, PathElement::OptionalPayload);
                let sub_ty = self.generate(*sub, sub_loc);
                let t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::Conversion(sub_ty, Type::optional(t.clone())), sub_loc);
                t
            }
            Expr::Closure(closure) => {
                let closure = closure.clone();
                let params: Vec<Param> = closure
                    .params
                    .iter()
                    .map(|p| Param {
                        label: None,
                        ty: p.annotation.clone().unwrap_or_else(|| self.fresh(OptionFlags::NONE)),
                        has_default: false,
                        variadic: false,
                        autoclosure: false,
                    })
                    .collect();
                let result = closure.explicit_result.clone().unwrap_or_else(|| self.fresh(OptionFlags::NONE));
                match closure.body {
                    ClosureBody::SingleExpression(body_id) => {
                        let body_loc = self.locs.extend(loc, PathElement::FunctionResult);
                        let body_ty = self.generate(body_id, body_loc);
                        self.emit(ConstraintKind::Conversion(body_ty, result.clone()), body_loc);
                    }
                    ClosureBody::Multi { has_return } => {
                        if !has_return {
                            self.emit(
                                ConstraintKind::Defaultable { target: result.clone(), default: self.lang.void_type() },
                                loc,
                            );
                        }
                    }
                }
                Type::function(params, result, Effects::default())
            }
            Expr::KeyPath(kp) => {
                let kp = kp.clone();
                let root_t = kp.root.clone().unwrap_or_else(|| self.fresh(OptionFlags::NONE));
                let mut cur = root_t.clone();
                for (i, component) in kp.components.iter().enumerate() {
                    let comp_loc = self.locs.extend(loc, PathElement::KeyPathComponent(i as u32));
                    match component {
                        KeyPathComponent::Property { name } => {
                            let val_t = self.fresh(OptionFlags::NONE);
                            self.emit(
                                ConstraintKind::Member { base: cur.clone(), name: name.clone(), result: val_t.clone(), kind: MemberRefKind::Value },
                                comp_loc,
                            );
                            cur = val_t;
                        }
                        KeyPathComponent::Subscript { args } => {
                            let (params, _) = self.generate_argument_list(args, comp_loc);
                            let val_t = self.fresh(OptionFlags::NONE);
                            let fn_ty = Type::function(params, val_t.clone(), Effects::default());
                            self.emit(
                                ConstraintKind::Member {
                                    base: cur.clone(),
                                    name: self.lang.subscript_name.clone(),
                                    result: fn_ty,
                                    kind: MemberRefKind::Value,
                                },
                                comp_loc,
                            );
                            cur = val_t;
                        }
                        KeyPathComponent::OptionalChain | KeyPathComponent::OptionalForce => {
                            let obj_t = self.fresh(OptionFlags::NONE);
                            self.emit(ConstraintKind::OptionalObject { optional: cur.clone(), object: obj_t.clone() }, comp_loc);
                            cur = obj_t;
                        }
                    }
                }
                let value_t = cur;
                let kp_t = self.fresh(OptionFlags::NONE);
                self.emit(ConstraintKind::KeyPath { key_path: kp_t.clone(), root: root_t, value: value_t }, loc);
                kp_t
            }
            Expr::InOut(sub) => {
                let inner = self.fresh(OptionFlags::CAN_BIND_LVALUE);
                let sub_loc = self.locs.extend(loc, PathElement::InOutOperand);
                let sub_ty = self.generate(*sub, sub_loc);
                self.emit(ConstraintKind::Conversion(sub_ty, Type::LValue(Arc::new(inner.clone()))), sub_loc);
                Type::InOut(Arc::new(inner))
            }
        }
    }

    fn generate_argument_list(&mut self, args: &[crate::ast::Argument], loc: Locator) -> (Vec<Param>, Type) {
        let mut params = Vec::with_capacity(args.len());
        let mut elements = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let arg_loc = self.locs.extend(loc, PathElement::FunctionArgument(i as u32));
            let ty = self.generate(arg.value, arg_loc);
            params.push(Param { label: arg.label.clone(), ty: ty.clone(), has_default: false, variadic: false, autoclosure: false });
            elements.push(TupleElement { name: arg.label.clone(), ty });
        }
        (params, Type::tuple(elements))
    }

    fn generate_decl_ref(&mut self, decl: DeclId, ref_kind: RefKind, loc: Locator) -> Type {
        let opened = self.open_generic_reference(decl, loc);
        let stripped = strip_for_ref_kind(&opened, ref_kind);
        let target_var = self.graph.new_variable(OptionFlags::NONE);
        self.emit(ConstraintKind::Bind(Type::TypeVariable(target_var), stripped), loc);
        self.emit(
            ConstraintKind::BindOverload(BindOverload { target: target_var, choice: OverloadChoice::Decl { decl, ref_kind } }),
            loc,
        );
        Type::TypeVariable(target_var)
    }

    /// Called either for a bare overloaded reference (`arg_count: None`) or
    /// from `Apply` on a callee that is itself overloaded, in which case
    /// `arg_count` lets the favoring pass single out the one candidate
    /// whose arity matches the call and split the disjunction into a
    /// favored branch plus the rest.
    fn generate_overloaded_decl_ref(&mut self, candidates: Vec<DeclId>, loc: Locator, arg_count: Option<usize>) -> Type {
        let target_var = self.graph.new_variable(OptionFlags::NONE);
        let favored_index = arg_count.and_then(|n| {
            let collab = self.collab;
            let matches: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|(_, d)| matches!(&collab.interface_type(**d), Type::Function { params, .. } if params.len() == n))
                .map(|(i, _)| i)
                .collect();
            (matches.len() == 1).then(|| matches[0])
        });
        let mut choices: Vec<Constraint> = candidates
            .into_iter()
            .map(|decl| {
                Constraint::new(
                    ConstraintKind::BindOverload(BindOverload { target: target_var, choice: OverloadChoice::Decl { decl, ref_kind: RefKind::Unapplied } }),
                    loc,
                )
            })
            .collect();
        match favored_index {
            Some(i) => {
                let favored = choices.remove(i).favored();
                let others = Constraint::new(ConstraintKind::Disjunction(choices), loc);
                self.emit(ConstraintKind::Disjunction(vec![favored, others]), loc);
            }
            None => self.emit(ConstraintKind::Disjunction(choices), loc),
        }
        Type::TypeVariable(target_var)
    }

    fn generate_callee(&mut self, callee: ExprId, loc: Locator, arg_count: usize) -> Type {
        if let Expr::OverloadedDeclRef { candidates } = &self.arena[callee] {
            let candidates = candidates.clone();
            return self.generate_overloaded_decl_ref(candidates, loc, Some(arg_count));
        }
        self.generate(callee, loc)
    }

    /// Mints a fresh type variable per generic parameter of `decl`'s
    /// signature, substitutes them into its interface type, and restates
    /// every requirement as a constraint anchored under `OpenedGeneric`.
    fn open_generic_reference(&mut self, decl: DeclId, loc: Locator) -> Type {
        let (ty, reqs) = open_generic(self.collab, self.graph, self.locs, decl, loc);
        for (req, req_loc) in reqs {
            self.emit_requirement(req, req_loc);
        }
        ty
    }

    fn emit_requirement(&mut self, req: Requirement, loc: Locator) {
        for kind in requirement_to_constraint_kind(req) {
            self.emit(kind, loc);
        }
    }

    /// Merges the type variables of adjacent same-kind literals into one
    /// equivalence class, so the solver treats a run like `[1, 2, 3]` as a
    /// single unknown rather than branching on each element's default
    /// literal type independently.
    fn favor_literal_cluster(
        &mut self,
        expr: &Expr,
        ty: &Type,
        last: &mut Option<(std::mem::Discriminant<Expr>, TypeVarId)>,
    ) {
        let Some(var) = ty.as_type_variable() else { return };
        let is_literal = matches!(expr, Expr::IntegerLiteral | Expr::FloatLiteral | Expr::StringLiteral | Expr::BooleanLiteral);
        if !is_literal {
            *last = None;
            return;
        }
        let kind = std::mem::discriminant(expr);
        match last {
            Some((prev_kind, prev_var)) if *prev_kind == kind => {
                self.graph.merge(*prev_var, var);
            }
            _ => {
                *last = Some((kind, var));
            }
        }
    }
}

pub(crate) fn curry_depth(ty: &Type) -> usize {
    match ty {
        Type::Function { result, .. } => 1 + curry_depth(result),
        _ => 0,
    }
}

pub(crate) fn strip_for_ref_kind(ty: &Type, ref_kind: RefKind) -> Type {
    match ref_kind {
        RefKind::DoubleApply => ty.clone(),
        RefKind::SingleApply => ty.remove_argument_labels(1),
        RefKind::Unapplied | RefKind::Compound => ty.remove_argument_labels(curry_depth(ty)),
    }
}

/// Shared by `Generator::open_generic_reference` and the solver's
/// `BindOverload` application (`solve.rs`): mints one fresh variable per
/// generic parameter, substitutes them into the interface type, and
/// returns the substituted requirements for the caller to emit — the two
/// call sites use different `emit` helpers (one bound to a `Generator`,
/// one to the solver's working constraint set), so only the substitution
/// arithmetic is shared.
pub(crate) fn open_generic(
    collab: &SharedCollaborators,
    graph: &mut ConstraintGraph,
    locs: &mut LocatorAllocator,
    decl: DeclId,
    loc: Locator,
) -> (Type, Vec<(Requirement, Locator)>) {
    let iface = collab.interface_type(decl);
    let Some(sig) = collab.generic_signature(decl) else { return (iface, Vec::new()) };
    let map: Vec<(DeclId, Type)> =
        sig.params.iter().map(|p| (*p, Type::TypeVariable(graph.new_variable(OptionFlags::NONE)))).collect();
    let opened_loc = locs.extend(loc, PathElement::OpenedGeneric);
    let reqs = sig
        .requirements
        .iter()
        .enumerate()
        .map(|(i, req)| {
            let substituted = collab.substitute_requirement(req, &map);
            let req_loc = locs.extend(opened_loc, PathElement::GenericParameter(i as u32));
            (substituted, req_loc)
        })
        .collect();
    (collab.substitute_type(&iface, &map), reqs)
}

pub(crate) fn requirement_to_constraint_kind(req: Requirement) -> Option<ConstraintKind> {
    match req {
        Requirement::Conforms(ty, protocol) => Some(ConstraintKind::ConformsTo(ty, protocol)),
        Requirement::Superclass(sub, sup) => Some(ConstraintKind::Subtype(sub, sup)),
        Requirement::SameType(a, b) => Some(ConstraintKind::Equal(a, b)),
        Requirement::Layout(_) => None,
    }
}
