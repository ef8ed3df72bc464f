//! The constraint simplifier: pops constraints off the active worklist and
//! rewrites each into "solved", "unsolved" (parked until a mentioned
//! variable gets fixed), or "error". Modeled on the original compiler's
//! `ConstraintSystem::simplify`/`matchTypes` pair — one shared structural
//! matcher that every relational constraint kind funnels through, plus a
//! handful of per-kind rules for the non-relational ones (member lookup,
//! overload construction, conformance, defaulting).

use std::sync::Arc;

use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::ast::RefKind;
use crate::collab::{ConformanceFlags, MemberCandidate, SharedCollaborators};
use crate::constraint::{
    BindOverload, Constraint, ConstraintKind, MatchFlags, OverloadChoice, Restriction,
};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::generate::{open_generic, requirement_to_constraint_kind};
use crate::graph::ConstraintGraph;
use crate::locator::{Locator, LocatorAllocator};
use crate::store::{ConstraintId, ConstraintStore};
use crate::types::{Type, TypeVarId};

/// The outcome of simplifying one constraint, mirroring the three cases
/// §4.6's worklist pseudocode dispatches on.
pub enum StepOutcome {
    Solved,
    Unsolved,
    Failed(Diagnostic),
}

/// One "what actually relates these two types" question, abstracting over
/// the several `ConstraintKind` variants `matchTypes` treats identically
/// apart from how strict the relation is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Relation {
    Bind,
    Equal,
    Subtype,
    Convert,
}

pub struct Simplifier<'a> {
    graph: &'a mut ConstraintGraph,
    store: &'a mut ConstraintStore,
    locs: &'a mut LocatorAllocator,
    collab: &'a SharedCollaborators,
    /// Restrictions discovered while matching `Conversion`/`Restricted`
    /// constraints, folded into the final `Solution` by the solver.
    pub restrictions: Vec<(Type, Type, Restriction)>,
    /// Locators whose `Member`/`UnresolvedMember` constraint had no viable
    /// candidate, kept around for the failure diagnoser.
    pub unviable: Vec<Diagnostic>,
}

impl<'a> Simplifier<'a> {
    pub fn new(
        graph: &'a mut ConstraintGraph,
        store: &'a mut ConstraintStore,
        locs: &'a mut LocatorAllocator,
        collab: &'a SharedCollaborators,
    ) -> Self {
        Simplifier { graph, store, locs, collab, restrictions: Vec::new(), unviable: Vec::new() }
    }

    fn emit(&mut self, kind: ConstraintKind, locator: Locator) -> ConstraintId {
        let id = self.store.push_active(Constraint::new(kind, locator));
        for v in self.store.constraint(id).operand_type_variables() {
            self.graph.add_constraint(v, id);
        }
        id
    }

    /// Runs the worklist to a fixed point. Because [`ConstraintGraph::bind`]
    /// already reactivates affected constraints straight onto the active
    /// list, the outer "repeat until fixed point" collapses into this
    /// single `while Active nonempty` loop — there is nothing left to
    /// re-scan once it drains.
    pub fn run_to_fixed_point(&mut self) -> Result<(), Diagnostic> {
        while let Some(id) = self.store.pop_active() {
            match self.simplify_one(id) {
                StepOutcome::Solved => self.store.retire(id),
                StepOutcome::Unsolved => self.store.deactivate(id),
                StepOutcome::Failed(diag) => return Err(diag),
            }
        }
        Ok(())
    }

    fn simplify_one(&mut self, id: ConstraintId) -> StepOutcome {
        let c = self.store.constraint(id).clone();
        match c.kind {
            ConstraintKind::Bind(a, b) => self.relate(&a, &b, Relation::Bind, c.flags, c.locator),
            ConstraintKind::Equal(a, b) => self.relate(&a, &b, Relation::Equal, c.flags, c.locator),
            ConstraintKind::Subtype(a, b) => self.relate(&a, &b, Relation::Subtype, c.flags, c.locator),
            ConstraintKind::Conversion(a, b)
            | ConstraintKind::ArgumentConversion(a, b)
            | ConstraintKind::OperatorArgumentConversion(a, b)
            | ConstraintKind::BridgingConversion(a, b) => self.relate(&a, &b, Relation::Convert, c.flags, c.locator),
            ConstraintKind::CheckedCast(sub, target) => self.simplify_checked_cast(&sub, &target),
            ConstraintKind::LiteralConformsTo(ty, protocol) => self.simplify_conforms(&ty, protocol, true, c.locator),
            ConstraintKind::ConformsTo(ty, protocol) => self.simplify_conforms(&ty, protocol, false, c.locator),
            ConstraintKind::SelfObjectOfProtocol(ty, protocol) => self.simplify_conforms(&ty, protocol, false, c.locator),
            ConstraintKind::Member { base, name, result, .. } => {
                self.simplify_member(&base, &name, &result, c.locator)
            }
            ConstraintKind::UnresolvedMember { base, name, result } => {
                self.simplify_unresolved_member(&base, &name, &result, c.locator)
            }
            ConstraintKind::Defaultable { target, .. } => self.simplify_defaultable(&target),
            ConstraintKind::ApplicableFunction { function, call } => {
                self.simplify_applicable_function(&function, &call, c.locator)
            }
            ConstraintKind::DynamicTypeOf(a, b) => {
                self.relate(&a, &Type::Metatype(Arc::new(b)), Relation::Bind, MatchFlags::NONE, c.locator)
            }
            ConstraintKind::OptionalObject { optional, object } => {
                self.simplify_optional_object(&optional, &object, c.locator)
            }
            ConstraintKind::EscapableFunctionOf(a, b) => {
                self.relate(&a, &b, Relation::Equal, MatchFlags::NONE, c.locator)
            }
            ConstraintKind::OpenedExistentialOf(a, b) => {
                self.relate(&a, &b, Relation::Bind, MatchFlags::NONE, c.locator)
            }
            ConstraintKind::KeyPath { .. } | ConstraintKind::KeyPathApplication { .. } => StepOutcome::Solved,
            ConstraintKind::BindOverload(bo) => self.simplify_bind_overload(bo, c.locator),
            ConstraintKind::Disjunction(_) => StepOutcome::Unsolved,
            ConstraintKind::Conjunction(terms) => {
                for term in terms {
                    self.emit(term.kind, term.locator);
                }
                StepOutcome::Solved
            }
            ConstraintKind::Restricted { kind, lhs, rhs } => {
                self.restrictions.push((lhs.clone(), rhs.clone(), kind));
                self.relate(&lhs, &rhs, Relation::Equal, MatchFlags::NONE, c.locator)
            }
        }
    }

    /// Rewrites an embedded type variable to its class representative's
    /// fixed binding, the way [`crate::types::simplify`] does, but driven
    /// by the mutable union-find table rather than a `&dyn FixedLookup`
    /// snapshot — `FixedLookup` takes `&self`, which can't express "follow
    /// path compression while canonicalizing", so the simplifier keeps its
    /// own copy of the same recursion instead of forcing that trait to fit.
    pub(crate) fn canonicalize(&mut self, ty: &Type) -> Type {
        match ty {
            Type::TypeVariable(id) => {
                let root = self.graph.find(*id);
                match self.graph.fixed_binding(root) {
                    Some(bound) => self.canonicalize(&bound),
                    None => Type::TypeVariable(root),
                }
            }
            Type::Nominal { decl, parent, generic_args } => Type::Nominal {
                decl: *decl,
                parent: parent.as_deref().map(|t| Arc::new(self.canonicalize(t))),
                generic_args: generic_args.iter().map(|t| self.canonicalize(t)).collect::<Vec<_>>().into(),
            },
            Type::Tuple(elems) => Type::Tuple(
                elems
                    .iter()
                    .map(|e| crate::types::TupleElement { name: e.name.clone(), ty: self.canonicalize(&e.ty) })
                    .collect::<Vec<_>>()
                    .into(),
            ),
            Type::Function { params, result, effects } => Type::Function {
                params: params
                    .iter()
                    .map(|p| crate::types::Param { ty: self.canonicalize(&p.ty), ..p.clone() })
                    .collect::<Vec<_>>()
                    .into(),
                result: Arc::new(self.canonicalize(result)),
                effects: *effects,
            },
            Type::Metatype(t) => Type::Metatype(Arc::new(self.canonicalize(t))),
            Type::Optional(t) => Type::Optional(Arc::new(self.canonicalize(t))),
            Type::LValue(t) => Type::LValue(Arc::new(self.canonicalize(t))),
            Type::InOut(t) => Type::InOut(Arc::new(self.canonicalize(t))),
            Type::DependentMember { base, assoc } => {
                // Resolving the witness needs the owning protocol, which a
                // bare `DependentMember` doesn't carry; left in place for
                // the collaborator layer to resolve once a conformance
                // constraint on `base` has narrowed it down.
                Type::DependentMember { base: Arc::new(self.canonicalize(base)), assoc: *assoc }
            }
            Type::Existential(_) | Type::Unbound(_) | Type::Error => ty.clone(),
        }
    }

    /// The shared `matchTypes` kernel (§4.6): canonicalizes both sides,
    /// then dispatches on their constructor shapes.
    fn relate(&mut self, lhs: &Type, rhs: &Type, rel: Relation, flags: MatchFlags, loc: Locator) -> StepOutcome {
        let a = self.canonicalize(lhs);
        let b = self.canonicalize(rhs);

        if let (Type::TypeVariable(x), Type::TypeVariable(y)) = (&a, &b) {
            let (x, y) = (self.graph.find(*x), self.graph.find(*y));
            if x != y {
                self.graph.merge(x, y);
            }
            return StepOutcome::Solved;
        }
        if let Type::TypeVariable(v) = &a {
            return self.bind_variable(*v, &b, loc);
        }
        if let Type::TypeVariable(v) = &b {
            return self.bind_variable(*v, &a, loc);
        }

        match (&a, &b) {
            (Type::Tuple(xs), Type::Tuple(ys)) => {
                if xs.len() != ys.len() {
                    return self.mismatch(&a, &b, loc);
                }
                for (x, y) in xs.iter().zip(ys.iter()) {
                    if x.name != y.name && !flags.contains(MatchFlags::ALLOW_LABEL_MISMATCH) {
                        return self.mismatch(&a, &b, loc);
                    }
                    match self.relate(&x.ty, &y.ty, rel, flags, loc) {
                        StepOutcome::Solved => continue,
                        other => return other,
                    }
                }
                StepOutcome::Solved
            }
            (Type::Function { params: ps, result: rs, effects: es }, Type::Function { params: pt, result: rt, effects: et }) => {
                if ps.len() != pt.len() {
                    return self.mismatch(&a, &b, loc);
                }
                if es.throws && !et.throws && !flags.contains(MatchFlags::IGNORE_NOESCAPE_MISMATCH) {
                    return self.mismatch(&a, &b, loc);
                }
                for (p, q) in ps.iter().zip(pt.iter()) {
                    // Contravariant: match the callee's declared parameter
                    // against the call site's, swapped.
                    match self.relate(&q.ty, &p.ty, rel, flags, loc) {
                        StepOutcome::Solved => continue,
                        other => return other,
                    }
                }
                self.relate(rs, rt, rel, flags, loc)
            }
            (Type::Metatype(x), Type::Metatype(y))
            | (Type::Optional(x), Type::Optional(y))
            | (Type::LValue(x), Type::LValue(y))
            | (Type::InOut(x), Type::InOut(y)) => self.relate(x, y, rel, flags, loc),
            (Type::Existential(protocols), other) if rel == Relation::Convert || rel == Relation::Subtype => {
                let protocols = protocols.clone();
                for p in protocols.iter() {
                    match self.check_conformance(other, *p) {
                        Some(_) => continue,
                        None => return self.mismatch(&a, &b, loc),
                    }
                }
                StepOutcome::Solved
            }
            (Type::Nominal { decl: d1, parent: p1, generic_args: g1 }, Type::Nominal { decl: d2, parent: p2, generic_args: g2 }) => {
                if d1 != d2 || g1.len() != g2.len() {
                    return self.mismatch(&a, &b, loc);
                }
                if let (Some(p1), Some(p2)) = (p1.as_deref(), p2.as_deref()) {
                    match self.relate(p1, p2, rel, flags, loc) {
                        StepOutcome::Solved => {}
                        other => return other,
                    }
                }
                let pairs: Vec<(Type, Type)> = g1.iter().cloned().zip(g2.iter().cloned()).collect();
                for (x, y) in pairs {
                    match self.relate(&x, &y, Relation::Equal, flags, loc) {
                        StepOutcome::Solved => continue,
                        other => return other,
                    }
                }
                StepOutcome::Solved
            }
            _ if a == b => StepOutcome::Solved,
            _ => self.mismatch(&a, &b, loc),
        }
    }

    fn mismatch(&self, a: &Type, b: &Type, loc: Locator) -> StepOutcome {
        StepOutcome::Failed(Diagnostic {
            anchor: self.locs.anchor(loc),
            kind: DiagnosticKind::TypeMismatch { expected: a.clone(), actual: b.clone() },
            locators: vec![loc],
        })
    }

    fn bind_variable(&mut self, v: TypeVarId, ty: &Type, loc: Locator) -> StepOutcome {
        let root = self.graph.find(v);
        let options = self.graph.options(root);
        if matches!(ty, Type::LValue(_)) && !options.contains(crate::types::OptionFlags::CAN_BIND_LVALUE) {
            return self.mismatch(&Type::TypeVariable(root), ty, loc);
        }
        if matches!(ty, Type::InOut(_)) && !options.contains(crate::types::OptionFlags::CAN_BIND_INOUT) {
            return self.mismatch(&Type::TypeVariable(root), ty, loc);
        }
        if ty.mentions(root) {
            return StepOutcome::Failed(Diagnostic {
                anchor: self.locs.anchor(loc),
                kind: DiagnosticKind::TypeMismatch { expected: Type::TypeVariable(root), actual: ty.clone() },
                locators: vec![loc],
            });
        }
        self.graph.bind(root, ty.clone(), self.store);
        StepOutcome::Solved
    }

    fn simplify_checked_cast(&mut self, sub: &Type, target: &Type) -> StepOutcome {
        let sub = self.canonicalize(sub);
        let target = self.canonicalize(target);
        if sub.has_type_variable() || target.has_type_variable() {
            return StepOutcome::Unsolved;
        }
        // Feasibility analysis for bridging/existential-opening casts is
        // out of scope here; a cast between two already-concrete types is
        // accepted structurally without checking subtyping lattice depth.
        StepOutcome::Solved
    }

    fn check_conformance(&mut self, ty: &Type, protocol: crate::types::ProtocolId) -> Option<crate::collab::ConformanceRef> {
        self.collab.check_conformance(ty, protocol, ConformanceFlags { track_dependency: false, skip_conditional_requirements: false })
    }

    fn simplify_conforms(&mut self, ty: &Type, protocol: crate::types::ProtocolId, is_literal: bool, loc: Locator) -> StepOutcome {
        let ty = self.canonicalize(ty);
        if ty.has_type_variable() {
            // Literal defaulting happens in the solver's binding phase,
            // once every other active constraint has stopped making
            // progress, not here.
            return StepOutcome::Unsolved;
        }
        let _ = is_literal;
        if let Type::Existential(protocols) = &ty {
            if protocols.contains(&protocol) && self.collab.allows_self_conformance(protocol) {
                return StepOutcome::Solved;
            }
        }
        match self.check_conformance(&ty, protocol) {
            Some(_) => StepOutcome::Solved,
            None => StepOutcome::Failed(Diagnostic {
                anchor: self.locs.anchor(loc),
                kind: DiagnosticKind::CannotConvert { from: ty, to: Type::Existential(Arc::from([protocol])) },
                locators: vec![loc],
            }),
        }
    }

    fn simplify_member(&mut self, base: &Type, name: &Arc<str>, result: &Type, loc: Locator) -> StepOutcome {
        let base = self.canonicalize(base);
        if base.has_type_variable() {
            return StepOutcome::Unsolved;
        }
        let candidates = self.collab.lookup_member(&base, name);
        self.resolve_member_candidates(candidates, result, name, loc)
    }

    fn simplify_unresolved_member(&mut self, base: &Type, name: &Arc<str>, result: &Type, loc: Locator) -> StepOutcome {
        let base = self.canonicalize(base);
        let inner = match &base {
            Type::Metatype(t) => (**t).clone(),
            other => other.clone(),
        };
        if inner.has_type_variable() {
            return StepOutcome::Unsolved;
        }
        let candidates = self.collab.lookup_member(&inner, name);
        self.resolve_member_candidates(candidates, result, name, loc)
    }

    fn resolve_member_candidates(
        &mut self,
        candidates: Vec<MemberCandidate>,
        result: &Type,
        name: &Arc<str>,
        loc: Locator,
    ) -> StepOutcome {
        let viable: Vec<MemberCandidate> = candidates
            .into_iter()
            .filter(|c| c.applicability == crate::collab::Applicability::Viable)
            .unique_by(|c| c.decl)
            .collect();
        if viable.is_empty() {
            let diag = Diagnostic {
                anchor: self.locs.anchor(loc),
                kind: DiagnosticKind::MissingMember { name: name.to_string() },
                locators: vec![loc],
            };
            self.unviable.push(diag.clone());
            return StepOutcome::Failed(diag);
        }
        let Some(target) = result.as_type_variable() else {
            return StepOutcome::Unsolved;
        };
        let branches: Vec<Constraint> = viable
            .into_iter()
            .map(|cand| {
                Constraint::new(
                    ConstraintKind::BindOverload(BindOverload {
                        target,
                        choice: OverloadChoice::Decl { decl: cand.decl, ref_kind: RefKind::SingleApply },
                    }),
                    loc,
                )
            })
            .collect();
        if branches.len() == 1 {
            self.emit(branches.into_iter().next().unwrap().kind, loc);
        } else {
            self.emit(ConstraintKind::Disjunction(branches), loc);
        }
        StepOutcome::Solved
    }

    fn simplify_defaultable(&mut self, target: &Type) -> StepOutcome {
        let target = self.canonicalize(target);
        if target.has_type_variable() {
            StepOutcome::Unsolved
        } else {
            StepOutcome::Solved
        }
    }

    fn simplify_applicable_function(&mut self, function: &Type, call: &Type, loc: Locator) -> StepOutcome {
        let function = self.canonicalize(function);
        if function.has_type_variable() {
            return StepOutcome::Unsolved;
        }
        let Type::Function { params: fn_params, .. } = &function else {
            return self.mismatch(&function, call, loc);
        };
        let Type::Function { params: call_params, .. } = call else {
            return self.mismatch(&function, call, loc);
        };
        match match_arguments(fn_params, call_params) {
            Ok(pairs) => {
                for (arg_ty, param_ty) in pairs {
                    self.emit(ConstraintKind::ArgumentConversion(arg_ty, param_ty), loc);
                }
                StepOutcome::Solved
            }
            Err(()) => StepOutcome::Failed(Diagnostic {
                anchor: self.locs.anchor(loc),
                kind: DiagnosticKind::TypeMismatch { expected: function.clone(), actual: call.clone() },
                locators: vec![loc],
            }),
        }
    }

    fn simplify_optional_object(&mut self, optional: &Type, object: &Type, loc: Locator) -> StepOutcome {
        let optional = self.canonicalize(optional);
        match &optional {
            Type::Optional(inner) => self.relate(inner, object, Relation::Equal, MatchFlags::NONE, loc),
            Type::TypeVariable(_) => {
                let object_c = self.canonicalize(object);
                if object_c.has_type_variable() {
                    StepOutcome::Unsolved
                } else {
                    self.relate(&optional, &Type::optional(object_c), Relation::Bind, MatchFlags::NONE, loc)
                }
            }
            _ => self.mismatch(&optional, object, loc),
        }
    }

    /// Applies a selected overload: opens the declaration's generics (via
    /// the same helper [`crate::generate::open_generic_reference`] uses)
    /// and binds the disjunction's target variable to the result.
    fn simplify_bind_overload(&mut self, bo: BindOverload, loc: Locator) -> StepOutcome {
        let ty = match &bo.choice {
            OverloadChoice::Decl { decl, ref_kind } => {
                let (opened, reqs) = open_generic(self.collab, self.graph, self.locs, *decl, loc);
                let stripped = crate::generate::strip_for_ref_kind(&opened, *ref_kind);
                for (req, req_loc) in reqs {
                    if let Some(kind) = requirement_to_constraint_kind(req) {
                        self.emit(kind, req_loc);
                    }
                }
                stripped
            }
            OverloadChoice::DeclViaDynamic(decl)
            | OverloadChoice::DeclViaBridge(decl)
            | OverloadChoice::DeclViaUnwrappedOptional(decl) => self.collab.interface_type(*decl),
            OverloadChoice::TupleIndex(_) | OverloadChoice::KeyPathApplication => return StepOutcome::Solved,
            OverloadChoice::BaseType(t) => t.clone(),
        };
        self.bind_variable(bo.target, &ty, loc)
    }
}

/// The §4.6.1 argument-to-parameter matcher. Both sides are already
/// `Param` lists (arguments carry their label in `label`, matching a
/// `Param`'s shape, the way `generate_argument_list` builds them).
/// Missing arguments are permitted only when the parameter is
/// defaultable; extra positional arguments or unmatched labels fail the
/// whole call. Returns the matched `(argument, parameter)` type pairs for
/// the caller to turn into `ArgumentConversion` constraints.
fn match_arguments(params: &[crate::types::Param], args: &[crate::types::Param]) -> Result<Vec<(Type, Type)>, ()> {
    let mut pairs = Vec::with_capacity(params.len());
    let mut consumed: FxHashSet<usize> = FxHashSet::default();
    let mut next_positional = 0usize;

    for param in params {
        let found = match &param.label {
            Some(label) => {
                (0..args.len()).find(|i| !consumed.contains(i) && args[*i].label.as_ref() == Some(label))
            }
            None => (next_positional..args.len()).find(|i| !consumed.contains(i) && args[*i].label.is_none()),
        };
        match found {
            Some(i) => {
                consumed.insert(i);
                if param.label.is_none() {
                    next_positional = i + 1;
                }
                pairs.push((args[i].ty.clone(), param.ty.clone()));
            }
            None if param.variadic => {
                while let Some(i) = (next_positional..args.len()).find(|i| !consumed.contains(i)) {
                    consumed.insert(i);
                    pairs.push((args[i].ty.clone(), param.ty.clone()));
                    next_positional = i + 1;
                }
            }
            None if param.has_default => continue,
            None => return Err(()),
        }
    }
    if consumed.len() != args.len() {
        return Err(());
    }
    Ok(pairs)
}
