//! A minimal collaborator implementation and a handful of prelude
//! declarations (`Int`, `Double`, `Array<T>`, overloaded `+`), standing in
//! for the real name-lookup/conformance/substitution layer a driver would
//! plug in. Shared by the scenario and property tests so neither has to
//! rebuild the prelude from scratch.

use std::sync::Arc;

use constraint_solver::ast::{Argument, Expr};
use constraint_solver::collab::{
    Applicability, ConformanceFlags, ConformanceChecker, ConformanceRef, DefaultLiteralTypes, GenericSignature,
    MemberCandidate, NameLookup, Requirement, SharedCollaborators, Substitution,
};
use constraint_solver::generate::LangItems;
use constraint_solver::types::{AssocId, DeclId, Effects, OptionFlags, Param, ProtocolId, Type};
use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;

pub const BOOL: DeclId = DeclId(0);
pub const ANY: DeclId = DeclId(1);
pub const ANY_HASHABLE: DeclId = DeclId(2);
pub const VOID: DeclId = DeclId(3);
pub const INT: DeclId = DeclId(10);
pub const DOUBLE: DeclId = DeclId(11);
pub const ARRAY: DeclId = DeclId(12);
pub const PLUS_INT: DeclId = DeclId(20);
pub const PLUS_DOUBLE: DeclId = DeclId(21);

pub const EXPRESSIBLE_BY_INTEGER_LITERAL: ProtocolId = ProtocolId(0);
pub const EXPRESSIBLE_BY_FLOAT_LITERAL: ProtocolId = ProtocolId(1);
pub const EXPRESSIBLE_BY_ARRAY_LITERAL: ProtocolId = ProtocolId(5);

pub fn int_ty() -> Type {
    Type::Nominal { decl: INT, parent: None, generic_args: Arc::from([]) }
}

pub fn double_ty() -> Type {
    Type::Nominal { decl: DOUBLE, parent: None, generic_args: Arc::from([]) }
}

pub fn array_ty(elem: Type) -> Type {
    Type::Nominal { decl: ARRAY, parent: None, generic_args: Arc::from([elem]) }
}

pub fn any_ty() -> Type {
    Type::Nominal { decl: ANY, parent: None, generic_args: Arc::from([]) }
}

fn binary_op(param: Type, result: Type) -> Type {
    Type::function(
        vec![
            Param { label: None, ty: param.clone(), has_default: false, variadic: false, autoclosure: false },
            Param { label: None, ty: param, has_default: false, variadic: false, autoclosure: false },
        ],
        result,
        Effects::default(),
    )
}

pub fn lang_items() -> LangItems {
    LangItems {
        expressible_by_integer_literal: EXPRESSIBLE_BY_INTEGER_LITERAL,
        expressible_by_float_literal: EXPRESSIBLE_BY_FLOAT_LITERAL,
        expressible_by_string_literal: ProtocolId(2),
        expressible_by_string_interpolation: ProtocolId(3),
        expressible_by_boolean_literal: ProtocolId(4),
        expressible_by_array_literal: EXPRESSIBLE_BY_ARRAY_LITERAL,
        expressible_by_dictionary_literal: ProtocolId(6),
        bool_decl: BOOL,
        any_decl: ANY,
        any_hashable_decl: ANY_HASHABLE,
        void_decl: VOID,
        array_element_assoc: AssocId(0),
        dictionary_key_assoc: AssocId(1),
        dictionary_value_assoc: AssocId(2),
        subscript_name: Arc::from("subscript"),
    }
}

/// A fixed little prelude: `Int`/`Double` each conform to their literal
/// protocol, and `+` is overloaded over both. Every method that isn't
/// exercised by the scenario/property tests just returns the "nothing
/// found" answer rather than a realistic one.
pub struct Prelude {
    interfaces: FxHashMap<DeclId, Type>,
}

impl Prelude {
    pub fn new() -> SharedCollaborators {
        let mut interfaces = FxHashMap::default();
        interfaces.insert(PLUS_INT, binary_op(int_ty(), int_ty()));
        interfaces.insert(PLUS_DOUBLE, binary_op(double_ty(), double_ty()));
        Arc::new(Prelude { interfaces })
    }
}

impl NameLookup for Prelude {
    fn lookup_member(&self, _base: &Type, _name: &str) -> Vec<MemberCandidate> {
        Vec::new()
    }
    fn lookup_overloads(&self, decls: &[DeclId]) -> Vec<MemberCandidate> {
        decls
            .iter()
            .map(|d| MemberCandidate { decl: *d, ty: self.interface_type(*d), applicability: Applicability::Viable, is_iuo: false })
            .collect()
    }
    fn lookup_initializers(&self, _ty: &Type) -> Vec<MemberCandidate> {
        Vec::new()
    }
}

impl ConformanceChecker for Prelude {
    fn check_conformance(&self, ty: &Type, protocol: ProtocolId, _flags: ConformanceFlags) -> Option<ConformanceRef> {
        let Type::Nominal { decl, .. } = ty else { return None };
        let conforms = (protocol == EXPRESSIBLE_BY_INTEGER_LITERAL && (*decl == INT || *decl == DOUBLE))
            || (protocol == EXPRESSIBLE_BY_FLOAT_LITERAL && *decl == DOUBLE)
            || (protocol == EXPRESSIBLE_BY_ARRAY_LITERAL && *decl == ARRAY);
        conforms.then(|| ConformanceRef(0))
    }
    fn associated_type_witness(&self, _ty: &Type, _protocol: ProtocolId, _assoc: AssocId) -> Option<Type> {
        None
    }
    fn allows_self_conformance(&self, _protocol: ProtocolId) -> bool {
        false
    }
}

impl Substitution for Prelude {
    fn substitute_type(&self, ty: &Type, _map: &[(DeclId, Type)]) -> Type {
        ty.clone()
    }
    fn substitute_requirement(&self, req: &Requirement, _map: &[(DeclId, Type)]) -> Requirement {
        req.clone()
    }
    fn interface_type(&self, decl: DeclId) -> Type {
        self.interfaces.get(&decl).cloned().unwrap_or(Type::Error)
    }
    fn generic_signature(&self, _decl: DeclId) -> Option<GenericSignature> {
        None
    }
}

impl DefaultLiteralTypes for Prelude {
    fn default_type_for(&self, protocol: ProtocolId) -> Option<Type> {
        match protocol {
            EXPRESSIBLE_BY_INTEGER_LITERAL => Some(int_ty()),
            EXPRESSIBLE_BY_FLOAT_LITERAL => Some(double_ty()),
            _ => None,
        }
    }
}

pub fn collaborators() -> SharedCollaborators {
    Prelude::new()
}

/// A rewriter that records what it was asked to build rather than
/// actually splicing anything into a real tree — enough for the tests to
/// assert "a conversion to Double was inserted here" without a full AST
/// mutation layer.
#[derive(Default)]
pub struct RecordingRewriter {
    pub conversions: Vec<(Idx<Expr>, Type)>,
    pub member_refs: Vec<(Idx<Expr>, DeclId)>,
    next_id: u32,
}

impl constraint_solver::collab::AstRewriter for RecordingRewriter {
    fn make_implicit_conversion(&mut self, sub: Idx<Expr>, target: &Type) -> Idx<Expr> {
        self.conversions.push((sub, target.clone()));
        self.fresh_id()
    }
    fn make_tuple_shuffle(&mut self, sub: Idx<Expr>, _permutation: &[Option<u32>]) -> Idx<Expr> {
        sub
    }
    fn make_member_ref(&mut self, base: Idx<Expr>, decl: DeclId) -> Idx<Expr> {
        self.member_refs.push((base, decl));
        self.fresh_id()
    }
    fn make_default_argument(&mut self, _param_decl: DeclId) -> Idx<Expr> {
        self.fresh_id()
    }
    fn replace_expr(&mut self, _old: Idx<Expr>, _new: Expr) -> Idx<Expr> {
        self.fresh_id()
    }
}

impl RecordingRewriter {
    /// Synthesizes a placeholder id distinguishable from any real arena
    /// slot, since this rewriter never actually owns an arena to allocate
    /// into.
    fn fresh_id(&mut self) -> Idx<Expr> {
        self.next_id += 1;
        Idx::from_raw(la_arena::RawIdx::from(u32::MAX - self.next_id))
    }
}

/// Builds `lhs + rhs` as `Apply(OverloadedDeclRef([+Int, +Double]), [lhs, rhs])`.
pub fn plus(arena: &mut Arena<Expr>, lhs: Idx<Expr>, rhs: Idx<Expr>) -> Idx<Expr> {
    let callee = arena.alloc(Expr::OverloadedDeclRef { candidates: vec![PLUS_INT, PLUS_DOUBLE] });
    arena.alloc(Expr::Apply {
        callee,
        args: vec![
            Argument { label: None, value: lhs, trailing_closure: false },
            Argument { label: None, value: rhs, trailing_closure: false },
        ],
    })
}
