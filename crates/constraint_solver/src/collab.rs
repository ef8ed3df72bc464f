//! Collaborator interfaces: the core calls into these but
//! never implements them — name lookup, conformance checking,
//! substitution, default literal types, and AST rewriting primitives all
//! live in the declaration checker / driver. Mirrors the way `hir_ty`
//! depends on `db: &dyn HirDatabase`, a trait object boundary to a
//! database it never implements itself.

use std::sync::Arc;

use crate::ast::{Expr, ExprId};
use crate::types::{AssocId, DeclId, ProtocolId, Type};

/// Visibility/applicability classification for one name-lookup result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applicability {
    Viable,
    UnviableInaccessible,
    UnviableWrongStaticness,
    UnviableUnavailable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberCandidate {
    pub decl: DeclId,
    pub ty: Type,
    pub applicability: Applicability,
    /// Whether this candidate is declared implicitly-unwrapped-optional:
    /// a flag on the candidate, not a distinct `Type` variant.
    pub is_iuo: bool,
}

/// Given a base type and a name, return every member declaration the
/// collaborator's semantic model knows about, classified by applicability.
pub trait NameLookup {
    fn lookup_member(&self, base: &Type, name: &str) -> Vec<MemberCandidate>;

    /// Resolves an unqualified/overloaded reference to its candidate set,
    /// used by `OverloadedDeclRef` generation.
    fn lookup_overloads(&self, decls: &[DeclId]) -> Vec<MemberCandidate>;

    /// Resolves initializers applicable to constructing `ty`, used while
    /// simplifying a construction constraint.
    fn lookup_initializers(&self, ty: &Type) -> Vec<MemberCandidate>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConformanceFlags {
    pub track_dependency: bool,
    pub skip_conditional_requirements: bool,
}

/// Opaque proof a type satisfies a protocol, treated here as an opaque
/// token the core never inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConformanceRef(pub u32);

/// Given a type and a protocol, return a conformance reference or none.
pub trait ConformanceChecker {
    fn check_conformance(
        &self,
        ty: &Type,
        protocol: ProtocolId,
        flags: ConformanceFlags,
    ) -> Option<ConformanceRef>;

    /// Looks up the concrete witness for an associated-type requirement
    /// once a conformance is known, used by [`crate::types::simplify`]'s
    /// `FixedLookup::associated_type_witness`.
    fn associated_type_witness(&self, ty: &Type, protocol: ProtocolId, assoc: AssocId) -> Option<Type>;

    /// Self-conformance: whether an existential of `protocol` itself
    /// satisfies `protocol`, as required by `SelfObjectOfProtocol`.
    fn allows_self_conformance(&self, protocol: ProtocolId) -> bool;
}

/// A generic signature's requirements, opaque beyond what generic opening
/// needs to restate as constraints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Conforms(Type, ProtocolId),
    Superclass(Type, Type),
    SameType(Type, Type),
    Layout(Type),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericSignature {
    pub params: Vec<DeclId>,
    pub requirements: Vec<Requirement>,
}

/// Given a generic signature and a substitution map, substitute a type or
/// requirement.
pub trait Substitution {
    fn substitute_type(&self, ty: &Type, map: &[(DeclId, Type)]) -> Type;
    fn substitute_requirement(&self, req: &Requirement, map: &[(DeclId, Type)]) -> Requirement;

    /// The interface type and generic signature of a declaration, needed
    /// before it can be opened.
    fn interface_type(&self, decl: DeclId) -> Type;
    fn generic_signature(&self, decl: DeclId) -> Option<GenericSignature>;
}

/// For each known literal protocol, the default type applicable in the
/// current declaration context.
pub trait DefaultLiteralTypes {
    fn default_type_for(&self, protocol: ProtocolId) -> Option<Type>;
}

/// AST rewriting primitives: construct implicit-conversion, tuple-shuffle,
/// and member-ref expressions during solution application. The core
/// never materializes syntax itself; it asks the
/// collaborator to and gets back an opaque `ExprId` it can wire back into
/// the tree it is walking.
pub trait AstRewriter {
    fn make_implicit_conversion(&mut self, sub: ExprId, target: &Type) -> ExprId;
    fn make_tuple_shuffle(&mut self, sub: ExprId, permutation: &[Option<u32>]) -> ExprId;
    fn make_member_ref(&mut self, base: ExprId, decl: DeclId) -> ExprId;
    fn make_default_argument(&mut self, param_decl: DeclId) -> ExprId;
    fn replace_expr(&mut self, old: ExprId, new: Expr) -> ExprId;
}

/// Bundles every collaborator interface the generator/simplifier/applier
/// need, so call sites take one trait object instead of five.
pub trait Collaborators:
    NameLookup + ConformanceChecker + Substitution + DefaultLiteralTypes
{
}

impl<T> Collaborators for T where T: NameLookup + ConformanceChecker + Substitution + DefaultLiteralTypes {}

pub type SharedCollaborators = Arc<dyn Collaborators>;
