//! The minimal input-AST shape the core consumes. Lexing, parsing, and
//! full AST construction happen upstream; this module only defines the
//! sum type the constraint generator walks and the handful of
//! request/annotation wrappers the collaborator layer hands the core.
//!
//! `ExprId` is `la_arena::Idx<Expr>` exactly the way `hir_def::expr::ExprId`
//! is `Idx<Expr>` — expressions live in a caller-owned arena, and the core
//! only ever carries indices into it.

use std::sync::Arc;

use la_arena::{Arena, Idx};

use crate::types::{DeclId, Type};

pub type ExprId = Idx<Expr>;

/// How a declaration or member is being referenced, which determines how
/// many layers of argument labels get stripped from its type before it
/// participates in constraint generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Referenced without being called at all, e.g. passed as a value.
    Unapplied,
    /// Called once, e.g. an instance method referenced through its
    /// instance: labels of the first apply are stripped.
    SingleApply,
    /// Called through both an implicit `Self` apply and the user-visible
    /// apply, e.g. `Type.method(self)(args)`: no labels are stripped.
    DoubleApply,
    /// Referenced by its full compound name, e.g. `foo(bar:baz:)`: all
    /// label levels are stripped since the name already encodes them.
    Compound,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Argument {
    pub label: Option<Arc<str>>,
    pub value: ExprId,
    pub trailing_closure: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClosureParam {
    pub name: Arc<str>,
    pub annotation: Option<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClosureBody {
    /// A closure whose body is a single expression, eligible to
    /// participate directly in the enclosing contextual type.
    SingleExpression(ExprId),
    /// A multi-statement body; `has_return` records whether any `return`
    /// was seen, which controls whether `Defaultable(result, Void)` fires.
    Multi { has_return: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Closure {
    pub params: Vec<ClosureParam>,
    pub explicit_result: Option<Type>,
    pub body: ClosureBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyPathComponent {
    Property { name: Arc<str> },
    Subscript { args: Vec<Argument> },
    OptionalChain,
    OptionalForce,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyPathExpr {
    pub root: Option<Type>,
    pub components: Vec<KeyPathComponent>,
}

/// One node of the input expression tree, as seen by the generator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    InterpolatedString(Vec<ExprId>),
    BooleanLiteral,
    DeclRef { decl: DeclId, ref_kind: RefKind, is_iuo: bool },
    OverloadedDeclRef { candidates: Vec<DeclId> },
    MemberRef { base: ExprId, name: Arc<str>, ref_kind: RefKind },
    UnresolvedMember { name: Arc<str>, args: Option<Vec<Argument>> },
    Subscript { base: ExprId, args: Vec<Argument> },
    Apply { callee: ExprId, args: Vec<Argument> },
    Paren(ExprId),
    Tuple(Vec<(Option<Arc<str>>, ExprId)>),
    ArrayLiteral(Vec<ExprId>),
    DictionaryLiteral(Vec<(ExprId, ExprId)>),
    If { cond: ExprId, then_branch: ExprId, else_branch: ExprId },
    Coerce { sub: ExprId, target: Type },
    ForcedCast { sub: ExprId, target: Type },
    ConditionalCast { sub: ExprId, target: Type },
    Is { sub: ExprId, target: Type },
    Assign { lhs: ExprId, rhs: ExprId },
    BindOptional(ExprId),
    ForceValue(ExprId),
    OptionalEvaluation(ExprId),
    Closure(Closure),
    KeyPath(KeyPathExpr),
    InOut(ExprId),
}

/// The contextual purpose an expression is being checked for: affects
/// which default-literal types and fix preferences apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextualPurpose {
    General,
    AssignmentTarget,
    ReturnValue,
    EnumRawValue,
    ParameterDefault,
}

/// One request to check an expression, as handed down from the
/// parser/declaration checker.
pub struct CheckRequest<'a> {
    pub arena: &'a Arena<Expr>,
    pub root: ExprId,
    pub enclosing_context: DeclId,
    pub contextual_type: Option<Type>,
    pub purpose: ContextualPurpose,
}
