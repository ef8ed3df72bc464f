//! The type universe: the language's types, immutable and
//! cheaply cloned (`Arc`-backed where a variant carries a collection), with
//! the handful of utility operations the rest of the core needs
//! (`simplify`, `has_type_variable`, label stripping, covariant-result
//! substitution, optional unwrapping).
//!
//! Modeled on `chalk_ir::TyKind`/`hir_ty::Ty` (see `infer.rs`'s `TyKind`
//! matches): a flat sum type over `Arc`-shared interior data rather than a
//! deeply `Box`-nested tree, so cloning a `Type` is cheap and structural
//! equality stays derivable.

use std::sync::Arc;

use crate::locator::Locator;

/// Opaque identifier for a declaration in the collaborator layer. The
/// core never interprets this beyond equality/hash; declaration shape is
/// looked up through [`crate::collab::NameLookup`] /
/// [`crate::collab::ConformanceChecker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// Opaque identifier for a protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(pub u32);

/// Opaque identifier for an associated-type requirement, as referenced by
/// `DependentMember`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssocId(pub u32);

/// Identifier for a type variable, minted by the generator or by generic
/// opening. Indexes into the constraint system's `TypeVariableTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

/// Per-variable option flags, a
/// hand-rolled bitset over `u8` in the style `hir_ty` itself favors for
/// small flag sets (e.g. its own `BindingMode`/`Mutability` bit tests)
/// rather than pulling in the `bitflags` crate for three bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OptionFlags(u8);

impl OptionFlags {
    pub const CAN_BIND_LVALUE: OptionFlags = OptionFlags(1 << 0);
    pub const CAN_BIND_INOUT: OptionFlags = OptionFlags(1 << 1);
    pub const PREFERS_SUBTYPE: OptionFlags = OptionFlags(1 << 2);
    pub const NONE: OptionFlags = OptionFlags(0);

    pub fn contains(self, flag: OptionFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn insert(self, flag: OptionFlags) -> Self {
        OptionFlags(self.0 | flag.0)
    }
}

impl std::ops::BitOr for OptionFlags {
    type Output = OptionFlags;
    fn bitor(self, rhs: OptionFlags) -> OptionFlags {
        OptionFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for OptionFlags {
    type Output = OptionFlags;
    fn bitand(self, rhs: OptionFlags) -> OptionFlags {
        OptionFlags(self.0 & rhs.0)
    }
}

impl std::ops::Not for OptionFlags {
    type Output = OptionFlags;
    fn not(self) -> OptionFlags {
        OptionFlags(!self.0)
    }
}

impl OptionFlags {
    /// A variable is materializable iff neither LVALUE nor INOUT is set.
    pub fn is_materializable(self) -> bool {
        !self.contains(OptionFlags::CAN_BIND_LVALUE) && !self.contains(OptionFlags::CAN_BIND_INOUT)
    }

    /// Unifying with a materializable class clears both storage bits.
    pub fn clear_storage_bits(self) -> Self {
        self & !(OptionFlags::CAN_BIND_LVALUE | OptionFlags::CAN_BIND_INOUT)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TupleElement {
    pub name: Option<Arc<str>>,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    pub label: Option<Arc<str>>,
    pub ty: Type,
    pub has_default: bool,
    pub variadic: bool,
    pub autoclosure: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Effects {
    pub throws: bool,
    pub is_async: bool,
    pub noescape: bool,
}

/// Sum type over all representable types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    TypeVariable(TypeVarId),
    Nominal { decl: DeclId, parent: Option<Arc<Type>>, generic_args: Arc<[Type]> },
    Tuple(Arc<[TupleElement]>),
    Function { params: Arc<[Param]>, result: Arc<Type>, effects: Effects },
    Metatype(Arc<Type>),
    Optional(Arc<Type>),
    LValue(Arc<Type>),
    InOut(Arc<Type>),
    /// An existential type: `any P1 & P2 & ...`.
    Existential(Arc<[ProtocolId]>),
    DependentMember { base: Arc<Type>, assoc: AssocId },
    /// A generic declaration referenced without arguments yet.
    Unbound(DeclId),
    Error,
}

impl Type {
    pub fn type_variable(id: TypeVarId) -> Type {
        Type::TypeVariable(id)
    }

    pub fn optional(inner: Type) -> Type {
        Type::Optional(Arc::new(inner))
    }

    pub fn function(params: Vec<Param>, result: Type, effects: Effects) -> Type {
        Type::Function { params: params.into(), result: Arc::new(result), effects }
    }

    pub fn tuple(elements: Vec<TupleElement>) -> Type {
        Type::Tuple(elements.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn as_type_variable(&self) -> Option<TypeVarId> {
        match self {
            Type::TypeVariable(id) => Some(*id),
            _ => None,
        }
    }

    /// Cheap lazy scan: does this type embed any type variable at all.
    pub fn has_type_variable(&self) -> bool {
        match self {
            Type::TypeVariable(_) => true,
            Type::Nominal { parent, generic_args, .. } => {
                parent.as_deref().map_or(false, Type::has_type_variable)
                    || generic_args.iter().any(Type::has_type_variable)
            }
            Type::Tuple(elems) => elems.iter().any(|e| e.ty.has_type_variable()),
            Type::Function { params, result, .. } => {
                params.iter().any(|p| p.ty.has_type_variable()) || result.has_type_variable()
            }
            Type::Metatype(t) | Type::Optional(t) | Type::LValue(t) | Type::InOut(t) => {
                t.has_type_variable()
            }
            Type::Existential(_) | Type::Unbound(_) | Type::Error => false,
            Type::DependentMember { base, .. } => base.has_type_variable(),
        }
    }

    /// Does this type mention the specific variable `var` anywhere in its
    /// structure. Used by occurs-checks before a
    /// variable is bound to a type built from other still-unresolved
    /// variables.
    pub fn mentions(&self, var: TypeVarId) -> bool {
        match self {
            Type::TypeVariable(id) => *id == var,
            Type::Nominal { parent, generic_args, .. } => {
                parent.as_deref().map_or(false, |t| t.mentions(var))
                    || generic_args.iter().any(|t| t.mentions(var))
            }
            Type::Tuple(elems) => elems.iter().any(|e| e.ty.mentions(var)),
            Type::Function { params, result, .. } => {
                params.iter().any(|p| p.ty.mentions(var)) || result.mentions(var)
            }
            Type::Metatype(t) | Type::Optional(t) | Type::LValue(t) | Type::InOut(t) => {
                t.mentions(var)
            }
            Type::Existential(_) | Type::Unbound(_) | Type::Error => false,
            Type::DependentMember { base, .. } => base.mentions(var),
        }
    }

    /// Unwraps one `Optional` layer.
    pub fn get_optional_object(&self) -> Option<&Type> {
        match self {
            Type::Optional(inner) => Some(inner),
            _ => None,
        }
    }

    /// Strips the outer `n` parameter-label layers of a (possibly curried)
    /// function type, used when a
    /// declaration is referenced unapplied or in compound-name form — the
    /// labels only matter when the call is actually being applied.
    pub fn remove_argument_labels(&self, n: usize) -> Type {
        fn strip_one(ty: &Type) -> Type {
            match ty {
                Type::Function { params, result, effects } => Type::Function {
                    params: params
                        .iter()
                        .map(|p| Param { label: None, ..p.clone() })
                        .collect::<Vec<_>>()
                        .into(),
                    result: result.clone(),
                    effects: *effects,
                },
                other => other.clone(),
            }
        }
        let mut cur = self.clone();
        for _ in 0..n {
            cur = strip_one(&cur);
        }
        cur
    }

    pub fn is_materializable_shape(&self) -> bool {
        !matches!(self, Type::LValue(_) | Type::InOut(_))
    }
}

/// Controls how many nested covariant-result positions
/// [`replace_covariant_result`] substitutes through: constructors replace
/// every level of a curried arrow type, methods replace only the
/// outermost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplaceLevels {
    One,
    All,
}

/// Replaces the final, non-function result type of a (possibly curried)
/// function type with `new_result`, used for class methods/constructors
/// returning `DynamicSelf`.
pub fn replace_covariant_result(ty: &Type, new_result: &Type, levels: ReplaceLevels) -> Type {
    match ty {
        Type::Function { params, result, effects } => {
            let inner_is_function = matches!(&**result, Type::Function { .. });
            let replaced_result = if inner_is_function && levels == ReplaceLevels::All {
                replace_covariant_result(result, new_result, levels)
            } else {
                new_result.clone()
            };
            Type::Function { params: params.clone(), result: Arc::new(replaced_result), effects: *effects }
        }
        _ => new_result.clone(),
    }
}

/// A function supplying the fixed binding for a type variable's
/// representative, if any, consulted by [`simplify`] while rewriting a
/// type to its fixed-point form.
pub trait FixedLookup {
    fn fixed_binding(&self, var: TypeVarId) -> Option<Type>;
    /// Looks up the witness for an associated type once the
    /// `DependentMember`'s base has simplified to a concrete type, through
    /// the collaborator conformance machinery. `None` if the
    /// conformance can't (yet) be resolved, in which case the
    /// `DependentMember` is left in place.
    fn associated_type_witness(&self, base: &Type, assoc: AssocId) -> Option<Type>;
}

/// Rewrites any embedded type variable by its representative's fixed
/// binding, recursively. If a dependent-member
/// type's base simplifies to a concrete type, the associated-type witness
/// is looked up to materialize a concrete type.
pub fn simplify(ty: &Type, lookup: &dyn FixedLookup) -> Type {
    match ty {
        Type::TypeVariable(id) => match lookup.fixed_binding(*id) {
            Some(bound) => simplify(&bound, lookup),
            None => ty.clone(),
        },
        Type::Nominal { decl, parent, generic_args } => Type::Nominal {
            decl: *decl,
            parent: parent.as_deref().map(|t| Arc::new(simplify(t, lookup))),
            generic_args: generic_args.iter().map(|t| simplify(t, lookup)).collect::<Vec<_>>().into(),
        },
        Type::Tuple(elems) => Type::Tuple(
            elems
                .iter()
                .map(|e| TupleElement { name: e.name.clone(), ty: simplify(&e.ty, lookup) })
                .collect::<Vec<_>>()
                .into(),
        ),
        Type::Function { params, result, effects } => Type::Function {
            params: params
                .iter()
                .map(|p| Param { ty: simplify(&p.ty, lookup), ..p.clone() })
                .collect::<Vec<_>>()
                .into(),
            result: Arc::new(simplify(result, lookup)),
            effects: *effects,
        },
        Type::Metatype(t) => Type::Metatype(Arc::new(simplify(t, lookup))),
        Type::Optional(t) => Type::Optional(Arc::new(simplify(t, lookup))),
        Type::LValue(t) => Type::LValue(Arc::new(simplify(t, lookup))),
        Type::InOut(t) => Type::InOut(Arc::new(simplify(t, lookup))),
        Type::Existential(_) | Type::Unbound(_) | Type::Error => ty.clone(),
        Type::DependentMember { base, assoc } => {
            let base = simplify(base, lookup);
            match lookup.associated_type_witness(&base, *assoc) {
                Some(witness) => simplify(&witness, lookup),
                None => Type::DependentMember { base: Arc::new(base), assoc: *assoc },
            }
        }
    }
}

/// A locator-carrying type variable creation record, used by
/// [`crate::graph::ConstraintGraph`] nodes to remember what created a
/// variable (for diagnostics) without the type universe itself depending
/// on the graph.
#[derive(Clone, Debug)]
pub struct TypeVarOrigin {
    pub locator: Locator,
    pub options: OptionFlags,
}
