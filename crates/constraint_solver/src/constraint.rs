//! The constraint sum type, overload choices, scores, and the `Solution`
//! record they all feed into. Grounded on the original Swift compiler's
//! `ConstraintSystem.h` (`Constraint`/`OverloadChoice`/`Score`) and on
//! `hir_ty::infer::InferenceResult`'s shape for `Solution` (a handful of
//! maps keyed by locator/expr, resolved at the end of a solve).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::locator::Locator;
use crate::types::{DeclId, ProtocolId, TypeVarId, Type};

/// Flags threaded through `matchTypes` controlling how strictly two types
/// must agree, grounded on the original compiler's `TypeMatchOptions`. A
/// hand-rolled bitset, matching the style
/// [`crate::types::OptionFlags`] uses rather than pulling in `bitflags`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MatchFlags(u16);

impl MatchFlags {
    pub const NONE: MatchFlags = MatchFlags(0);
    pub const GENERATE_CONSTRAINTS: MatchFlags = MatchFlags(1 << 0);
    pub const ALLOW_LABEL_MISMATCH: MatchFlags = MatchFlags(1 << 1);
    pub const IGNORE_NOESCAPE_MISMATCH: MatchFlags = MatchFlags(1 << 2);
    pub const COMPARE_CLOSURE_RESULTS: MatchFlags = MatchFlags(1 << 3);

    pub fn contains(self, flag: MatchFlags) -> bool {
        self.0 & flag.0 == flag.0
    }
}

impl std::ops::BitOr for MatchFlags {
    type Output = MatchFlags;
    fn bitor(self, rhs: MatchFlags) -> MatchFlags {
        MatchFlags(self.0 | rhs.0)
    }
}

/// The member-reference classification carried by `Member`/`ValueMember`/
/// `TypeMember` constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberRefKind {
    Value,
    Type,
    UnresolvedValue,
}

/// Named restriction a `Conversion` constraint may require to go through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Restriction {
    ArrayUpcast,
    DictionaryUpcast,
    TupleToTuple,
    SuperclassToArchetype,
    InOutPointerConversion,
    ValueToOptional,
    OptionalToOptional,
    ExistentialOpening,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BranchIndex(pub u32);

/// One alternative a `Disjunction` can resolve to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OverloadChoice {
    Decl { decl: DeclId, ref_kind: crate::ast::RefKind },
    DeclViaDynamic(DeclId),
    DeclViaBridge(DeclId),
    DeclViaUnwrappedOptional(DeclId),
    TupleIndex(u32),
    KeyPathApplication,
    BaseType(Type),
}

impl OverloadChoice {
    /// The base type of this choice, when it is a member reference — `None`
    /// for choices that aren't member-shaped.
    pub fn base_type(&self) -> Option<&Type> {
        match self {
            OverloadChoice::BaseType(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindOverload {
    pub target: TypeVarId,
    pub choice: OverloadChoice,
}

/// Every kind of typing relation or search alternative the solver works
/// with.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Bind(Type, Type),
    Equal(Type, Type),
    Subtype(Type, Type),
    Conversion(Type, Type),
    ArgumentConversion(Type, Type),
    OperatorArgumentConversion(Type, Type),
    BridgingConversion(Type, Type),
    CheckedCast(Type, Type),
    LiteralConformsTo(Type, ProtocolId),
    ConformsTo(Type, ProtocolId),
    SelfObjectOfProtocol(Type, ProtocolId),
    Member { base: Type, name: Arc<str>, result: Type, kind: MemberRefKind },
    UnresolvedMember { base: Type, name: Arc<str>, result: Type },
    Defaultable { target: Type, default: Type },
    ApplicableFunction { function: Type, call: Type },
    DynamicTypeOf(Type, Type),
    OptionalObject { optional: Type, object: Type },
    EscapableFunctionOf(Type, Type),
    OpenedExistentialOf(Type, Type),
    KeyPath { key_path: Type, root: Type, value: Type },
    KeyPathApplication { key_path: Type, root: Type, value: Type },
    BindOverload(BindOverload),
    Disjunction(Vec<Constraint>),
    Conjunction(Vec<Constraint>),
    /// A conversion already known to require a specific restriction,
    /// produced while simplifying a plain `Conversion` constraint.
    Restricted { kind: Restriction, lhs: Type, rhs: Type },
}

/// One constraint: a kind, the locator it was generated from, and whether
/// pre-solver favoring analysis marked it as the preferred branch of some
/// disjunction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub locator: Locator,
    pub favored: bool,
    pub flags: MatchFlags,
    /// Lazily set by disjunction selection (`§4.8.1`-style pre-check) when a
    /// branch's `BindOverload` target is known to fail before it is ever
    /// tried, so the solver can skip it without opening a scope.
    pub disabled: bool,
}

impl std::hash::Hash for MatchFlags {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Constraint {
    pub fn new(kind: ConstraintKind, locator: Locator) -> Constraint {
        Constraint { kind, locator, favored: false, flags: MatchFlags::NONE, disabled: false }
    }

    pub fn favored(mut self) -> Constraint {
        self.favored = true;
        self
    }

    pub fn with_flags(mut self, flags: MatchFlags) -> Constraint {
        self.flags = flags;
        self
    }

    pub fn disabled(mut self) -> Constraint {
        self.disabled = true;
        self
    }
}

/// The dimensions a [`Score`] tracks, in the lexicographic order they
/// compare: earlier entries dominate later ones. Best-first ordering (all
/// counters zero) is the common case for a solve with no recovery needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ScoreKind {
    Unavailable = 0,
    Fix,
    ForceUnchecked,
    UserConversion,
    FunctionConversion,
    NonDefaultLiteral,
    CollectionUpcastConversion,
    ValueToOptional,
    EmptyExistentialConversion,
    KeyPathSubscript,
    ValueToPointerConversion,
    InOutOptionalityConversion,
}

pub const SCORE_KIND_COUNT: usize = ScoreKind::InOutOptionalityConversion as usize + 1;

/// A fixed-length vector of counters compared lexicographically, zero
/// being best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Score {
    counters: [u32; SCORE_KIND_COUNT],
}

impl Score {
    pub fn zero() -> Score {
        Score::default()
    }

    pub fn bump(&mut self, kind: ScoreKind) {
        self.counters[kind as usize] += 1;
    }

    pub fn get(&self, kind: ScoreKind) -> u32 {
        self.counters[kind as usize]
    }

    pub fn is_zero(&self) -> bool {
        self.counters.iter().all(|c| *c == 0)
    }

    /// Lexicographic comparison; `Ordering::Less` means `self` is a better
    /// (lower) score than `other`.
    pub fn compare(&self, other: &Score) -> std::cmp::Ordering {
        self.counters.cmp(&other.counters)
    }

    /// Two scores are incomparable when neither dominates: each has at
    /// least one dimension strictly better than the other's — the
    /// condition that makes `return_all_discovered_solutions` keep both
    /// rather than pruning one.
    pub fn is_incomparable_with(&self, other: &Score) -> bool {
        let mut self_better = false;
        let mut other_better = false;
        for i in 0..SCORE_KIND_COUNT {
            if self.counters[i] < other.counters[i] {
                self_better = true;
            } else if self.counters[i] > other.counters[i] {
                other_better = true;
            }
        }
        self_better && other_better
    }

    pub fn combine(&mut self, other: &Score) {
        for i in 0..SCORE_KIND_COUNT {
            self.counters[i] += other.counters[i];
        }
    }
}

/// A recovery applied while simplifying, scoring negatively so it is only
/// chosen when no clean solution exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Fix {
    ForceOptional,
    InsertCoercion(Type),
    AddMissingArgumentLabel(Arc<str>),
    RemoveExtraArgument,
    SupplyMissingArgument,
    TreatRValueAsLValue,
    AllowTupleLabelMismatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedOverload {
    pub choice: OverloadChoice,
    pub opened_full: Type,
    pub opened_type: Type,
}

/// The full record produced on a successful solve.
#[derive(Clone, Debug, Default)]
pub struct Solution {
    pub type_bindings: FxHashMap<TypeVarId, Type>,
    pub overload_choices: FxHashMap<Locator, SelectedOverload>,
    pub conversion_restrictions: FxHashMap<(Type, Type), Restriction>,
    pub fixes: Vec<(Fix, Locator)>,
    pub disjunction_choices: FxHashMap<Locator, BranchIndex>,
    pub opened_types: FxHashMap<Locator, Vec<(u32, TypeVarId)>>,
    pub opened_existentials: FxHashMap<Locator, u32>,
    pub defaulted_constraints: rustc_hash::FxHashSet<Locator>,
    pub conformances: Vec<(Locator, u32)>,
    pub score: Score,
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
            && self.type_bindings == other.type_bindings
            && self.overload_choices == other.overload_choices
    }
}
