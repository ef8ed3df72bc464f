//! Error handling: plain enums propagated as `Result`, not
//! exceptions — mirrors `hir_ty::infer::TypeError`/`InferenceDiagnostic`
//! rather than reaching for `thiserror`/`anyhow`, since the surface here
//! is already a small closed set of structured records, not an open set of
//! error sources to wrap.

use crate::ast::ExprId;
use crate::constraint::Score;
use crate::locator::Locator;
use crate::types::Type;

/// One diagnostic payload kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    TooComplex,
    Ambiguous,
    NoOverload,
    TypeMismatch { expected: Type, actual: Type },
    MissingMember { name: String },
    CannotConvert { from: Type, to: Type },
}

/// A structured diagnostic record: an anchor, a kind, and
/// the locator(s) involved. Rendering to text happens outside the core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub anchor: ExprId,
    pub kind: DiagnosticKind,
    pub locators: Vec<Locator>,
}

/// The top-level error a solve attempt can fail with.
#[derive(Clone, Debug)]
pub enum SolveError {
    /// The generator aborted because the input AST was malformed for a
    /// shape the core requires already-normalized.
    GenerationFailure { reason: &'static str, at: ExprId },
    /// Search completed without any solution.
    NoSolution { diagnostics: Vec<Diagnostic> },
    /// Multiple surviving solutions with equal score; carries the
    /// disjunction locators whose choices differed.
    AmbiguousSolutions { differing_locators: Vec<Locator>, tied_scores: Vec<Score> },
    /// Budget exceeded (scope count, memory, or wall time).
    TooComplex { reason: TooComplexReason },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TooComplexReason {
    ScopeCountExceeded,
    MemoryExceeded,
    ExponentialBlowupDetected,
    TimedOut,
}

pub type SolveResult<T> = Result<T, SolveError>;

impl SolveError {
    /// Whether the driver should retry with `allow_fixes = true` and a
    /// higher budget.
    pub fn should_retry_with_fixes(&self) -> bool {
        matches!(self, SolveError::NoSolution { .. })
    }
}
