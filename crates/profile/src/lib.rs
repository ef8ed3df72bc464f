//! Bare-bones profiling: a guard that logs how long the span it wraps took,
//! at `trace!` level, on drop. Callers write:
//!
//! ```ignore
//! let _p = profile::span("solve");
//! ```
//!
//! the same way `hir_ty::infer::infer_query` wraps itself with
//! `profile::span("infer_query")`. This intentionally does not aggregate or
//! export metrics anywhere; it is a debugging aid for
//! `debug_constraint_solver` traces, not an observability backend.

use std::time::Instant;

pub struct Span {
    label: &'static str,
    start: Instant,
}

#[must_use]
pub fn span(label: &'static str) -> Span {
    Span { label, start: Instant::now() }
}

impl Drop for Span {
    fn drop(&mut self) {
        log::trace!("{} finished in {:?}", self.label, self.start.elapsed());
    }
}
