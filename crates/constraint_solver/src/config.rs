//! Configuration flags, collected into one plain struct with
//! a `Default` impl the way `rust-analyzer/src/config.rs` collects its
//! flags — no serde dependency, since (de)serializing this is the
//! embedding driver's concern, not the core's.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipFunctionBodies {
    None,
    Inlinable,
    All,
}

impl Default for SkipFunctionBodies {
    fn default() -> Self {
        SkipFunctionBodies::None
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Permit recovery fixes that score negatively.
    pub allow_fixes: bool,
    /// Fix-it preference: prefer inserting `!` over wrapping in `Optional`.
    pub prefer_force_unwrap_to_optional: bool,
    /// Disable winner-only pruning; return every discovered solution.
    pub return_all_discovered_solutions: bool,
    pub skip_function_bodies: SkipFunctionBodies,
    pub solver_scope_threshold: usize,
    pub solver_memory_threshold: usize,
    pub expression_timeout_ms: u64,
    /// Verbose trace to the debug stream; when set, the
    /// solver emits `profile::span` and `log::trace!` chatter at every
    /// scope open/close and binding decision.
    pub debug_constraint_solver: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            allow_fixes: false,
            prefer_force_unwrap_to_optional: false,
            return_all_discovered_solutions: false,
            skip_function_bodies: SkipFunctionBodies::default(),
            solver_scope_threshold: 10_000,
            solver_memory_threshold: 1 << 20,
            expression_timeout_ms: 5_000,
            debug_constraint_solver: false,
        }
    }
}

impl SolverConfig {
    /// The configuration the driver reruns with after a `NoSolution`: a
    /// secondary solve pass with `allow_fixes = true` and a higher budget.
    pub fn for_failure_diagnosis(&self) -> SolverConfig {
        SolverConfig {
            allow_fixes: true,
            solver_scope_threshold: self.solver_scope_threshold.saturating_mul(4),
            solver_memory_threshold: self.solver_memory_threshold.saturating_mul(4),
            expression_timeout_ms: self.expression_timeout_ms.saturating_mul(4),
            ..self.clone()
        }
    }
}
