//! Small standalone helpers with no crate-specific knowledge, shared across
//! the constraint solver's modules the way rust-analyzer's own `stdx` crate
//! is shared across its crates.

/// Generates `From<Variant> for Enum` impls for a sum type whose variants
/// each wrap exactly one inner type, e.g.
///
/// ```ignore
/// enum ExprOrPatId { ExprId(ExprId), PatId(PatId) }
/// impl_from!(ExprId, PatId for ExprOrPatId);
/// ```
#[macro_export]
macro_rules! impl_from {
    ($($variant:ident $(($($sub_variant:ident),*))?),* for $enum:ident) => {
        $(
            impl From<$variant> for $enum {
                fn from(it: $variant) -> $enum {
                    $enum::$variant(it)
                }
            }
            $($(
                impl From<$sub_variant> for $enum {
                    fn from(it: $sub_variant) -> $enum {
                        $enum::$variant($variant::$sub_variant(it))
                    }
                }
            )*)?
        )*
    }
}

/// Asserts an invariant in debug builds (panic) while degrading to a no-op
/// `false` in release builds instead of trapping, for invariants whose
/// violation should be recoverable as a diagnostic rather than a crash in
/// front-line release binaries — constraint solver invariants are
/// internal and a violation should surface as `TooComplex`/`NoSolution`
/// rather than UB in release.
#[macro_export]
macro_rules! always {
    ($cond:expr) => {{
        let cond = $cond;
        debug_assert!(cond, "assertion failed: {}", stringify!($cond));
        cond
    }};
    ($cond:expr, $($fmt:tt)*) => {{
        let cond = $cond;
        debug_assert!(cond, $($fmt)*);
        cond
    }};
}

/// The negation of [`always!`]: asserts the condition is false.
#[macro_export]
macro_rules! never {
    ($cond:expr) => {
        $crate::always!(!$cond)
    };
    ($cond:expr, $($fmt:tt)*) => {
        $crate::always!(!$cond, $($fmt)*)
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug, PartialEq, Eq)]
    struct A(u32);
    #[derive(Debug, PartialEq, Eq)]
    struct B(u32);
    #[derive(Debug, PartialEq, Eq)]
    enum AB {
        A(A),
        B(B),
    }
    impl_from!(A, B for AB);

    #[test]
    fn impl_from_generates_conversions() {
        assert_eq!(AB::from(A(1)), AB::A(A(1)));
        assert_eq!(AB::from(B(2)), AB::B(B(2)));
    }

    #[test]
    fn always_returns_condition() {
        assert!(always!(1 + 1 == 2));
        assert!(!never!(1 + 1 == 2));
    }
}
