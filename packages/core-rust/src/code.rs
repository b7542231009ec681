use std::fmt::Debug;
use std::hash::Hash;

/// A domain-level error code returned by operations.
///
/// Implementors are plain enums. `ALL` enumerates every declared code so the
/// status tables can be built once at startup instead of inspecting codes on
/// each call.
pub trait DomainCode: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every code of the domain, in declaration order.
    const ALL: &'static [Self];

    /// Stable name of the code, used as the fallback status message.
    fn name(self) -> &'static str;
}

/// Per-code status declaration for one transport vocabulary `S`.
///
/// Codes returning `None` fall back to the translator's default status.
pub trait DeclaredStatus<S>: DomainCode {
    fn declared_status(self) -> Option<S>;
}
