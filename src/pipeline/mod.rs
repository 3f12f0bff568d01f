pub mod classify;
pub mod extract;
pub mod normalize;
pub mod plan;
pub mod summarize;

/// Outcome of a remote-first operation: either the primary backend produced
/// the value, or a deterministic fallback did and the reason the primary was
/// bypassed rides along. Degraded results are still well-formed values; the
/// distinction is quality provenance, not success/failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Generated<T> {
    Primary(T),
    Degraded(T, String),
}

impl<T> Generated<T> {
    pub fn into_inner(self) -> T {
        match self {
            Generated::Primary(value) | Generated::Degraded(value, _) => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Generated::Degraded(..))
    }

    pub fn degrade_reason(&self) -> Option<&str> {
        match self {
            Generated::Degraded(_, reason) => Some(reason),
            Generated::Primary(_) => None,
        }
    }
}
