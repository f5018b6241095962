//! Outcome of applying an action to an entity status.

/// Result of looking up `(current status, action)` in a transition table.
///
/// Every pair resolves to exactly one of these, so callers never leave an
/// entity in an undefined status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Move to the given status (may equal the current one, e.g. refreshing a code).
    To(S),
    /// Defined no-op: the action is accepted and nothing changes.
    Unchanged,
    /// The action is not defined for the current status.
    Rejected,
}

impl<S> Transition<S> {
    pub fn target(self) -> Option<S> {
        match self {
            Self::To(s) => Some(s),
            Self::Unchanged | Self::Rejected => None,
        }
    }
}

/// Error for a status string that matches no variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);
