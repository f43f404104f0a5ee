//! Error types for the tagcache library.
//!
//! The cache's operation contracts are expressed through return values
//! (`bool`, `Option`, counts), so the only error here is
//! [`InvariantError`], produced by the `check_invariants` methods that walk
//! the engine's internal structures. Each error names the structure the
//! inconsistency was found in via [`InvariantKind`], so callers (and test
//! failure output) can tell a recency-order defect from a tag-index one
//! without parsing the message.

use std::fmt;

/// Which internal structure an invariant violation was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// The primary store and the recency order disagree: a stored key
    /// without exactly one live node, or a node holding an unstored key.
    RecencyOrder,
    /// The tag index and entry tag sets disagree, or an empty bucket
    /// survived its last key.
    TagIndex,
    /// The configured entry bound was breached at rest.
    Capacity,
}

impl InvariantKind {
    fn as_str(self) -> &'static str {
        match self {
            InvariantKind::RecencyOrder => "recency order",
            InvariantKind::TagIndex => "tag index",
            InvariantKind::Capacity => "capacity",
        }
    }
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when internal cache invariants are violated.
///
/// Pairs the [`InvariantKind`] of the failing structure with a description
/// of the specific inconsistency, e.g. which key's entry points at a dead
/// recency node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError {
    kind: InvariantKind,
    detail: String,
}

impl InvariantError {
    /// Creates an error for a violation found in `kind`.
    #[inline]
    pub fn new(kind: InvariantKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Returns the structure the violation was detected in.
    #[inline]
    pub fn kind(&self) -> InvariantKind {
        self.kind
    }

    /// Returns the description of the specific inconsistency.
    #[inline]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invariant violated: {}", self.kind, self.detail)
    }
}

impl std::error::Error for InvariantError {}
