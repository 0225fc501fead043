//! DOM operation errors

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// A node or reference child is not where the caller says it is
    #[error("Node not found")]
    NotFound,

    /// Inserting would create a cycle or put a node under a parent that
    /// cannot hold it
    #[error("Hierarchy request error")]
    HierarchyRequest,

    /// Operation not valid in the object's current state
    #[error("Invalid state")]
    InvalidState,

    /// Unknown factory name or unsupported operation
    #[error("Not supported: {0}")]
    NotSupported(String),
}
