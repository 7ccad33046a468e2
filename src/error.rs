use thiserror::Error;

/// Errors reported by tree operations. A failed call leaves the tree in its
/// pre-call state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("key not found in tree")]
    KeyMissing,
    #[error("index {index} out of range for tree of size {len}")]
    IndexOutOfRange { index: isize, len: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("tree invariant violated: {0}")]
    InvariantViolated(String),
    #[error("internal tree corruption: {0}")]
    Corruption(&'static str),
}

pub type TreeResult<T> = Result<T, TreeError>;
