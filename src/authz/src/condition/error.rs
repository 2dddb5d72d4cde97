//! Error types for condition parsing

use thiserror::Error;

/// Structural problems found in a condition specification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("ambiguous condition node: {0}")]
    AmbiguousNode(String),

    #[error("invalid condition shape: {0}")]
    InvalidShape(String),

    #[error("unknown condition operator: {0}")]
    UnknownOperator(String),

    #[error("'not' expects a single condition object")]
    InvalidNot,
}

/// Result type for condition operations
pub type Result<T> = std::result::Result<T, ConditionError>;
