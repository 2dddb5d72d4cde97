//! Error types for the authorization engine

use thiserror::Error;

use crate::condition::ConditionError;

/// Authorization engine errors
///
/// A denied check is not an error: `has_permission` returns `Ok(false)`.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Permission not found
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    /// Role not found
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// System roles cannot be renamed or deleted
    #[error("System role cannot be modified or deleted: {0}")]
    SystemRole(String),

    /// Uniqueness constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Condition tree rejected on write
    #[error("Invalid condition: {0}")]
    InvalidCondition(#[from] ConditionError),

    /// Durable store unreachable or failing
    #[error("Store error: {0}")]
    Store(String),

    /// Cache unreachable or failing
    #[error("Cache error: {0}")]
    Cache(String),

    /// Cached payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthzError {
    /// Referenced role or permission is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PermissionNotFound(_) | Self::RoleNotFound(_))
    }

    /// Store or cache failure; the decision could not be determined
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Cache(_) | Self::Serialization(_))
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
