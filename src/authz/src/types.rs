//! Core authorization types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::condition::Condition;

/// Unique user identifier
pub type UserId = String;

/// Unique role identifier
pub type RoleId = String;

/// Unique permission identifier
pub type PermissionId = String;

/// Caller-supplied attributes used to resolve conditional grants
pub type Context = HashMap<String, serde_json::Value>;

/// Permission on a `(resource, action)` pair, optionally guarded by a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission identifier
    pub id: PermissionId,

    /// Protected capability namespace (e.g., "order")
    pub resource: String,

    /// Action on the resource (e.g., "update")
    pub action: String,

    /// Optional condition tree, parsed once when the permission is loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Condition>,

    /// Informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// Create an unconditional permission with a fresh id
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resource: resource.into(),
            action: action.into(),
            conditions: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    /// Use a fixed id instead of a generated one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a condition tree
    pub fn with_conditions(mut self, conditions: Condition) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check if this permission covers the `(resource, action)` pair
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }

    /// True when the permission carries a non-empty condition
    pub fn has_conditions(&self) -> bool {
        self.conditions
            .as_ref()
            .map_or(false, |c| !c.is_unconditional())
    }
}

/// Named group of permissions assigned to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role identifier
    pub id: RoleId,

    /// Unique role name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// System roles cannot be deleted or renamed
    #[serde(default)]
    pub is_system: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Create a non-system role with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            is_system: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Use a fixed id instead of a generated one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as a system role
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Whether the role may be deleted or renamed
    pub fn can_modify(&self) -> bool {
        !self.is_system
    }
}
