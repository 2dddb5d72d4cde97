//! Access events for audit and observability
//!
//! Sinks are optional. A failing sink is logged and never changes a decision
//! or fails a mutation; reliable delivery belongs to the sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{PermissionId, RoleId, UserId};

/// Domain event emitted by the evaluator and role administration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessEvent {
    PermissionChecked {
        user_id: UserId,
        resource: String,
        action: String,
        allowed: bool,
        cached: bool,
        occurred_at: DateTime<Utc>,
    },
    RoleCreated {
        role_id: RoleId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    RoleUpdated {
        role_id: RoleId,
        name: Option<String>,
        description: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    RoleDeleted {
        role_id: RoleId,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    PermissionsAssigned {
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
        occurred_at: DateTime<Utc>,
    },
    PermissionsRemoved {
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
        occurred_at: DateTime<Utc>,
    },
    RoleAssigned {
        user_id: UserId,
        role_id: RoleId,
        occurred_at: DateTime<Utc>,
    },
    RoleRevoked {
        user_id: UserId,
        role_id: RoleId,
        occurred_at: DateTime<Utc>,
    },
}

impl AccessEvent {
    /// Event name as serialized in the `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::PermissionChecked { .. } => "permission_checked",
            Self::RoleCreated { .. } => "role_created",
            Self::RoleUpdated { .. } => "role_updated",
            Self::RoleDeleted { .. } => "role_deleted",
            Self::PermissionsAssigned { .. } => "permissions_assigned",
            Self::PermissionsRemoved { .. } => "permissions_removed",
            Self::RoleAssigned { .. } => "role_assigned",
            Self::RoleRevoked { .. } => "role_revoked",
        }
    }
}

/// Destination for access events
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: AccessEvent) -> Result<()>;
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _event: AccessEvent) -> Result<()> {
        Ok(())
    }
}

/// Keeps events in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<RwLock<Vec<AccessEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of published events, oldest first
    pub async fn events(&self) -> Vec<AccessEvent> {
        self.events.read().await.clone()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn publish(&self, event: AccessEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}
