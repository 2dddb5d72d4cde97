//! Role administration
//!
//! Every successful mutation invalidates the affected cache entries through
//! the permission store and publishes an [`AccessEvent`].

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AuthzError, Result};
use crate::events::{AccessEvent, EventSink, NoopEventSink};
use crate::store::{Invalidation, PermissionStore, RoleBackend};
use crate::types::{PermissionId, Role};

/// Role and assignment mutations
pub struct RoleAdmin {
    roles: Arc<dyn RoleBackend>,
    store: Arc<PermissionStore>,
    events: Arc<dyn EventSink>,
}

impl RoleAdmin {
    pub fn new(store: Arc<PermissionStore>) -> Self {
        Self {
            roles: store.role_backend(),
            store,
            events: Arc::new(NoopEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Create a role with a unique name
    pub async fn create_role(&self, name: &str, description: Option<&str>, is_system: bool) -> Result<Role> {
        if name.trim().is_empty() {
            return Err(AuthzError::InvalidInput("role name must not be empty".to_string()));
        }
        if self.roles.find_role_by_name(name).await?.is_some() {
            return Err(AuthzError::Conflict(format!("role name '{}' already exists", name)));
        }

        let mut role = Role::new(name);
        role.description = description.map(str::to_string);
        role.is_system = is_system;
        let role = self.roles.save_role(role).await?;

        info!(role_id = %role.id, name = %role.name, "Role created");
        self.publish(AccessEvent::RoleCreated {
            role_id: role.id.clone(),
            name: role.name.clone(),
            occurred_at: Utc::now(),
        })
        .await;

        Ok(role)
    }

    /// Every role, ordered by name
    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.roles.list_roles().await
    }

    /// Change a role's name and/or description; system roles are read-only
    pub async fn update_role(&self, id: &str, name: Option<&str>, description: Option<&str>) -> Result<Role> {
        let mut role = self.existing_role(id).await?;
        if !role.can_modify() {
            return Err(AuthzError::SystemRole(role.name));
        }

        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(AuthzError::InvalidInput("role name must not be empty".to_string()));
            }
            role.name = name.to_string();
        }
        if let Some(description) = description {
            role.description = Some(description.to_string());
        }
        role.updated_at = Utc::now();

        let role = self.roles.save_role(role).await?;

        info!(role_id = %role.id, "Role updated");
        self.publish(AccessEvent::RoleUpdated {
            role_id: role.id.clone(),
            name: name.map(str::to_string),
            description: description.map(str::to_string),
            occurred_at: Utc::now(),
        })
        .await;

        Ok(role)
    }

    /// Delete a non-system role with its assignments
    pub async fn delete_role(&self, id: &str) -> Result<()> {
        let role = self.existing_role(id).await?;
        if !role.can_modify() {
            return Err(AuthzError::SystemRole(role.name));
        }

        // Holders must be resolved while the user→role rows still exist
        let invalidation = self.store.invalidation_for_role(id).await?;
        self.roles.delete_role(id).await?;
        self.store.invalidate(invalidation).await?;

        info!(role_id = %id, name = %role.name, "Role deleted");
        self.publish(AccessEvent::RoleDeleted {
            role_id: role.id,
            name: role.name,
            occurred_at: Utc::now(),
        })
        .await;

        Ok(())
    }

    pub async fn assign_permissions(&self, role_id: &str, permission_ids: &[PermissionId]) -> Result<()> {
        self.existing_role(role_id).await?;
        self.roles.assign_permissions(role_id, permission_ids).await?;
        self.store.invalidate(self.store.invalidation_for_role(role_id).await?).await?;

        info!(role_id, count = permission_ids.len(), "Permissions assigned");
        self.publish(AccessEvent::PermissionsAssigned {
            role_id: role_id.to_string(),
            permission_ids: permission_ids.to_vec(),
            occurred_at: Utc::now(),
        })
        .await;

        Ok(())
    }

    pub async fn remove_permissions(&self, role_id: &str, permission_ids: &[PermissionId]) -> Result<()> {
        self.existing_role(role_id).await?;
        self.roles.remove_permissions(role_id, permission_ids).await?;
        self.store.invalidate(self.store.invalidation_for_role(role_id).await?).await?;

        info!(role_id, count = permission_ids.len(), "Permissions removed");
        self.publish(AccessEvent::PermissionsRemoved {
            role_id: role_id.to_string(),
            permission_ids: permission_ids.to_vec(),
            occurred_at: Utc::now(),
        })
        .await;

        Ok(())
    }

    pub async fn assign_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        self.existing_role(role_id).await?;
        self.roles.assign_role(user_id, role_id).await?;
        self.store.invalidate(Invalidation::user(user_id)).await?;

        info!(user_id, role_id, "Role assigned");
        self.publish(AccessEvent::RoleAssigned {
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
            occurred_at: Utc::now(),
        })
        .await;

        Ok(())
    }

    pub async fn revoke_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        self.roles.revoke_role(user_id, role_id).await?;
        self.store.invalidate(Invalidation::user(user_id)).await?;

        info!(user_id, role_id, "Role revoked");
        self.publish(AccessEvent::RoleRevoked {
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
            occurred_at: Utc::now(),
        })
        .await;

        Ok(())
    }

    async fn existing_role(&self, id: &str) -> Result<Role> {
        self.roles
            .find_role(id)
            .await?
            .ok_or_else(|| AuthzError::RoleNotFound(id.to_string()))
    }

    async fn publish(&self, event: AccessEvent) {
        let name = event.name();
        if let Err(e) = self.events.publish(event).await {
            warn!(event = name, error = %e, "Failed to publish event");
        }
    }
}
