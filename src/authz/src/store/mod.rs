//! Cached permission store
//!
//! Every read goes cache first, then the durable backend, populating the
//! cache on a miss. Writes invalidate according to the configured
//! [`InvalidationStrategy`]:
//!
//! - `PerKey`: the written permission's id and `(resource, action)` keys, the
//!   permission lists of every role holding it, and the permission lists and
//!   cached decisions of every user holding one of those roles.
//! - `ClearAll`: the whole cache.

pub mod backend;
pub mod memory;

pub use backend::{PermissionBackend, RoleBackend};
pub use memory::InMemoryBackend;

use futures::future::try_join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{keys, CacheBackend};
use crate::config::{InvalidationStrategy, StoreConfig};
use crate::error::{AuthzError, Result};
use crate::types::{Permission, RoleId, UserId};

/// Cache entries touched by a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// `(id, resource, action)` of written permissions
    pub permissions: Vec<(String, String, String)>,

    /// Roles whose permission lists changed
    pub roles: Vec<RoleId>,

    /// Users whose reachable permissions may have changed
    pub users: Vec<UserId>,
}

impl Invalidation {
    /// Invalidate one user's permission list and decisions
    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self {
            users: vec![user_id.into()],
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.roles.is_empty() && self.users.is_empty()
    }
}

/// Permission store with read-through caching
pub struct PermissionStore {
    permissions: Arc<dyn PermissionBackend>,
    roles: Arc<dyn RoleBackend>,
    cache: Arc<dyn CacheBackend>,
    config: StoreConfig,
}

impl PermissionStore {
    /// Create a store over durable backends and a shared cache
    pub fn new(
        permissions: Arc<dyn PermissionBackend>,
        roles: Arc<dyn RoleBackend>,
        cache: Arc<dyn CacheBackend>,
        config: StoreConfig,
    ) -> Self {
        Self {
            permissions,
            roles,
            cache,
            config,
        }
    }

    /// Cache shared with the evaluator
    pub fn cache(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&self.cache)
    }

    /// Role backend used to resolve affected users
    pub fn role_backend(&self) -> Arc<dyn RoleBackend> {
        Arc::clone(&self.roles)
    }

    /// Every permission reachable through the user's roles, de-duplicated by id
    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<Permission>> {
        let key = keys::user_permissions(user_id);
        if let Some(cached) = self.cache.get_as::<Vec<Permission>>(&key).await? {
            debug!(user_id, "User permissions cache hit");
            return Ok(cached);
        }

        let mut seen = BTreeSet::new();
        let permissions: Vec<Permission> = self
            .permissions
            .find_by_user(user_id)
            .await?
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();

        permissions.iter().for_each(Self::check_conditions);
        self.cache.set_as(&key, &permissions, self.config.user_ttl).await?;
        Ok(permissions)
    }

    /// Permissions assigned to a role
    pub async fn find_by_role(&self, role_id: &str) -> Result<Vec<Permission>> {
        let key = keys::role_permissions(role_id);
        if let Some(cached) = self.cache.get_as::<Vec<Permission>>(&key).await? {
            debug!(role_id, "Role permissions cache hit");
            return Ok(cached);
        }

        let permissions = self.permissions.find_by_role(role_id).await?;
        permissions.iter().for_each(Self::check_conditions);
        self.cache.set_as(&key, &permissions, self.config.role_ttl).await?;
        Ok(permissions)
    }

    /// Permission for a `(resource, action)` pair
    pub async fn find_by_resource_and_action(&self, resource: &str, action: &str) -> Result<Option<Permission>> {
        let key = keys::permission_by_pair(resource, action);
        if let Some(cached) = self.cache.get_as::<Permission>(&key).await? {
            return Ok(Some(cached));
        }

        let found = self.permissions.find_by_resource_and_action(resource, action).await?;
        if let Some(permission) = &found {
            Self::check_conditions(permission);
            self.cache.set_as(&key, permission, self.config.permission_ttl).await?;
        }
        Ok(found)
    }

    /// Permission by id
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Permission>> {
        let key = keys::permission(id);
        if let Some(cached) = self.cache.get_as::<Permission>(&key).await? {
            return Ok(Some(cached));
        }

        let found = self.permissions.find_by_id(id).await?;
        if let Some(permission) = &found {
            Self::check_conditions(permission);
            self.cache.set_as(&key, permission, self.config.permission_ttl).await?;
        }
        Ok(found)
    }

    /// Create or update a permission
    ///
    /// Only `conditions` and `description` may change on an existing
    /// permission. Conditions are validated; malformed trees and unknown
    /// operators are rejected.
    pub async fn save(&self, permission: Permission) -> Result<Permission> {
        if permission.resource.is_empty() || permission.action.is_empty() {
            return Err(AuthzError::InvalidInput(
                "permission resource and action must not be empty".to_string(),
            ));
        }
        if let Some(conditions) = &permission.conditions {
            conditions.validate()?;
        }

        if let Some(existing) = self.permissions.find_by_id(&permission.id).await? {
            if !existing.matches(&permission.resource, &permission.action) {
                return Err(AuthzError::InvalidInput(format!(
                    "permission {} cannot move from {}:{} to {}:{}",
                    permission.id, existing.resource, existing.action, permission.resource, permission.action
                )));
            }
        }

        let saved = self.permissions.save(permission).await?;
        let invalidation = self.invalidation_for_permission(&saved).await?;
        self.invalidate(invalidation).await?;

        info!(
            permission_id = %saved.id,
            resource = %saved.resource,
            action = %saved.action,
            "Permission saved"
        );
        Ok(saved)
    }

    /// Delete a permission and its role assignments
    pub async fn delete(&self, id: &str) -> Result<()> {
        let Some(existing) = self.permissions.find_by_id(id).await? else {
            return Err(AuthzError::PermissionNotFound(id.to_string()));
        };

        // Affected users must be resolved before the join rows go away
        let invalidation = self.invalidation_for_permission(&existing).await?;
        self.permissions.delete(id).await?;
        self.invalidate(invalidation).await?;

        info!(permission_id = %id, "Permission deleted");
        Ok(())
    }

    /// Entries affected by a change to `permission`
    pub async fn invalidation_for_permission(&self, permission: &Permission) -> Result<Invalidation> {
        let roles = self.permissions.roles_with_permission(&permission.id).await?;
        let users = self.users_of_roles(&roles).await?;

        Ok(Invalidation {
            permissions: vec![(
                permission.id.clone(),
                permission.resource.clone(),
                permission.action.clone(),
            )],
            roles,
            users,
        })
    }

    /// Entries affected by a change to a role's permissions or existence
    pub async fn invalidation_for_role(&self, role_id: &str) -> Result<Invalidation> {
        let roles = vec![role_id.to_string()];
        let users = self.users_of_roles(&roles).await?;

        Ok(Invalidation {
            permissions: Vec::new(),
            roles,
            users,
        })
    }

    /// Drop the cache entries described by `invalidation`
    pub async fn invalidate(&self, invalidation: Invalidation) -> Result<()> {
        if self.config.invalidation == InvalidationStrategy::ClearAll {
            self.cache.clear().await?;
            info!("Cache cleared after write");
            return Ok(());
        }

        for (id, resource, action) in &invalidation.permissions {
            self.cache.delete(&keys::permission(id)).await?;
            self.cache.delete(&keys::permission_by_pair(resource, action)).await?;
        }
        for role_id in &invalidation.roles {
            self.cache.delete(&keys::role_permissions(role_id)).await?;
        }
        for user_id in &invalidation.users {
            self.cache.delete(&keys::user_permissions(user_id)).await?;
            let dropped = self.cache.delete_prefix(&keys::user_decisions(user_id)).await?;
            debug!(user_id = %user_id, dropped, "Dropped cached decisions");
        }

        info!(
            permissions = invalidation.permissions.len(),
            roles = invalidation.roles.len(),
            users = invalidation.users.len(),
            "Cache invalidated"
        );
        Ok(())
    }

    async fn users_of_roles(&self, roles: &[RoleId]) -> Result<Vec<UserId>> {
        let per_role = try_join_all(roles.iter().map(|role_id| self.roles.users_with_role(role_id))).await?;

        let users: BTreeSet<UserId> = per_role.into_iter().flatten().collect();
        Ok(users.into_iter().collect())
    }

    fn check_conditions(permission: &Permission) {
        if let Some(Err(e)) = permission.conditions.as_ref().map(|c| c.validate()) {
            warn!(
                permission_id = %permission.id,
                error = %e,
                "Permission has a malformed condition; it will never grant"
            );
        }
    }
}
