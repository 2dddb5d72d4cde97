//! In-memory durable backend

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::backend::{PermissionBackend, RoleBackend};
use crate::error::{AuthzError, Result};
use crate::types::{Permission, PermissionId, Role, RoleId, UserId};

#[derive(Default)]
struct State {
    permissions: HashMap<PermissionId, Permission>,
    roles: HashMap<RoleId, Role>,
    role_permissions: HashMap<RoleId, BTreeSet<PermissionId>>,
    user_roles: HashMap<UserId, BTreeSet<RoleId>>,
}

impl State {
    fn permissions_of(&self, ids: impl IntoIterator<Item = PermissionId>) -> Vec<Permission> {
        ids.into_iter()
            .filter_map(|id| self.permissions.get(&id).cloned())
            .collect()
    }
}

/// In-memory implementation of both backends
///
/// Enforces the constraints a relational schema would: unique
/// `(resource, action)`, unique role names, and join rows that reference
/// existing roles and permissions.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<State>>,
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionBackend for InMemoryBackend {
    async fn find_by_id(&self, id: &str) -> Result<Option<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions.get(id).cloned())
    }

    async fn find_by_resource_and_action(&self, resource: &str, action: &str) -> Result<Option<Permission>> {
        let state = self.state.read().await;
        Ok(state
            .permissions
            .values()
            .find(|p| p.matches(resource, action))
            .cloned())
    }

    async fn find_by_role(&self, role_id: &str) -> Result<Vec<Permission>> {
        let state = self.state.read().await;
        let ids = state.role_permissions.get(role_id).cloned().unwrap_or_default();
        Ok(state.permissions_of(ids))
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Permission>> {
        let state = self.state.read().await;
        let ids: BTreeSet<PermissionId> = state
            .user_roles
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|role_id| state.role_permissions.get(role_id))
            .flatten()
            .cloned()
            .collect();
        Ok(state.permissions_of(ids))
    }

    async fn save(&self, permission: Permission) -> Result<Permission> {
        let mut state = self.state.write().await;

        let taken = state
            .permissions
            .values()
            .any(|p| p.id != permission.id && p.matches(&permission.resource, &permission.action));
        if taken {
            return Err(AuthzError::Conflict(format!(
                "permission {}:{} already exists",
                permission.resource, permission.action
            )));
        }

        state.permissions.insert(permission.id.clone(), permission.clone());
        Ok(permission)
    }

    async fn delete(&self, id: &str) -> Result<Option<Permission>> {
        let mut state = self.state.write().await;
        let removed = state.permissions.remove(id);
        for assigned in state.role_permissions.values_mut() {
            assigned.remove(id);
        }
        Ok(removed)
    }

    async fn roles_with_permission(&self, permission_id: &str) -> Result<Vec<RoleId>> {
        let state = self.state.read().await;
        let mut roles: Vec<RoleId> = state
            .role_permissions
            .iter()
            .filter(|(_, assigned)| assigned.contains(permission_id))
            .map(|(role_id, _)| role_id.clone())
            .collect();
        roles.sort();
        Ok(roles)
    }
}

#[async_trait]
impl RoleBackend for InMemoryBackend {
    async fn find_role(&self, id: &str) -> Result<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.get(id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.values().find(|r| r.name == name).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn save_role(&self, role: Role) -> Result<Role> {
        let mut state = self.state.write().await;

        if state.roles.values().any(|r| r.id != role.id && r.name == role.name) {
            return Err(AuthzError::Conflict(format!("role name '{}' already exists", role.name)));
        }

        state.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    async fn delete_role(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.roles.remove(id);
        state.role_permissions.remove(id);
        for held in state.user_roles.values_mut() {
            held.remove(id);
        }
        Ok(())
    }

    async fn assign_permissions(&self, role_id: &str, permission_ids: &[PermissionId]) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.roles.contains_key(role_id) {
            return Err(AuthzError::RoleNotFound(role_id.to_string()));
        }
        if let Some(missing) = permission_ids.iter().find(|id| !state.permissions.contains_key(*id)) {
            return Err(AuthzError::PermissionNotFound(missing.clone()));
        }

        state
            .role_permissions
            .entry(role_id.to_string())
            .or_default()
            .extend(permission_ids.iter().cloned());
        Ok(())
    }

    async fn remove_permissions(&self, role_id: &str, permission_ids: &[PermissionId]) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(assigned) = state.role_permissions.get_mut(role_id) {
            for id in permission_ids {
                assigned.remove(id);
            }
        }
        Ok(())
    }

    async fn assign_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.roles.contains_key(role_id) {
            return Err(AuthzError::RoleNotFound(role_id.to_string()));
        }

        state
            .user_roles
            .entry(user_id.to_string())
            .or_default()
            .insert(role_id.to_string());
        Ok(())
    }

    async fn revoke_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(held) = state.user_roles.get_mut(user_id) {
            held.remove(role_id);
        }
        Ok(())
    }

    async fn users_with_role(&self, role_id: &str) -> Result<Vec<UserId>> {
        let state = self.state.read().await;
        let mut users: Vec<UserId> = state
            .user_roles
            .iter()
            .filter(|(_, held)| held.contains(role_id))
            .map(|(user_id, _)| user_id.clone())
            .collect();
        users.sort();
        Ok(users)
    }

    async fn roles_of_user(&self, user_id: &str) -> Result<Vec<RoleId>> {
        let state = self.state.read().await;
        Ok(state
            .user_roles
            .get(user_id)
            .map(|held| held.iter().cloned().collect())
            .unwrap_or_default())
    }
}
