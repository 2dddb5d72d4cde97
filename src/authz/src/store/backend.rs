//! Durable storage seams
//!
//! The permission store and the role administration layer read and write
//! through these traits. Persistence mapping lives behind them; the crate
//! ships an in-memory implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Permission, PermissionId, Role, RoleId, UserId};

/// Durable permission catalog
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Get a permission by id
    async fn find_by_id(&self, id: &str) -> Result<Option<Permission>>;

    /// Get the permission for a `(resource, action)` pair
    async fn find_by_resource_and_action(&self, resource: &str, action: &str) -> Result<Option<Permission>>;

    /// Permissions assigned to a role
    async fn find_by_role(&self, role_id: &str) -> Result<Vec<Permission>>;

    /// Permissions reachable through any role assigned to the user
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Permission>>;

    /// Insert or update a permission
    ///
    /// Fails with `Conflict` when another permission holds the same
    /// `(resource, action)` pair.
    async fn save(&self, permission: Permission) -> Result<Permission>;

    /// Delete a permission and its role assignments, returning what was removed
    async fn delete(&self, id: &str) -> Result<Option<Permission>>;

    /// Roles the permission is assigned to
    async fn roles_with_permission(&self, permission_id: &str) -> Result<Vec<RoleId>>;
}

/// Durable roles plus the role→permission and user→role joins
#[async_trait]
pub trait RoleBackend: Send + Sync {
    async fn find_role(&self, id: &str) -> Result<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Insert or update a role; `Conflict` when the name is taken by another role
    async fn save_role(&self, role: Role) -> Result<Role>;

    /// Delete a role together with its permission and user assignments
    async fn delete_role(&self, id: &str) -> Result<()>;

    /// Add role→permission rows; existing rows are left as they are
    async fn assign_permissions(&self, role_id: &str, permission_ids: &[PermissionId]) -> Result<()>;

    /// Remove role→permission rows; absent rows are ignored
    async fn remove_permissions(&self, role_id: &str, permission_ids: &[PermissionId]) -> Result<()>;

    /// Add a user→role row; idempotent
    async fn assign_role(&self, user_id: &str, role_id: &str) -> Result<()>;

    /// Remove a user→role row; idempotent
    async fn revoke_role(&self, user_id: &str, role_id: &str) -> Result<()>;

    /// Users holding the role
    async fn users_with_role(&self, role_id: &str) -> Result<Vec<UserId>>;

    /// Roles held by the user
    async fn roles_of_user(&self, user_id: &str) -> Result<Vec<RoleId>>;
}
