//! # Permit Authorization
//!
//! Role-based authorization with attribute conditions and two-level caching.
//!
//! ## Features
//!
//! - **Condition trees** (`and`/`or`/`not` over a closed operator set) with
//!   `@name` references into the request context
//! - **Cached permission store** over pluggable durable backends
//! - **Decision cache** keyed by user, resource, action and context digest
//! - **Targeted invalidation** on every permission, role and assignment change
//! - **Async-first design** using Tokio runtime
//!
//! ## Example
//!
//! ```rust
//! use permit_authz::{
//!     AuthzConfig, Condition, Context, Evaluator, InMemoryBackend, MemoryCache, Operator,
//!     Permission, PermissionStore, RoleAdmin,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthzConfig::default();
//!     let backend = Arc::new(InMemoryBackend::new());
//!     let store = Arc::new(PermissionStore::new(
//!         backend.clone(),
//!         backend.clone(),
//!         Arc::new(MemoryCache::default()),
//!         config.store.clone(),
//!     ));
//!
//!     let admin = RoleAdmin::new(store.clone());
//!     let role = admin.create_role("ADMIN", None, false).await?;
//!     let permission = store
//!         .save(
//!             Permission::new("order", "update")
//!                 .with_conditions(Condition::leaf("ownerId", Operator::Eq, "@currentUser")),
//!         )
//!         .await?;
//!     admin.assign_permissions(&role.id, &[permission.id]).await?;
//!     admin.assign_role("u1", &role.id).await?;
//!
//!     let evaluator = Evaluator::new(store, config.evaluator);
//!
//!     let mut context = Context::new();
//!     context.insert("ownerId".to_string(), "u1".into());
//!     assert!(evaluator.has_permission("u1", "order", "update", &context).await?);
//!
//!     context.insert("ownerId".to_string(), "u2".into());
//!     assert!(!evaluator.has_permission("u1", "order", "update", &context).await?);
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod cache;
pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use admin::RoleAdmin;
pub use cache::{CacheBackend, CacheStats, MemoryCache};
pub use condition::{Condition, ConditionError, Operand, Operator, Predicate};
pub use config::{AuthzConfig, EvaluatorConfig, InvalidationStrategy, StoreConfig};
pub use engine::{AccessRequest, DecisionMetrics, Evaluator, MetricsCollector};
pub use error::{AuthzError, Result};
pub use events::{AccessEvent, EventSink, MemoryEventSink, NoopEventSink};
pub use store::{InMemoryBackend, Invalidation, PermissionBackend, PermissionStore, RoleBackend};
pub use types::{Context, Permission, PermissionId, Role, RoleId, UserId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
