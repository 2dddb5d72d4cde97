//! Condition tree for attribute-based permission grants
//!
//! A condition is a recursive predicate attached to a permission. It is parsed
//! once from its JSON shape when the permission is loaded and evaluated against
//! a caller-supplied [`Context`](crate::types::Context) on every check.
//!
//! # Shape
//!
//! ```json
//! {"and": [
//!     {"field": "ownerId", "operator": "eq", "value": "@currentUser"},
//!     {"not": {"field": "status", "operator": "in", "value": ["archived", "locked"]}}
//! ]}
//! ```
//!
//! String values starting with `@` are context references: `@currentUser`
//! resolves to `context["currentUser"]` at evaluation time.
//!
//! # Example
//!
//! ```rust
//! use permit_authz::condition::Condition;
//! use serde_json::json;
//!
//! let condition = Condition::parse(&json!({
//!     "field": "ownerId", "operator": "eq", "value": "@currentUser"
//! }));
//!
//! let context = [
//!     ("ownerId".to_string(), json!("u1")),
//!     ("currentUser".to_string(), json!("u1")),
//! ].into_iter().collect();
//!
//! assert!(condition.evaluate(&context));
//! ```

pub mod error;
pub mod node;
pub mod operator;

#[cfg(test)]
mod tests;

pub use error::{ConditionError, Result};
pub use node::{Condition, Operand, Predicate};
pub use operator::Operator;
