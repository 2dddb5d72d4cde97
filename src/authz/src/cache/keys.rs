//! Deterministic cache keys
//!
//! Key components are escaped so that ids containing `:` cannot collide with
//! another key shape or fall under another user's decision prefix.

use blake3::Hasher;
use serde_json::{Map, Value};

use crate::types::Context;

fn escape(component: &str) -> String {
    component.replace('%', "%25").replace(':', "%3A")
}

/// Permission record by id
pub fn permission(id: &str) -> String {
    format!("permission:id:{}", escape(id))
}

/// Permission record by `(resource, action)`
pub fn permission_by_pair(resource: &str, action: &str) -> String {
    format!("permission:pair:{}:{}", escape(resource), escape(action))
}

/// Permissions assigned to a role
pub fn role_permissions(role_id: &str) -> String {
    format!("permissions:role:{}", escape(role_id))
}

/// Permissions reachable by a user
pub fn user_permissions(user_id: &str) -> String {
    format!("permissions:user:{}", escape(user_id))
}

/// Prefix shared by every decision key
pub const DECISION_PREFIX: &str = "decision:";

/// Prefix covering every cached decision of one user
pub fn user_decisions(user_id: &str) -> String {
    format!("{}{}:", DECISION_PREFIX, escape(user_id))
}

/// Cached decision for `(user, resource, action, context)`
pub fn decision(user_id: &str, resource: &str, action: &str, context: &Context) -> String {
    format!(
        "{}{}:{}:{}",
        user_decisions(user_id),
        escape(resource),
        escape(action),
        context_digest(context)
    )
}

/// BLAKE3 digest of the canonical context serialization
///
/// Canonical form is compact JSON with object keys sorted at every depth, so
/// two contexts with the same attributes hash equal regardless of insertion
/// order.
pub fn context_digest(context: &Context) -> String {
    let canonical: Map<String, Value> = context
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut hasher = Hasher::new();
    hasher.update(Value::Object(canonical).to_string().as_bytes());
    hasher.finalize().to_hex().to_string()
}
