//! Authorization request handling

use serde::{Deserialize, Serialize};

use crate::cache::keys;
use crate::types::{Context, UserId};

/// Context attribute naming the acting user, referenced as `@currentUser`
pub const CURRENT_USER: &str = "currentUser";

/// Authorization request with actor, resource, action, and context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Acting user
    pub user_id: UserId,

    /// Resource namespace (e.g., "order")
    pub resource: String,

    /// Action on the resource (e.g., "update")
    pub action: String,

    /// Caller-supplied attributes
    #[serde(default)]
    pub context: Context,
}

impl AccessRequest {
    pub fn new(user_id: impl Into<UserId>, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            resource: resource.into(),
            action: action.into(),
            context: Context::new(),
        }
    }

    /// Add a context attribute
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Decision cache key over user, resource, action and canonical context
    pub fn cache_key(&self) -> String {
        keys::decision(&self.user_id, &self.resource, &self.action, &self.context)
    }

    /// Context used for condition evaluation
    ///
    /// The acting user always overrides a caller-supplied `currentUser`, so a
    /// caller cannot impersonate another user through the context.
    pub fn evaluation_context(&self) -> Context {
        let mut context = self.context.clone();
        context.insert(CURRENT_USER.to_string(), serde_json::Value::String(self.user_id.clone()));
        context
    }
}
