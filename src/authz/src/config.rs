//! Cache and invalidation configuration
//!
//! Environment variables read by [`AuthzConfig::from_env`]:
//! - `AUTHZ_PERMISSION_CACHE_TTL` - permission record TTL in seconds (default: 600)
//! - `AUTHZ_ROLE_CACHE_TTL` - role permission list TTL in seconds (default: 600)
//! - `AUTHZ_USER_CACHE_TTL` - user permission list TTL in seconds (default: 300)
//! - `AUTHZ_DECISION_CACHE_TTL` - decision TTL in seconds (default: 60)
//! - `AUTHZ_DECISION_CACHE` - enable decision caching (default: true)
//! - `AUTHZ_INVALIDATION` - `per-key` or `clear-all` (default: per-key)

use std::str::FromStr;
use std::time::Duration;

use crate::error::{AuthzError, Result};

/// How writes invalidate cached entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationStrategy {
    /// Delete the mutated entity keys plus the list and decision entries of
    /// every affected role and user
    #[default]
    PerKey,

    /// Clear the whole cache on any write
    ///
    /// Coarse, but adequate when catalog writes are rare compared to checks.
    ClearAll,
}

impl FromStr for InvalidationStrategy {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-key" | "per_key" | "perkey" => Ok(Self::PerKey),
            "clear-all" | "clear_all" | "clearall" => Ok(Self::ClearAll),
            other => Err(AuthzError::InvalidInput(format!(
                "unknown invalidation strategy '{}'",
                other
            ))),
        }
    }
}

/// Permission store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// TTL for permission records looked up by id or `(resource, action)`
    pub permission_ttl: Duration,

    /// TTL for a role's permission list
    pub role_ttl: Duration,

    /// TTL for a user's permission list
    pub user_ttl: Duration,

    /// Invalidation on write
    pub invalidation: InvalidationStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            permission_ttl: Duration::from_secs(600),
            role_ttl: Duration::from_secs(600),
            user_ttl: Duration::from_secs(300),
            invalidation: InvalidationStrategy::PerKey,
        }
    }
}

/// Evaluator configuration
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Cache boolean decisions
    pub enable_cache: bool,

    /// TTL for cached decisions; bounds staleness for races with writes
    pub decision_ttl: Duration,

    /// Collect decision metrics
    pub enable_metrics: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            decision_ttl: Duration::from_secs(60),
            enable_metrics: true,
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default)]
pub struct AuthzConfig {
    pub store: StoreConfig,
    pub evaluator: EvaluatorConfig,
}

impl AuthzConfig {
    /// Load from process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ttl) = seconds(&lookup, "AUTHZ_PERMISSION_CACHE_TTL")? {
            config.store.permission_ttl = ttl;
        }
        if let Some(ttl) = seconds(&lookup, "AUTHZ_ROLE_CACHE_TTL")? {
            config.store.role_ttl = ttl;
        }
        if let Some(ttl) = seconds(&lookup, "AUTHZ_USER_CACHE_TTL")? {
            config.store.user_ttl = ttl;
        }
        if let Some(ttl) = seconds(&lookup, "AUTHZ_DECISION_CACHE_TTL")? {
            config.evaluator.decision_ttl = ttl;
        }
        if let Some(raw) = lookup("AUTHZ_DECISION_CACHE") {
            config.evaluator.enable_cache = raw.trim().parse().map_err(|_| {
                AuthzError::InvalidInput(format!("AUTHZ_DECISION_CACHE: expected true/false, got '{}'", raw))
            })?;
        }
        if let Some(raw) = lookup("AUTHZ_INVALIDATION") {
            config.store.invalidation = raw.parse()?;
        }

        Ok(config)
    }
}

fn seconds<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| AuthzError::InvalidInput(format!("{}: expected seconds, got '{}'", key, raw)))
        })
        .transpose()
}
