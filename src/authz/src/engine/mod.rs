//! Authorization evaluator
//!
//! Answers "may this user perform this action on this resource, given this
//! context?" with decision caching on top of the cached permission store.

pub mod decision;
pub mod metrics;

pub use decision::{AccessRequest, CURRENT_USER};
pub use metrics::{DecisionMetrics, MetricsCollector};

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{keys, CacheBackend};
use crate::config::EvaluatorConfig;
use crate::error::Result;
use crate::events::{AccessEvent, EventSink, NoopEventSink};
use crate::store::{Invalidation, PermissionStore};
use crate::types::{Context, Permission};

/// Authorization evaluator
///
/// # Pipeline
///
/// ```text
/// request → decision cache ─hit──────────────────────────────→ bool
///               │ miss
///               ↓
///         PermissionStore.find_by_user → match (resource, action)
///               ↓
///         unconditional grant? ─yes→ true
///               ↓ no
///         any condition holds under context + currentUser → bool
///               ↓
///         decision cache write (decision TTL)
/// ```
///
/// Denial is `Ok(false)`. Store and cache failures are returned as errors
/// and never turned into a decision.
pub struct Evaluator {
    store: Arc<PermissionStore>,

    /// Shared with the store so its writes reach cached decisions
    cache: Arc<dyn CacheBackend>,

    events: Arc<dyn EventSink>,

    metrics: Option<Arc<MetricsCollector>>,

    config: EvaluatorConfig,
}

impl Evaluator {
    /// Create an evaluator over a permission store, sharing the store's cache
    pub fn new(store: Arc<PermissionStore>, config: EvaluatorConfig) -> Self {
        let metrics = config
            .enable_metrics
            .then(|| Arc::new(MetricsCollector::new()));

        info!(
            "Evaluator initialized with decision_cache={}, decision_ttl={:?}, metrics={}",
            config.enable_cache, config.decision_ttl, config.enable_metrics
        );

        Self {
            cache: store.cache(),
            store,
            events: Arc::new(NoopEventSink),
            metrics,
            config,
        }
    }

    /// Publish a `PermissionChecked` event for every decision
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Decide whether `user_id` may perform `action` on `resource`
    pub async fn has_permission(
        &self,
        user_id: &str,
        resource: &str,
        action: &str,
        context: &Context,
    ) -> Result<bool> {
        let request = AccessRequest {
            user_id: user_id.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            context: context.clone(),
        };
        self.check(&request).await
    }

    /// Decide an [`AccessRequest`]
    pub async fn check(&self, request: &AccessRequest) -> Result<bool> {
        let start = Instant::now();

        debug!(
            "Permission check: user={}, resource={}, action={}",
            request.user_id, request.resource, request.action
        );

        let (allowed, cached) = match self.decide(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_error().await;
                }
                warn!(
                    user_id = %request.user_id,
                    resource = %request.resource,
                    action = %request.action,
                    error = %e,
                    "Permission check could not be decided"
                );
                return Err(e);
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_decision(allowed, start.elapsed()).await;
        }

        let event = AccessEvent::PermissionChecked {
            user_id: request.user_id.clone(),
            resource: request.resource.clone(),
            action: request.action.clone(),
            allowed,
            cached,
            occurred_at: Utc::now(),
        };
        if let Err(e) = self.events.publish(event).await {
            warn!(error = %e, "Failed to publish permission_checked event");
        }

        Ok(allowed)
    }

    /// Returns `(allowed, served_from_cache)`
    async fn decide(&self, request: &AccessRequest) -> Result<(bool, bool)> {
        let key = request.cache_key();

        if self.config.enable_cache {
            if let Some(allowed) = self.cache.get_as::<bool>(&key).await? {
                if let Some(metrics) = &self.metrics {
                    metrics.record_cache_hit().await;
                }
                debug!("Decision cache hit");
                return Ok((allowed, true));
            }

            if let Some(metrics) = &self.metrics {
                metrics.record_cache_miss().await;
            }
        }

        let permissions = self.store.find_by_user(&request.user_id).await?;
        let allowed = Self::evaluate(request, &permissions);

        info!(
            "Decision: {} user={} resource={} action={}",
            if allowed { "ALLOW" } else { "DENY" },
            request.user_id,
            request.resource,
            request.action
        );

        if self.config.enable_cache {
            self.cache.set_as(&key, &allowed, self.config.decision_ttl).await?;
        }

        Ok((allowed, false))
    }

    /// Decide a request against the user's reachable permissions
    ///
    /// Unconditional matches grant outright; otherwise any candidate whose
    /// condition holds grants.
    pub fn evaluate(request: &AccessRequest, permissions: &[Permission]) -> bool {
        let candidates: Vec<&Permission> = permissions
            .iter()
            .filter(|p| p.matches(&request.resource, &request.action))
            .collect();

        if candidates.is_empty() {
            debug!("No permission matches the request");
            return false;
        }

        if let Some(grant) = candidates.iter().find(|p| !p.has_conditions()) {
            debug!("Unconditional grant by permission {}", grant.id);
            return true;
        }

        let context = request.evaluation_context();
        candidates.iter().any(|permission| {
            let held = permission
                .conditions
                .as_ref()
                .map_or(true, |condition| condition.evaluate(&context));
            debug!("Permission {} condition held: {}", permission.id, held);
            held
        })
    }

    /// Drop one user's cached permissions and decisions
    pub async fn invalidate_user(&self, user_id: &str) -> Result<()> {
        self.store.invalidate(Invalidation::user(user_id)).await
    }

    /// Drop every cached decision, keeping cached permission records
    pub async fn invalidate_decisions(&self) -> Result<()> {
        let dropped = self.cache.delete_prefix(keys::DECISION_PREFIX).await?;
        info!(dropped, "Decision cache invalidated");
        Ok(())
    }

    /// Get evaluator metrics
    pub async fn metrics(&self) -> Option<DecisionMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.snapshot().await),
            None => None,
        }
    }

    /// Metrics collector, for Prometheus export
    pub fn metrics_collector(&self) -> Option<Arc<MetricsCollector>> {
        self.metrics.clone()
    }
}
