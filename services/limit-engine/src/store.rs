//! In-memory indexed storage for limit rules and hot-number limits

use chrono::NaiveDate;
use dashmap::DashMap;
use services_common::{DrawId, HotLimitId, LimitError, RuleId};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

use crate::rules::{HotNumberLimit, HotNumberLimitSpec, LimitRule, LimitRuleSpec};

/// Rule store: durable home of `LimitRule` and `HotNumberLimit` records.
///
/// Storage only; consumption state lives in the ledger and is never touched
/// from here.
pub struct RuleStore {
    rules: DashMap<RuleId, LimitRule>,
    hot_limits: DashMap<HotLimitId, HotNumberLimit>,
    next_rule_id: AtomicU32,
    next_hot_id: AtomicU32,
}

impl RuleStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            hot_limits: DashMap::new(),
            next_rule_id: AtomicU32::new(1),
            next_hot_id: AtomicU32::new(1),
        }
    }

    /// Validate and store a new rule
    pub fn create_rule(&self, spec: LimitRuleSpec) -> Result<RuleId, LimitError> {
        spec.validate()?;
        let id = RuleId(self.next_rule_id.fetch_add(1, Ordering::Relaxed));
        let rule = spec.into_rule(id);
        info!(
            "Created {} scope={} draws={} name={:?}",
            id,
            rule.scope,
            rule.draw_ids.len(),
            rule.name
        );
        self.rules.insert(id, rule);
        Ok(id)
    }

    /// Delete a rule. Idempotent: deleting an unknown id is a no-op.
    /// Returns whether a rule was actually removed, so the caller can
    /// garbage-collect its consumption buckets.
    pub fn delete_rule(&self, id: RuleId) -> bool {
        let removed = self.rules.remove(&id).is_some();
        if removed {
            info!("Deleted {id}");
        }
        removed
    }

    /// Whether a rule currently exists
    #[must_use]
    pub fn contains_rule(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    /// Fetch a rule by id
    #[must_use]
    pub fn get_rule(&self, id: RuleId) -> Option<LimitRule> {
        self.rules.get(&id).map(|r| r.clone())
    }

    /// All rules applying to the given draw on the given date: draw
    /// membership, weekday bit, and validity window. No ordering guarantee;
    /// ranking is the resolver's job.
    #[must_use]
    pub fn list_active_rules(&self, draw_id: DrawId, date: NaiveDate) -> Vec<LimitRule> {
        self.rules
            .iter()
            .filter(|entry| entry.is_active_on(draw_id, date))
            .map(|entry| entry.clone())
            .collect()
    }

    /// Validate and store a new hot-number limit. An existing limit with the
    /// exact same draw set is a configuration conflict.
    pub fn create_hot_limit(&self, spec: HotNumberLimitSpec) -> Result<HotLimitId, LimitError> {
        spec.validate()?;
        let duplicate = self
            .hot_limits
            .iter()
            .any(|entry| entry.draw_ids == spec.draw_ids);
        if duplicate {
            return Err(LimitError::InvalidRule(
                "a hot-number limit with the same draw set already exists".to_string(),
            ));
        }
        let id = HotLimitId(self.next_hot_id.fetch_add(1, Ordering::Relaxed));
        let limit = spec.into_limit(id);
        info!("Created {} draws={}", id, limit.draw_ids.len());
        self.hot_limits.insert(id, limit);
        Ok(id)
    }

    /// Delete a hot-number limit; idempotent like `delete_rule`
    pub fn delete_hot_limit(&self, id: HotLimitId) -> bool {
        let removed = self.hot_limits.remove(&id).is_some();
        if removed {
            info!("Deleted {id}");
        }
        removed
    }

    /// Whether a hot-number limit currently exists
    #[must_use]
    pub fn contains_hot_limit(&self, id: HotLimitId) -> bool {
        self.hot_limits.contains_key(&id)
    }

    /// Fetch a hot-number limit by id
    #[must_use]
    pub fn get_hot_limit(&self, id: HotLimitId) -> Option<HotNumberLimit> {
        self.hot_limits.get(&id).map(|l| l.clone())
    }

    /// All hot-number limits applying to the given draw
    #[must_use]
    pub fn list_active_hot_limits(&self, draw_id: DrawId) -> Vec<HotNumberLimit> {
        self.hot_limits
            .iter()
            .filter(|entry| entry.draw_ids.contains(&draw_id))
            .map(|entry| entry.clone())
            .collect()
    }

    /// Snapshot of every configured rule
    #[must_use]
    pub fn all_rules(&self) -> Vec<LimitRule> {
        self.rules.iter().map(|entry| entry.clone()).collect()
    }

    /// Snapshot of every configured hot-number limit
    #[must_use]
    pub fn all_hot_limits(&self) -> Vec<HotNumberLimit> {
        self.hot_limits.iter().map(|entry| entry.clone()).collect()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}
