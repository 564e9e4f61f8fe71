//! Betting-Limit & Exposure-Control Engine
//!
//! Decides, at the moment a wager line is submitted, whether it may be
//! accepted given a hierarchy of configured ceilings:
//! - Rule store: limit rules and hot-number limits by scope/draw/date
//! - Hot number registry: process-wide 00-99 set with tighter overrides
//! - Resolver: rule matching and specificity ranking
//! - Consumption ledger: atomic check-and-consume across matched rules
//! - Query surface: remaining capacity, blocked numbers, configurations

pub mod config;
pub mod hot_numbers;
pub mod ledger;
pub mod query;
pub mod resolver;
pub mod rules;
pub mod store;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use services_common::{
    Amount, BetField, BettingPoolId, DrawId, ExternalGroupId, GroupId, HotLimitId, LimitError,
    RuleId, ZoneId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub use config::{EngineConfig, PatternSemantics};
pub use hot_numbers::HotNumberRegistry;
pub use ledger::{BucketKey, ConsumptionLedger};
pub use query::{Availability, LimitConfig, RuleFilter};
pub use resolver::{Resolver, RuleMatch};
pub use rules::{
    HotNumberLimit, HotNumberLimitSpec, LimitRule, LimitRuleSpec, LimitScope, NumberPattern,
    RuleRef,
};
pub use store::RuleStore;

/// One bet line submitted for admission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wager {
    /// Target draw
    pub draw_id: DrawId,
    /// Bet number as entered (digits)
    pub bet_number: String,
    /// Monetizable facet being wagered on
    pub field: BetField,
    /// Wagered amount
    pub amount: Amount,
    /// Selling betting pool
    pub betting_pool_id: BettingPoolId,
    /// Zone of the selling pool, when organized
    pub zone_id: Option<ZoneId>,
    /// Group of the selling pool, when organized
    pub group_id: Option<GroupId>,
    /// External group of the selling pool, when organized
    pub external_group_id: Option<ExternalGroupId>,
    /// Draw date the wager targets
    pub date: NaiveDate,
}

/// Admission decision: a normal business outcome, not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Admission {
    /// Every matched ceiling absorbed the amount
    Accepted,
    /// At least one ceiling would be exceeded; nothing was consumed
    Rejected {
        /// The most specific rule among those exceeded
        violated: RuleRef,
    },
}

impl Admission {
    /// Whether the wager was accepted
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Stable engine contract, independent of transport
#[async_trait]
pub trait LimitEngine: Send + Sync {
    /// Rules constraining a wager, most specific first
    async fn resolve(&self, wager: &Wager) -> Vec<RuleMatch>;

    /// Atomic accept-or-reject across every matched rule
    async fn try_admit(
        &self,
        wager: &Wager,
        matches: &[RuleMatch],
    ) -> Result<Admission, LimitError>;

    /// Reverse a previously committed admission
    async fn release(&self, wager: &Wager, matches: &[RuleMatch]) -> Result<(), LimitError>;

    /// Remaining capacity for one rule/draw/date/field
    async fn remaining(
        &self,
        rule: RuleRef,
        draw_id: DrawId,
        date: NaiveDate,
        field: BetField,
    ) -> Result<Availability, LimitError>;

    /// Numbers fully blocked for a draw/date on at least one field
    async fn blocked_numbers(&self, draw_id: DrawId, date: NaiveDate) -> BTreeSet<String>;

    /// Flattened administrative listing of every configuration
    async fn all_configurations(&self) -> Vec<LimitConfig>;

    /// Validate and store a new rule
    async fn create_rule(&self, spec: LimitRuleSpec) -> Result<RuleId, LimitError>;

    /// Delete a rule and garbage-collect its consumption buckets; idempotent
    async fn delete_rule(&self, id: RuleId);

    /// Rules applying to a draw on a date
    async fn list_active_rules(&self, draw_id: DrawId, date: NaiveDate) -> Vec<LimitRule>;

    /// Validate and store a new hot-number limit
    async fn create_hot_limit(&self, spec: HotNumberLimitSpec) -> Result<HotLimitId, LimitError>;

    /// Delete a hot-number limit and its buckets; idempotent
    async fn delete_hot_limit(&self, id: HotLimitId);

    /// Whether a bet number is currently hot
    async fn is_hot(&self, bet_number: &str) -> bool;

    /// Atomic wholesale replacement of the hot-number selection
    async fn replace_hot_numbers(&self, numbers: &[u8]);
}

/// Limit engine service implementation
pub struct LimitEngineService {
    pub(crate) config: EngineConfig,
    pub(crate) store: Arc<RuleStore>,
    pub(crate) registry: Arc<HotNumberRegistry>,
    pub(crate) ledger: Arc<ConsumptionLedger>,
    pub(crate) resolver: Resolver,
}

impl LimitEngineService {
    /// Create a new engine with the given configuration
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let store = Arc::new(RuleStore::new());
        let registry = Arc::new(HotNumberRegistry::new());
        let ledger = Arc::new(ConsumptionLedger::new(config.near_limit_warn_pct));
        let resolver = Resolver::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            config.pattern_semantics,
        );
        Self {
            config,
            store,
            registry,
            ledger,
            resolver,
        }
    }

    /// Current hot-number selection, as an immutable snapshot
    #[must_use]
    pub fn hot_snapshot(&self) -> Arc<rustc_hash::FxHashSet<u8>> {
        self.registry.snapshot()
    }

    /// Matches still backed by a stored rule. A rule deleted between
    /// resolution and admission no longer applies; dropping it here keeps
    /// that race benign.
    fn live_matches(&self, matches: &[RuleMatch]) -> Vec<RuleMatch> {
        matches
            .iter()
            .copied()
            .filter(|m| match m.rule {
                RuleRef::Rule(id) => self.store.contains_rule(id),
                RuleRef::Hot(id) => self.store.contains_hot_limit(id),
            })
            .collect()
    }
}

impl Default for LimitEngineService {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[async_trait]
impl LimitEngine for LimitEngineService {
    async fn resolve(&self, wager: &Wager) -> Vec<RuleMatch> {
        self.resolver.resolve(wager)
    }

    async fn try_admit(
        &self,
        wager: &Wager,
        matches: &[RuleMatch],
    ) -> Result<Admission, LimitError> {
        let live = self.live_matches(matches);
        self.ledger.try_admit(wager, &live)
    }

    async fn release(&self, wager: &Wager, matches: &[RuleMatch]) -> Result<(), LimitError> {
        self.ledger.release(wager, matches)
    }

    async fn remaining(
        &self,
        rule: RuleRef,
        draw_id: DrawId,
        date: NaiveDate,
        field: BetField,
    ) -> Result<Availability, LimitError> {
        self.availability(rule, draw_id, date, field)
    }

    async fn blocked_numbers(&self, draw_id: DrawId, date: NaiveDate) -> BTreeSet<String> {
        self.blocked_numbers_sync(draw_id, date)
    }

    async fn all_configurations(&self) -> Vec<LimitConfig> {
        self.configurations(None)
    }

    async fn create_rule(&self, spec: LimitRuleSpec) -> Result<RuleId, LimitError> {
        self.store.create_rule(spec)
    }

    async fn delete_rule(&self, id: RuleId) {
        if self.store.delete_rule(id) {
            self.ledger.purge(RuleRef::Rule(id));
        }
    }

    async fn list_active_rules(&self, draw_id: DrawId, date: NaiveDate) -> Vec<LimitRule> {
        self.store.list_active_rules(draw_id, date)
    }

    async fn create_hot_limit(&self, spec: HotNumberLimitSpec) -> Result<HotLimitId, LimitError> {
        self.store.create_hot_limit(spec)
    }

    async fn delete_hot_limit(&self, id: HotLimitId) {
        if self.store.delete_hot_limit(id) {
            self.ledger.purge(RuleRef::Hot(id));
        }
    }

    async fn is_hot(&self, bet_number: &str) -> bool {
        self.registry.is_hot(bet_number)
    }

    async fn replace_hot_numbers(&self, numbers: &[u8]) {
        self.registry.replace(numbers);
    }
}
