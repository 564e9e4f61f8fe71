//! Read-only projections over rules and consumption

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use services_common::{Amount, BetField, BettingPoolId, DrawId, GroupId, LimitError, ZoneId};
use std::collections::BTreeSet;
use tracing::warn;

use crate::ledger::BucketKey;
use crate::rules::{HotNumberLimit, LimitRule, LimitScope, RuleRef};
use crate::LimitEngineService;

/// Remaining capacity for one rule/draw/date/field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    /// Configured ceiling
    pub ceiling: Amount,
    /// Consumed so far
    pub consumed: Amount,
    /// `ceiling - consumed`, clamped at zero
    pub remaining: Amount,
    /// Whether further admissions on this bucket are rejected
    pub is_blocked: bool,
    /// Consumption as a percentage of the ceiling (0-100+)
    pub percent_used: f64,
    /// Committed admissions currently held against this bucket
    pub bet_count: u64,
}

/// One entry of the flattened administrative listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LimitConfig {
    /// A limit rule
    Rule(LimitRule),
    /// A hot-number limit
    Hot(HotNumberLimit),
}

/// Filter for configuration listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFilter {
    /// Keep configurations targeting any of these draws
    pub draw_ids: Option<Vec<DrawId>>,
    /// Keep rules scoped to this betting pool
    pub betting_pool_id: Option<BettingPoolId>,
    /// Keep rules scoped to this zone
    pub zone_id: Option<ZoneId>,
    /// Keep rules scoped to this group
    pub group_id: Option<GroupId>,
    /// Keep only by-number rules
    pub by_number_only: bool,
    /// Keep rules valid on this date (window and weekday)
    pub active_on: Option<NaiveDate>,
    /// Substring match on rule name or pattern
    pub search: Option<String>,
}

impl RuleFilter {
    fn matches_rule(&self, rule: &LimitRule) -> bool {
        if let Some(draws) = &self.draw_ids {
            if !draws.iter().any(|d| rule.draw_ids.contains(d)) {
                return false;
            }
        }
        if let Some(pool) = self.betting_pool_id {
            let scoped = matches!(
                rule.scope,
                LimitScope::GeneralForBettingPool(p)
                | LimitScope::ByNumberForBettingPool(p)
                | LimitScope::LocalForBettingPool(p) if p == pool
            );
            if !scoped {
                return false;
            }
        }
        if let Some(zone) = self.zone_id {
            let scoped = matches!(
                rule.scope,
                LimitScope::GeneralForZone(z) | LimitScope::ByNumberForZone(z) if z == zone
            );
            if !scoped {
                return false;
            }
        }
        if let Some(group) = self.group_id {
            let scoped = matches!(
                rule.scope,
                LimitScope::GeneralForGroup(g) | LimitScope::ByNumberForGroup(g) if g == group
            );
            if !scoped {
                return false;
            }
        }
        if self.by_number_only && !rule.scope.is_by_number() {
            return false;
        }
        if let Some(date) = self.active_on {
            let in_window = rule.effective_from.is_none_or(|from| date >= from)
                && rule.effective_to.is_none_or(|to| date <= to)
                && rule.days.contains(date.weekday());
            if !in_window {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let name_hit = rule
                .name
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&needle));
            let pattern_hit = rule
                .number_pattern
                .as_ref()
                .is_some_and(|p| p.as_str().contains(&needle));
            if !name_hit && !pattern_hit {
                return false;
            }
        }
        true
    }

    fn matches_hot(&self, limit: &HotNumberLimit) -> bool {
        // organizational and name filters cannot match a hot-number limit,
        // and by-number means pattern rules: hot limits are registry-driven
        if self.betting_pool_id.is_some()
            || self.zone_id.is_some()
            || self.group_id.is_some()
            || self.search.is_some()
            || self.by_number_only
        {
            return false;
        }
        if let Some(draws) = &self.draw_ids {
            if !draws.iter().any(|d| limit.draw_ids.contains(d)) {
                return false;
            }
        }
        true
    }
}

impl LimitEngineService {
    /// Remaining capacity for one rule/draw/date/field. `RuleNotFound` when
    /// the rule is gone; `InvalidRule` when it does not constrain the field.
    pub(crate) fn availability(
        &self,
        rule: RuleRef,
        draw_id: DrawId,
        date: NaiveDate,
        field: BetField,
    ) -> Result<Availability, LimitError> {
        let ceiling = match rule {
            RuleRef::Rule(id) => self
                .store
                .get_rule(id)
                .ok_or_else(|| LimitError::RuleNotFound(id.to_string()))?
                .ceilings
                .get(&field)
                .copied(),
            RuleRef::Hot(id) => self
                .store
                .get_hot_limit(id)
                .ok_or_else(|| LimitError::RuleNotFound(id.to_string()))?
                .ceilings
                .get(&field)
                .copied(),
        };
        let Some(ceiling) = ceiling else {
            return Err(LimitError::InvalidRule(format!(
                "{rule} does not constrain field {field}"
            )));
        };

        let (consumed, bet_count) = self.ledger.stats(&BucketKey {
            rule,
            draw_id,
            date,
            field,
        });
        let remaining = ceiling.saturating_sub_floor_zero(consumed);
        let percent_used = if ceiling.is_zero() {
            100.0
        } else {
            consumed.as_f64() / ceiling.as_f64() * 100.0
        };
        Ok(Availability {
            ceiling,
            consumed,
            remaining,
            is_blocked: remaining.is_zero(),
            percent_used,
            bet_count,
        })
    }

    /// Numbers for which at least one constrained field is fully consumed
    /// for the given draw and date. By-number rules contribute their
    /// pattern's concrete space; hot-number limits contribute the current
    /// hot selection.
    pub(crate) fn blocked_numbers_sync(
        &self,
        draw_id: DrawId,
        date: NaiveDate,
    ) -> BTreeSet<String> {
        let mut blocked = BTreeSet::new();

        for rule in self.store.list_active_rules(draw_id, date) {
            if !rule.scope.is_by_number() {
                continue;
            }
            let Some(pattern) = &rule.number_pattern else {
                continue;
            };
            if !self.any_field_blocked(RuleRef::Rule(rule.id), draw_id, date, &rule.ceilings) {
                continue;
            }
            match pattern.concrete_numbers(self.config.max_enumeration) {
                Some(numbers) => blocked.extend(numbers),
                None => warn!(
                    "Pattern '{}' of {} exceeds enumeration bound, skipped in blocked-number query",
                    pattern, rule.id
                ),
            }
        }

        let hot = self.registry.snapshot();
        if !hot.is_empty() {
            for limit in self.store.list_active_hot_limits(draw_id) {
                if self.any_field_blocked(RuleRef::Hot(limit.id), draw_id, date, &limit.ceilings) {
                    blocked.extend(hot.iter().map(|n| format!("{n:02}")));
                }
            }
        }

        blocked
    }

    fn any_field_blocked(
        &self,
        rule: RuleRef,
        draw_id: DrawId,
        date: NaiveDate,
        ceilings: &rustc_hash::FxHashMap<BetField, Amount>,
    ) -> bool {
        ceilings.iter().any(|(&field, &ceiling)| {
            let consumed = self.ledger.consumed(&BucketKey {
                rule,
                draw_id,
                date,
                field,
            });
            consumed >= ceiling
        })
    }

    /// Flattened listing of configurations, optionally filtered
    pub(crate) fn configurations(&self, filter: Option<&RuleFilter>) -> Vec<LimitConfig> {
        let mut out: Vec<LimitConfig> = self
            .store
            .all_rules()
            .into_iter()
            .filter(|rule| filter.is_none_or(|f| f.matches_rule(rule)))
            .map(LimitConfig::Rule)
            .collect();
        out.extend(
            self.store
                .all_hot_limits()
                .into_iter()
                .filter(|limit| filter.is_none_or(|f| f.matches_hot(limit)))
                .map(LimitConfig::Hot),
        );
        out
    }

    /// Filtered administrative listing
    #[must_use]
    pub fn find_configurations(&self, filter: &RuleFilter) -> Vec<LimitConfig> {
        self.configurations(Some(filter))
    }
}
