//! Rule matching and specificity ranking

use serde::{Deserialize, Serialize};
use services_common::Amount;
use std::sync::Arc;

use crate::Wager;
use crate::config::PatternSemantics;
use crate::hot_numbers::HotNumberRegistry;
use crate::rules::{LimitRule, LimitScope, RuleRef};
use crate::store::RuleStore;

/// Specificity rank assigned to hot-number limits: tighter than the
/// absolute backstop, looser than any scoped rule.
pub const HOT_LIMIT_SPECIFICITY: u8 = 1;

/// One rule constraining a wager, with the ceiling it contributes for the
/// wager's bet-type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    /// The constraining rule
    pub rule: RuleRef,
    /// Ceiling for the wager's field
    pub ceiling: Amount,
    /// Specificity rank; higher is tighter
    pub specificity: u8,
}

/// Resolver: computes the ordered set of rules applicable to a wager.
///
/// Every match is enforced by the ledger; the ordering only decides which
/// rule is blamed when several ceilings are exceeded at once.
pub struct Resolver {
    store: Arc<RuleStore>,
    registry: Arc<HotNumberRegistry>,
    semantics: PatternSemantics,
}

impl Resolver {
    /// Create a resolver over the given store and registry
    #[must_use]
    pub fn new(
        store: Arc<RuleStore>,
        registry: Arc<HotNumberRegistry>,
        semantics: PatternSemantics,
    ) -> Self {
        Self {
            store,
            registry,
            semantics,
        }
    }

    /// All rules whose ceilings constrain this wager, most specific first.
    /// An empty result means the wager is unconstrained by this engine.
    #[must_use]
    pub fn resolve(&self, wager: &Wager) -> Vec<RuleMatch> {
        let mut matches: Vec<RuleMatch> = self
            .store
            .list_active_rules(wager.draw_id, wager.date)
            .iter()
            .filter(|rule| self.rule_matches(rule, wager))
            .filter_map(|rule| {
                rule.ceilings.get(&wager.field).map(|&ceiling| RuleMatch {
                    rule: RuleRef::Rule(rule.id),
                    ceiling,
                    specificity: rule.scope.specificity(),
                })
            })
            .collect();

        if self.registry.is_hot(&wager.bet_number) {
            for limit in self.store.list_active_hot_limits(wager.draw_id) {
                if let Some(&ceiling) = limit.ceilings.get(&wager.field) {
                    matches.push(RuleMatch {
                        rule: RuleRef::Hot(limit.id),
                        ceiling,
                        specificity: HOT_LIMIT_SPECIFICITY,
                    });
                }
            }
        }

        // Most specific first; rule ref as tie-break keeps blame deterministic
        matches.sort_by(|a, b| {
            b.specificity
                .cmp(&a.specificity)
                .then_with(|| a.rule.cmp(&b.rule))
        });
        matches
    }

    fn rule_matches(&self, rule: &LimitRule, wager: &Wager) -> bool {
        let scope_ok = match rule.scope {
            LimitScope::Absolute => true,
            LimitScope::GeneralForGroup(id) | LimitScope::ByNumberForGroup(id) => {
                wager.group_id == Some(id)
            }
            LimitScope::GeneralForExternalGroup(id) | LimitScope::ByNumberForExternalGroup(id) => {
                wager.external_group_id == Some(id)
            }
            LimitScope::GeneralForZone(id) | LimitScope::ByNumberForZone(id) => {
                wager.zone_id == Some(id)
            }
            LimitScope::GeneralForBettingPool(id)
            | LimitScope::ByNumberForBettingPool(id)
            | LimitScope::LocalForBettingPool(id) => wager.betting_pool_id == id,
        };
        if !scope_ok {
            return false;
        }
        if rule.scope.is_by_number() {
            return rule
                .number_pattern
                .as_ref()
                .is_some_and(|p| p.matches(&wager.bet_number, self.semantics));
        }
        true
    }
}
