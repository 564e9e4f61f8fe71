//! Consumption ledger: atomic check-and-consume across all matched rules

use chrono::NaiveDate;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use services_common::{Amount, BetField, DrawId, LimitError};
use std::sync::Arc;
use tracing::{error, warn};

use crate::resolver::RuleMatch;
use crate::rules::RuleRef;
use crate::{Admission, Wager};

/// Key of one consumption bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    /// Constraining rule
    pub rule: RuleRef,
    /// Draw the consumption belongs to
    pub draw_id: DrawId,
    /// Draw date
    pub date: NaiveDate,
    /// Constrained bet-type field
    pub field: BetField,
}

/// Running consumption for one bucket
#[derive(Debug, Default)]
struct Bucket {
    consumed: Amount,
    bet_count: u64,
}

/// The only component allowed to mutate consumption state.
///
/// Buckets are created lazily and protected by per-bucket mutexes, so
/// contention is scoped to the exact `(rule, draw, date, field)` tuples one
/// wager touches. Multi-bucket commits lock buckets in sorted key order and
/// apply all-or-nothing, so two concurrent admissions that would jointly
/// overflow a shared bucket can never both succeed.
pub struct ConsumptionLedger {
    buckets: DashMap<BucketKey, Arc<Mutex<Bucket>>>,
    near_limit_warn_pct: u8,
}

impl ConsumptionLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new(near_limit_warn_pct: u8) -> Self {
        Self {
            buckets: DashMap::new(),
            near_limit_warn_pct,
        }
    }

    fn bucket(&self, key: BucketKey) -> Arc<Mutex<Bucket>> {
        self.buckets
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(Bucket::default())))
            .clone()
    }

    /// Admission decision for one wager against all its matched rules.
    ///
    /// Either every bucket absorbs the amount or none does. A rejection
    /// names the most specific rule among those whose ceiling the wager
    /// would exceed. Overflow aborts without partial commit.
    pub fn try_admit(
        &self,
        wager: &Wager,
        matches: &[RuleMatch],
    ) -> Result<Admission, LimitError> {
        if matches.is_empty() {
            return Ok(Admission::Accepted);
        }
        if wager.amount.is_negative() {
            return Err(LimitError::InvariantViolation(format!(
                "negative wager amount {}",
                wager.amount
            )));
        }

        let mut entries: Vec<(BucketKey, Amount, u8)> = matches
            .iter()
            .map(|m| (self.key_for(wager, m.rule), m.ceiling, m.specificity))
            .collect();
        // sorted lock order keeps concurrent multi-bucket commits deadlock-free
        entries.sort_by_key(|(key, _, _)| *key);
        entries.dedup_by_key(|(key, _, _)| *key);

        let handles: Vec<(BucketKey, Amount, u8, Arc<Mutex<Bucket>>)> = entries
            .into_iter()
            .map(|(key, ceiling, spec)| (key, ceiling, spec, self.bucket(key)))
            .collect();
        let mut guards: Vec<_> = handles.iter().map(|(_, _, _, arc)| arc.lock()).collect();

        let mut projected = Vec::with_capacity(guards.len());
        for (i, guard) in guards.iter().enumerate() {
            let (key, _, _, _) = &handles[i];
            let Some(next) = guard.consumed.checked_add(wager.amount) else {
                error!(
                    "Consumption overflow for {} at {} + {}, aborting admission",
                    key.rule, guard.consumed, wager.amount
                );
                return Err(LimitError::InvariantViolation(format!(
                    "consumption overflow for {}",
                    key.rule
                )));
            };
            projected.push(next);
        }

        // blame the most specific exceeded rule; rule ref breaks ties
        let mut violated: Option<(u8, RuleRef)> = None;
        for (i, next) in projected.iter().enumerate() {
            let (key, ceiling, specificity, _) = &handles[i];
            if next > ceiling {
                let candidate = (*specificity, key.rule);
                violated = match violated {
                    Some((spec, rule)) if spec > candidate.0 => Some((spec, rule)),
                    Some((spec, rule)) if spec == candidate.0 && rule < candidate.1 => {
                        Some((spec, rule))
                    }
                    _ => Some(candidate),
                };
            }
        }

        if let Some((_, rule)) = violated {
            warn!(
                "Wager rejected by {}: draw={} number={} field={} amount={}",
                rule, wager.draw_id.0, wager.bet_number, wager.field, wager.amount
            );
            return Ok(Admission::Rejected { violated: rule });
        }

        for (i, guard) in guards.iter_mut().enumerate() {
            let (key, ceiling, _, _) = &handles[i];
            let next = projected[i];
            guard.consumed = next;
            guard.bet_count += 1;
            if self.is_near_limit(next, *ceiling) {
                warn!(
                    "{} near ceiling: consumed={} ceiling={} draw={} field={}",
                    key.rule, next, ceiling, key.draw_id.0, key.field
                );
            }
        }
        Ok(Admission::Accepted)
    }

    /// Reverse a previously committed admission: decrement the same buckets
    /// by the same amount. Single-use — a release that would underflow any
    /// existing bucket fails whole with `ReleaseNotCommitted` and mutates
    /// nothing. Buckets purged because their rule was deleted are skipped.
    pub fn release(&self, wager: &Wager, matches: &[RuleMatch]) -> Result<(), LimitError> {
        if matches.is_empty() {
            return Ok(());
        }

        let mut keys: Vec<BucketKey> = matches
            .iter()
            .map(|m| self.key_for(wager, m.rule))
            .collect();
        keys.sort_unstable();
        keys.dedup();

        let handles: Vec<(BucketKey, Arc<Mutex<Bucket>>)> = keys
            .into_iter()
            .filter_map(|key| self.buckets.get(&key).map(|entry| (key, entry.clone())))
            .collect();
        if handles.is_empty() {
            return Err(LimitError::ReleaseNotCommitted);
        }

        let mut guards: Vec<_> = handles.iter().map(|(_, arc)| arc.lock()).collect();

        let mut next_values = Vec::with_capacity(guards.len());
        for guard in &guards {
            match guard.consumed.checked_sub(wager.amount) {
                Some(next) if !next.is_negative() => next_values.push(next),
                _ => return Err(LimitError::ReleaseNotCommitted),
            }
        }

        for (guard, next) in guards.iter_mut().zip(next_values) {
            guard.consumed = next;
            guard.bet_count = guard.bet_count.saturating_sub(1);
        }
        Ok(())
    }

    /// Consumed amount for one bucket; zero if the bucket was never touched
    #[must_use]
    pub fn consumed(&self, key: &BucketKey) -> Amount {
        self.stats(key).0
    }

    /// Consumed amount and held admission count for one bucket
    #[must_use]
    pub fn stats(&self, key: &BucketKey) -> (Amount, u64) {
        self.buckets.get(key).map_or((Amount::ZERO, 0), |entry| {
            let bucket = entry.lock();
            (bucket.consumed, bucket.bet_count)
        })
    }

    /// Drop every bucket belonging to a deleted rule
    pub fn purge(&self, rule: RuleRef) {
        self.buckets.retain(|key, _| key.rule != rule);
    }

    /// Number of live buckets (diagnostics)
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn key_for(&self, wager: &Wager, rule: RuleRef) -> BucketKey {
        BucketKey {
            rule,
            draw_id: wager.draw_id,
            date: wager.date,
            field: wager.field,
        }
    }

    fn is_near_limit(&self, consumed: Amount, ceiling: Amount) -> bool {
        if ceiling.is_zero() {
            return false;
        }
        i128::from(consumed.as_i64()) * 100
            >= i128::from(ceiling.as_i64()) * i128::from(self.near_limit_warn_pct)
    }
}
