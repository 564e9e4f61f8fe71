//! Admission lifecycle: accept, reject, release

use chrono::NaiveDate;
use limit_engine::{
    Admission, HotNumberLimitSpec, LimitEngine, LimitEngineService, LimitRuleSpec, LimitScope,
    NumberPattern, RuleRef, Wager,
};
use rustc_hash::{FxHashMap, FxHashSet};
use services_common::{Amount, BetField, BettingPoolId, DayOfWeekMask, DrawId, LimitError};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 17).unwrap()
}

fn draws(ids: &[u32]) -> FxHashSet<DrawId> {
    ids.iter().map(|&d| DrawId(d)).collect()
}

fn directo(ceiling: f64) -> FxHashMap<BetField, Amount> {
    let mut map = FxHashMap::default();
    map.insert(BetField::Directo, Amount::new(ceiling));
    map
}

fn by_number_rule(pool: u32, draw: u32, pattern: &str, ceiling: f64) -> LimitRuleSpec {
    LimitRuleSpec {
        name: None,
        scope: LimitScope::ByNumberForBettingPool(BettingPoolId(pool)),
        draw_ids: draws(&[draw]),
        days: DayOfWeekMask::ALL,
        number_pattern: Some(NumberPattern::new(pattern).unwrap()),
        ceilings: directo(ceiling),
        effective_from: None,
        effective_to: None,
    }
}

fn wager(draw: u32, number: &str, amount: f64, pool: u32) -> Wager {
    Wager {
        draw_id: DrawId(draw),
        bet_number: number.to_string(),
        field: BetField::Directo,
        amount: Amount::new(amount),
        betting_pool_id: BettingPoolId(pool),
        zone_id: None,
        group_id: None,
        external_group_id: None,
        date: monday(),
    }
}

#[tokio::test]
async fn test_accept_then_reject_without_partial_consumption() {
    let engine = LimitEngineService::default();
    let rule_id = engine
        .create_rule(by_number_rule(7, 5, "23", 100.0))
        .await
        .unwrap();

    let first = wager(5, "23", 60.0, 7);
    let matches = engine.resolve(&first).await;
    assert_eq!(matches.len(), 1);
    assert_eq!(
        engine.try_admit(&first, &matches).await.unwrap(),
        Admission::Accepted
    );

    let avail = engine
        .remaining(RuleRef::Rule(rule_id), DrawId(5), monday(), BetField::Directo)
        .await
        .unwrap();
    assert_eq!(avail.remaining, Amount::new(40.0));
    assert!(!avail.is_blocked);

    let second = wager(5, "23", 50.0, 7);
    let matches = engine.resolve(&second).await;
    assert_eq!(
        engine.try_admit(&second, &matches).await.unwrap(),
        Admission::Rejected {
            violated: RuleRef::Rule(rule_id)
        }
    );

    // rejection consumed nothing
    let avail = engine
        .remaining(RuleRef::Rule(rule_id), DrawId(5), monday(), BetField::Directo)
        .await
        .unwrap();
    assert_eq!(avail.remaining, Amount::new(40.0));
}

#[tokio::test]
async fn test_exact_ceiling_boundary() {
    let engine = LimitEngineService::default();
    engine
        .create_rule(by_number_rule(7, 5, "23", 100.0))
        .await
        .unwrap();

    let fill = wager(5, "23", 100.0, 7);
    let matches = engine.resolve(&fill).await;
    assert!(engine.try_admit(&fill, &matches).await.unwrap().is_accepted());

    // ceiling reached exactly: any further positive amount is rejected
    let tiny = wager(5, "23", 0.0001, 7);
    let matches = engine.resolve(&tiny).await;
    assert!(!engine.try_admit(&tiny, &matches).await.unwrap().is_accepted());
}

#[tokio::test]
async fn test_release_restores_capacity() {
    let engine = LimitEngineService::default();
    let rule_id = engine
        .create_rule(by_number_rule(7, 5, "23", 100.0))
        .await
        .unwrap();

    let w = wager(5, "23", 60.0, 7);
    let matches = engine.resolve(&w).await;
    engine.try_admit(&w, &matches).await.unwrap();
    engine.release(&w, &matches).await.unwrap();

    let avail = engine
        .remaining(RuleRef::Rule(rule_id), DrawId(5), monday(), BetField::Directo)
        .await
        .unwrap();
    assert_eq!(avail.remaining, Amount::new(100.0));
    assert_eq!(avail.bet_count, 0);

    // admit-release-admit equals a single admit
    engine.try_admit(&w, &matches).await.unwrap();
    let avail = engine
        .remaining(RuleRef::Rule(rule_id), DrawId(5), monday(), BetField::Directo)
        .await
        .unwrap();
    assert_eq!(avail.consumed, Amount::new(60.0));
    assert_eq!(avail.bet_count, 1);
}

#[tokio::test]
async fn test_consumption_overflow_aborts_without_commit() {
    let engine = LimitEngineService::default();
    let mut ceilings = FxHashMap::default();
    ceilings.insert(BetField::Directo, Amount::from_i64(i64::MAX));
    let rule_id = engine
        .create_rule(LimitRuleSpec {
            ceilings,
            ..by_number_rule(7, 5, "23", 0.0)
        })
        .await
        .unwrap();

    let mut first = wager(5, "23", 0.0, 7);
    first.amount = Amount::from_i64(i64::MAX - 10);
    let matches = engine.resolve(&first).await;
    assert!(engine.try_admit(&first, &matches).await.unwrap().is_accepted());

    // projected consumption no longer fits in the fixed-point range
    let mut second = wager(5, "23", 0.0, 7);
    second.amount = Amount::from_i64(20);
    let matches = engine.resolve(&second).await;
    assert!(matches!(
        engine.try_admit(&second, &matches).await,
        Err(LimitError::InvariantViolation(_))
    ));

    // the aborted admission committed nothing
    let avail = engine
        .remaining(RuleRef::Rule(rule_id), DrawId(5), monday(), BetField::Directo)
        .await
        .unwrap();
    assert_eq!(avail.consumed, Amount::from_i64(i64::MAX - 10));
    assert_eq!(avail.bet_count, 1);
}

#[tokio::test]
async fn test_double_release_is_a_caller_error() {
    let engine = LimitEngineService::default();
    engine
        .create_rule(by_number_rule(7, 5, "23", 100.0))
        .await
        .unwrap();

    let w = wager(5, "23", 60.0, 7);
    let matches = engine.resolve(&w).await;
    engine.try_admit(&w, &matches).await.unwrap();
    engine.release(&w, &matches).await.unwrap();
    assert!(matches!(
        engine.release(&w, &matches).await,
        Err(LimitError::ReleaseNotCommitted)
    ));
}

#[tokio::test]
async fn test_release_of_rejected_admission_is_an_error() {
    let engine = LimitEngineService::default();
    engine
        .create_rule(by_number_rule(7, 5, "23", 50.0))
        .await
        .unwrap();

    let w = wager(5, "23", 60.0, 7);
    let matches = engine.resolve(&w).await;
    assert!(!engine.try_admit(&w, &matches).await.unwrap().is_accepted());
    assert!(matches!(
        engine.release(&w, &matches).await,
        Err(LimitError::ReleaseNotCommitted)
    ));
}

#[tokio::test]
async fn test_hot_number_override_governs() {
    let engine = LimitEngineService::default();
    let pool_rule = engine
        .create_rule(by_number_rule(7, 5, "23", 100.0))
        .await
        .unwrap();
    let hot_id = engine
        .create_hot_limit(HotNumberLimitSpec {
            draw_ids: draws(&[5]),
            ceilings: directo(30.0),
        })
        .await
        .unwrap();
    engine.replace_hot_numbers(&[23]).await;

    // the betting-pool rule alone would allow 60; the hot override rejects it
    let w = wager(5, "23", 60.0, 7);
    let matches = engine.resolve(&w).await;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].rule, RuleRef::Rule(pool_rule));
    assert_eq!(
        engine.try_admit(&w, &matches).await.unwrap(),
        Admission::Rejected {
            violated: RuleRef::Hot(hot_id)
        }
    );

    // within the override both buckets consume together
    let small = wager(5, "23", 25.0, 7);
    let matches = engine.resolve(&small).await;
    assert!(engine.try_admit(&small, &matches).await.unwrap().is_accepted());
    let hot_avail = engine
        .remaining(RuleRef::Hot(hot_id), DrawId(5), monday(), BetField::Directo)
        .await
        .unwrap();
    assert_eq!(hot_avail.remaining, Amount::new(5.0));
    let pool_avail = engine
        .remaining(RuleRef::Rule(pool_rule), DrawId(5), monday(), BetField::Directo)
        .await
        .unwrap();
    assert_eq!(pool_avail.remaining, Amount::new(75.0));
}

#[tokio::test]
async fn test_unrelated_draws_do_not_share_buckets() {
    let engine = LimitEngineService::default();
    let rule_id = engine
        .create_rule(LimitRuleSpec {
            draw_ids: draws(&[5, 6]),
            ..by_number_rule(7, 5, "23", 100.0)
        })
        .await
        .unwrap();

    let on_five = wager(5, "23", 100.0, 7);
    let matches = engine.resolve(&on_five).await;
    engine.try_admit(&on_five, &matches).await.unwrap();

    // draw 6 has its own bucket under the same rule
    let on_six = wager(6, "23", 100.0, 7);
    let matches = engine.resolve(&on_six).await;
    assert!(engine.try_admit(&on_six, &matches).await.unwrap().is_accepted());

    let avail = engine
        .remaining(RuleRef::Rule(rule_id), DrawId(6), monday(), BetField::Directo)
        .await
        .unwrap();
    assert!(avail.is_blocked);
}

#[tokio::test]
async fn test_rejected_admission_names_most_specific_rule() {
    let engine = LimitEngineService::default();
    let narrow = engine
        .create_rule(by_number_rule(7, 5, "23", 50.0))
        .await
        .unwrap();
    engine
        .create_rule(LimitRuleSpec {
            scope: LimitScope::Absolute,
            number_pattern: None,
            ..by_number_rule(7, 5, "23", 50.0)
        })
        .await
        .unwrap();

    // both ceilings are exceeded; blame goes to the by-number rule
    let w = wager(5, "23", 60.0, 7);
    let matches = engine.resolve(&w).await;
    assert_eq!(matches.len(), 2);
    assert_eq!(
        engine.try_admit(&w, &matches).await.unwrap(),
        Admission::Rejected {
            violated: RuleRef::Rule(narrow)
        }
    );
}
