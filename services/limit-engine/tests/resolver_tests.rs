//! Resolver matching and specificity ranking

use chrono::NaiveDate;
use limit_engine::{
    EngineConfig, LimitEngine, LimitEngineService, LimitRuleSpec, LimitScope, NumberPattern,
    PatternSemantics, RuleRef, Wager,
};
use rustc_hash::{FxHashMap, FxHashSet};
use services_common::{
    Amount, BetField, BettingPoolId, DayOfWeekMask, DrawId, ExternalGroupId, GroupId, ZoneId,
};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 17).unwrap()
}

fn draws(ids: &[u32]) -> FxHashSet<DrawId> {
    ids.iter().map(|&d| DrawId(d)).collect()
}

fn ceilings(field: BetField, ceiling: f64) -> FxHashMap<BetField, Amount> {
    let mut map = FxHashMap::default();
    map.insert(field, Amount::new(ceiling));
    map
}

fn spec(scope: LimitScope, pattern: Option<&str>) -> LimitRuleSpec {
    LimitRuleSpec {
        name: None,
        scope,
        draw_ids: draws(&[5]),
        days: DayOfWeekMask::ALL,
        number_pattern: pattern.map(|p| NumberPattern::new(p).unwrap()),
        ceilings: ceilings(BetField::Directo, 100.0),
        effective_from: None,
        effective_to: None,
    }
}

fn full_wager() -> Wager {
    Wager {
        draw_id: DrawId(5),
        bet_number: "23".to_string(),
        field: BetField::Directo,
        amount: Amount::new(10.0),
        betting_pool_id: BettingPoolId(7),
        zone_id: Some(ZoneId(3)),
        group_id: Some(GroupId(2)),
        external_group_id: Some(ExternalGroupId(9)),
        date: monday(),
    }
}

#[tokio::test]
async fn test_matches_are_ordered_most_specific_first() {
    let engine = LimitEngineService::default();
    // created loosest-first on purpose; the resolver must re-rank
    let absolute = engine
        .create_rule(spec(LimitScope::Absolute, None))
        .await
        .unwrap();
    let gen_ext = engine
        .create_rule(spec(
            LimitScope::GeneralForExternalGroup(ExternalGroupId(9)),
            None,
        ))
        .await
        .unwrap();
    let gen_group = engine
        .create_rule(spec(LimitScope::GeneralForGroup(GroupId(2)), None))
        .await
        .unwrap();
    let gen_zone = engine
        .create_rule(spec(LimitScope::GeneralForZone(ZoneId(3)), None))
        .await
        .unwrap();
    let gen_pool = engine
        .create_rule(spec(LimitScope::GeneralForBettingPool(BettingPoolId(7)), None))
        .await
        .unwrap();
    let local_pool = engine
        .create_rule(spec(LimitScope::LocalForBettingPool(BettingPoolId(7)), None))
        .await
        .unwrap();
    let num_zone = engine
        .create_rule(spec(LimitScope::ByNumberForZone(ZoneId(3)), Some("23")))
        .await
        .unwrap();
    let num_pool = engine
        .create_rule(spec(
            LimitScope::ByNumberForBettingPool(BettingPoolId(7)),
            Some("23"),
        ))
        .await
        .unwrap();

    let matches = engine.resolve(&full_wager()).await;
    let order: Vec<RuleRef> = matches.iter().map(|m| m.rule).collect();
    assert_eq!(
        order,
        vec![
            RuleRef::Rule(num_pool),
            RuleRef::Rule(num_zone),
            RuleRef::Rule(local_pool),
            RuleRef::Rule(gen_pool),
            RuleRef::Rule(gen_zone),
            RuleRef::Rule(gen_group),
            RuleRef::Rule(gen_ext),
            RuleRef::Rule(absolute),
        ]
    );
}

#[tokio::test]
async fn test_scope_ref_mismatch_excludes_rule() {
    let engine = LimitEngineService::default();
    engine
        .create_rule(spec(LimitScope::GeneralForBettingPool(BettingPoolId(8)), None))
        .await
        .unwrap();
    engine
        .create_rule(spec(LimitScope::GeneralForZone(ZoneId(4)), None))
        .await
        .unwrap();

    assert!(engine.resolve(&full_wager()).await.is_empty());
}

#[tokio::test]
async fn test_wager_without_group_skips_group_rules() {
    let engine = LimitEngineService::default();
    engine
        .create_rule(spec(LimitScope::GeneralForGroup(GroupId(2)), None))
        .await
        .unwrap();

    let mut wager = full_wager();
    wager.group_id = None;
    assert!(engine.resolve(&wager).await.is_empty());
}

#[tokio::test]
async fn test_rule_without_wagered_field_is_skipped() {
    let engine = LimitEngineService::default();
    let mut rule = spec(LimitScope::Absolute, None);
    rule.ceilings = ceilings(BetField::Pale1, 100.0);
    engine.create_rule(rule).await.unwrap();

    // wager is on directo; the pale-only rule contributes nothing
    assert!(engine.resolve(&full_wager()).await.is_empty());
}

#[tokio::test]
async fn test_weekday_and_window_gate_matching() {
    let engine = LimitEngineService::default();
    let mut rule = spec(LimitScope::Absolute, None);
    rule.days = DayOfWeekMask::from_days(&[chrono::Weekday::Tue]);
    engine.create_rule(rule).await.unwrap();

    let mut expired = spec(LimitScope::Absolute, None);
    expired.effective_to = NaiveDate::from_ymd_opt(2026, 1, 1);
    engine.create_rule(expired).await.unwrap();

    // monday wager: one rule is tuesday-only, the other expired in january
    assert!(engine.resolve(&full_wager()).await.is_empty());
}

#[tokio::test]
async fn test_wildcard_pattern_matches_exact_semantics() {
    let engine = LimitEngineService::default();
    engine
        .create_rule(spec(
            LimitScope::ByNumberForBettingPool(BettingPoolId(7)),
            Some("2#"),
        ))
        .await
        .unwrap();

    let mut wager = full_wager();
    wager.bet_number = "29".to_string();
    assert_eq!(engine.resolve(&wager).await.len(), 1);

    wager.bet_number = "39".to_string();
    assert!(engine.resolve(&wager).await.is_empty());

    // exact semantics: a longer number never matches a two-digit pattern
    wager.bet_number = "2945".to_string();
    assert!(engine.resolve(&wager).await.is_empty());
}

#[tokio::test]
async fn test_prefix_semantics_match_longer_numbers() {
    let engine = LimitEngineService::new(EngineConfig {
        pattern_semantics: PatternSemantics::Prefix,
        ..EngineConfig::default()
    });
    engine
        .create_rule(spec(
            LimitScope::ByNumberForBettingPool(BettingPoolId(7)),
            Some("23"),
        ))
        .await
        .unwrap();

    let mut wager = full_wager();
    wager.bet_number = "2345".to_string();
    assert_eq!(engine.resolve(&wager).await.len(), 1);

    wager.bet_number = "3245".to_string();
    assert!(engine.resolve(&wager).await.is_empty());
}

#[tokio::test]
async fn test_hot_match_requires_registry_membership() {
    let engine = LimitEngineService::default();
    engine
        .create_hot_limit(limit_engine::HotNumberLimitSpec {
            draw_ids: draws(&[5]),
            ceilings: ceilings(BetField::Directo, 30.0),
        })
        .await
        .unwrap();

    // not hot yet
    assert!(engine.resolve(&full_wager()).await.is_empty());

    engine.replace_hot_numbers(&[23]).await;
    let matches = engine.resolve(&full_wager()).await;
    assert_eq!(matches.len(), 1);
    assert!(matches!(matches[0].rule, RuleRef::Hot(_)));

    // wholesale replacement removes membership
    engine.replace_hot_numbers(&[55]).await;
    assert!(engine.resolve(&full_wager()).await.is_empty());
}
