//! Limit rule and hot-number limit representation

use chrono::{Datelike, NaiveDate};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use services_common::{
    Amount, BetField, BettingPoolId, DayOfWeekMask, DrawId, ExternalGroupId, GroupId, HotLimitId,
    LimitError, RuleId, ZoneId,
};
use std::fmt;

use crate::config::PatternSemantics;

/// Reference to either a limit rule or a hot-number limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleRef {
    /// A configured `LimitRule`
    Rule(RuleId),
    /// A configured `HotNumberLimit`
    Hot(HotLimitId),
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule(id) => write!(f, "{id}"),
            Self::Hot(id) => write!(f, "{id}"),
        }
    }
}

/// Organizational scope of a limit rule. The scope-ref id lives inside the
/// variant, so a rule whose scope requires one cannot be built without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitScope {
    /// Backstop that applies to every wager regardless of organization
    Absolute,
    /// General ceiling for one group
    GeneralForGroup(GroupId),
    /// Per-number ceiling for one group
    ByNumberForGroup(GroupId),
    /// General ceiling for one external group
    GeneralForExternalGroup(ExternalGroupId),
    /// Per-number ceiling for one external group
    ByNumberForExternalGroup(ExternalGroupId),
    /// General ceiling for one zone
    GeneralForZone(ZoneId),
    /// Per-number ceiling for one zone
    ByNumberForZone(ZoneId),
    /// General ceiling for one betting pool
    GeneralForBettingPool(BettingPoolId),
    /// Per-number ceiling for one betting pool
    ByNumberForBettingPool(BettingPoolId),
    /// Local (per-terminal sales) ceiling for one betting pool
    LocalForBettingPool(BettingPoolId),
}

impl LimitScope {
    /// Ranking used to pick the blamed rule when several ceilings are
    /// exceeded at once. Higher is tighter. Hot-number limits rank 1,
    /// between `Absolute` and every scoped rule.
    #[must_use]
    pub const fn specificity(&self) -> u8 {
        match self {
            Self::ByNumberForBettingPool(_) => 10,
            Self::ByNumberForZone(_) => 9,
            Self::ByNumberForGroup(_) => 8,
            Self::ByNumberForExternalGroup(_) => 7,
            Self::LocalForBettingPool(_) => 6,
            Self::GeneralForBettingPool(_) => 5,
            Self::GeneralForZone(_) => 4,
            Self::GeneralForGroup(_) => 3,
            Self::GeneralForExternalGroup(_) => 2,
            Self::Absolute => 0,
        }
    }

    /// Whether this scope matches against the wager's bet number
    #[must_use]
    pub const fn is_by_number(&self) -> bool {
        matches!(
            self,
            Self::ByNumberForGroup(_)
                | Self::ByNumberForExternalGroup(_)
                | Self::ByNumberForZone(_)
                | Self::ByNumberForBettingPool(_)
        )
    }
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::GeneralForGroup(id) => write!(f, "general/group_{}", id.0),
            Self::ByNumberForGroup(id) => write!(f, "by_number/group_{}", id.0),
            Self::GeneralForExternalGroup(id) => write!(f, "general/ext_group_{}", id.0),
            Self::ByNumberForExternalGroup(id) => write!(f, "by_number/ext_group_{}", id.0),
            Self::GeneralForZone(id) => write!(f, "general/zone_{}", id.0),
            Self::ByNumberForZone(id) => write!(f, "by_number/zone_{}", id.0),
            Self::GeneralForBettingPool(id) => write!(f, "general/pool_{}", id.0),
            Self::ByNumberForBettingPool(id) => write!(f, "by_number/pool_{}", id.0),
            Self::LocalForBettingPool(id) => write!(f, "local/pool_{}", id.0),
        }
    }
}

/// Bet-number pattern: literal digits and `#` wildcards.
///
/// A pattern of all `#` of length N matches any N-digit number; a pattern
/// with no `#` is a literal match. Mixed patterns constrain individual
/// positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct NumberPattern(String);

impl TryFrom<String> for NumberPattern {
    type Error = LimitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl NumberPattern {
    /// Parse a pattern; only digits and `#` are allowed
    pub fn new(pattern: &str) -> Result<Self, LimitError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(LimitError::InvalidRule(
                "number pattern must not be empty".to_string(),
            ));
        }
        if !pattern.chars().all(|c| c.is_ascii_digit() || c == '#') {
            return Err(LimitError::InvalidRule(format!(
                "number pattern '{pattern}' may contain only digits and '#'"
            )));
        }
        Ok(Self(pattern.to_string()))
    }

    /// Pattern text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Match a bet number under the configured semantics
    #[must_use]
    pub fn matches(&self, bet_number: &str, semantics: PatternSemantics) -> bool {
        let number = bet_number.trim();
        if !number.chars().all(|c| c.is_ascii_digit()) || number.is_empty() {
            return false;
        }
        match semantics {
            PatternSemantics::Exact => {
                number.len() == self.0.len() && Self::positions_match(&self.0, number)
            }
            PatternSemantics::Prefix => {
                number.len() >= self.0.len() && Self::positions_match(&self.0, &number[..self.0.len()])
            }
        }
    }

    fn positions_match(pattern: &str, digits: &str) -> bool {
        pattern
            .chars()
            .zip(digits.chars())
            .all(|(p, d)| p == '#' || p == d)
    }

    /// Number of wildcard positions
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.0.chars().filter(|&c| c == '#').count()
    }

    /// Enumerate the pattern's concrete number space (wildcards filled with
    /// 0-9). Returns `None` when the space exceeds `cap`, so callers never
    /// iterate blindly over an unbounded range.
    #[must_use]
    pub fn concrete_numbers(&self, cap: usize) -> Option<Vec<String>> {
        let wildcards = self.wildcard_count();
        if wildcards > 12 {
            return None;
        }
        let space = 10usize.checked_pow(u32::try_from(wildcards).ok()?)?;
        if space > cap {
            return None;
        }

        let mut out = Vec::with_capacity(space);
        let template: Vec<char> = self.0.chars().collect();
        for combo in 0..space {
            let mut digits = combo;
            let mut number = String::with_capacity(template.len());
            for &c in &template {
                if c == '#' {
                    let d = digits % 10;
                    digits /= 10;
                    number.push(char::from_digit(u32::try_from(d).ok()?, 10)?);
                } else {
                    number.push(c);
                }
            }
            out.push(number);
        }
        out.sort_unstable();
        Some(out)
    }
}

impl fmt::Display for NumberPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configured betting-limit rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitRule {
    /// Rule identifier
    pub id: RuleId,
    /// Optional administrative name, used in listings and log lines
    pub name: Option<String>,
    /// Organizational scope
    pub scope: LimitScope,
    /// Draws this rule applies to
    pub draw_ids: FxHashSet<DrawId>,
    /// Weekdays this rule applies on
    pub days: DayOfWeekMask,
    /// Bet-number pattern; required for by-number scopes
    pub number_pattern: Option<NumberPattern>,
    /// Ceiling per bet-type field; an absent field is unconstrained
    pub ceilings: FxHashMap<BetField, Amount>,
    /// Start of the validity window (inclusive); open when absent
    pub effective_from: Option<NaiveDate>,
    /// End of the validity window (inclusive); open when absent
    pub effective_to: Option<NaiveDate>,
}

impl LimitRule {
    /// Whether this rule applies to the given draw on the given date
    #[must_use]
    pub fn is_active_on(&self, draw_id: DrawId, date: NaiveDate) -> bool {
        self.draw_ids.contains(&draw_id)
            && self.days.contains(date.weekday())
            && self.effective_from.is_none_or(|from| date >= from)
            && self.effective_to.is_none_or(|to| date <= to)
    }
}

/// Everything needed to create a `LimitRule`, before an id is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitRuleSpec {
    pub name: Option<String>,
    pub scope: LimitScope,
    pub draw_ids: FxHashSet<DrawId>,
    #[serde(default)]
    pub days: DayOfWeekMask,
    pub number_pattern: Option<NumberPattern>,
    pub ceilings: FxHashMap<BetField, Amount>,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
}

impl LimitRuleSpec {
    /// Validate the spec; `InvalidRule` on any malformed configuration
    pub fn validate(&self) -> Result<(), LimitError> {
        if self.scope.is_by_number() && self.number_pattern.is_none() {
            return Err(LimitError::InvalidRule(format!(
                "scope {} requires a number pattern",
                self.scope
            )));
        }
        if self.draw_ids.is_empty() {
            return Err(LimitError::InvalidRule(
                "rule must target at least one draw".to_string(),
            ));
        }
        if self.ceilings.is_empty() {
            return Err(LimitError::InvalidRule(
                "rule must constrain at least one bet-type field".to_string(),
            ));
        }
        if let Some((field, amount)) = self.ceilings.iter().find(|(_, a)| a.is_negative()) {
            return Err(LimitError::InvalidRule(format!(
                "ceiling for {field} is negative ({amount})"
            )));
        }
        if let (Some(from), Some(to)) = (self.effective_from, self.effective_to) {
            if from > to {
                return Err(LimitError::InvalidRule(format!(
                    "validity window is inverted ({from} > {to})"
                )));
            }
        }
        if self.days.is_empty() {
            return Err(LimitError::InvalidRule(
                "days-of-week mask has no day set".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the rule once an id has been assigned
    #[must_use]
    pub fn into_rule(self, id: RuleId) -> LimitRule {
        LimitRule {
            id,
            name: self.name,
            scope: self.scope,
            draw_ids: self.draw_ids,
            days: self.days,
            number_pattern: self.number_pattern,
            ceilings: self.ceilings,
            effective_from: self.effective_from,
            effective_to: self.effective_to,
        }
    }
}

/// Override ceilings for numbers flagged hot, per draw
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotNumberLimit {
    /// Limit identifier
    pub id: HotLimitId,
    /// Draws this limit applies to
    pub draw_ids: FxHashSet<DrawId>,
    /// Ceiling per bet-type field while the number is hot
    pub ceilings: FxHashMap<BetField, Amount>,
}

/// Everything needed to create a `HotNumberLimit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotNumberLimitSpec {
    pub draw_ids: FxHashSet<DrawId>,
    pub ceilings: FxHashMap<BetField, Amount>,
}

impl HotNumberLimitSpec {
    /// Validate the spec
    pub fn validate(&self) -> Result<(), LimitError> {
        if self.draw_ids.is_empty() {
            return Err(LimitError::InvalidRule(
                "hot-number limit must target at least one draw".to_string(),
            ));
        }
        if self.ceilings.is_empty() {
            return Err(LimitError::InvalidRule(
                "hot-number limit must constrain at least one bet-type field".to_string(),
            ));
        }
        if let Some((field, amount)) = self.ceilings.iter().find(|(_, a)| a.is_negative()) {
            return Err(LimitError::InvalidRule(format!(
                "ceiling for {field} is negative ({amount})"
            )));
        }
        Ok(())
    }

    /// Build the limit once an id has been assigned
    #[must_use]
    pub fn into_limit(self, id: HotLimitId) -> HotNumberLimit {
        HotNumberLimit {
            id,
            draw_ids: self.draw_ids,
            ceilings: self.ceilings,
        }
    }
}
