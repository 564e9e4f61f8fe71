//! Limit engine configuration

use serde::{Deserialize, Serialize};
use services_common::constants;

/// How a rule's bet-number pattern is compared against a wager's bet number.
///
/// Bet numbers vary in length across play types (two-digit directo,
/// four-digit pale), so both readings are supported per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PatternSemantics {
    /// Pattern and bet number must have the same length; `#` matches any digit
    #[default]
    Exact,
    /// Pattern constrains the leading digits of the bet number
    Prefix,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pattern matching semantics
    pub pattern_semantics: PatternSemantics,

    /// Consumption percentage that triggers a near-limit warning log
    pub near_limit_warn_pct: u8,

    /// Upper bound on pattern concrete-space enumeration for
    /// blocked-number queries
    pub max_enumeration: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pattern_semantics: PatternSemantics::Exact,
            near_limit_warn_pct: constants::NEAR_LIMIT_WARN_PCT,
            max_enumeration: 10_000,
        }
    }
}
