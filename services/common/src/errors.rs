//! Common error types for the limit engine

use thiserror::Error;

/// Limit engine error taxonomy
#[derive(Debug, Error)]
pub enum LimitError {
    /// Malformed rule configuration, rejected at creation and never stored
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Rule vanished between resolution and admission; benign race,
    /// the rule is treated as no longer applying
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// Numeric or consistency corruption; the operation aborts without
    /// any partial state change
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// `release` called for an admission that was never committed or was
    /// already released; caller error, nothing is mutated
    #[error("Release does not correspond to a committed admission")]
    ReleaseNotCommitted,
}
