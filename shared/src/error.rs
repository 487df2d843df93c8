use thiserror::Error;

/// Errors raised while turning user input into domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid signal type: {0} (expected BUY or SELL)")]
    InvalidSide(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("invalid month: {0} (expected YYYY-MM)")]
    InvalidMonth(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}
