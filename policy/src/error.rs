use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid stake expression {0:?}: expected a percentage like \"30%\" or a token amount")]
    InvalidExpression(String),

    #[error("stake percentage {0} is outside 0..=100")]
    PercentageOutOfRange(String),

    #[error("invalid join threshold {0}: expected 0..=100")]
    InvalidThreshold(u8),
}
