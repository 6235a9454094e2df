//! Top-level error type shared across crates.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid token amount: {0}")]
    InvalidAmount(String),

    #[error("election {election_id} already runs in {current} mode, refusing {requested}")]
    ModeAlreadySet {
        election_id: String,
        current: String,
        requested: String,
    },

    #[error("election {0} must carry both validator keys or neither")]
    PartialKeys(String),
}
