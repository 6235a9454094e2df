//! Protocol parameters read from chain config.

use serde::{Deserialize, Serialize};

use crate::NanoTokens;

/// Minimum and maximum stake a single bid may carry (config param 17).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeBounds {
    pub min_stake: NanoTokens,
    pub max_stake: NanoTokens,
}

/// Validator set size limits (config param 16).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSetParams {
    pub max_validators: u32,
    pub max_main_validators: u32,
    pub min_validators: u32,
}
