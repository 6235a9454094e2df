//! The election record persisted in the registry.
//!
//! An election is one stake auction, identified by the chain-reported id (the
//! unix time the validation round starts). The record carries everything the
//! orchestration loop needs to resume after a restart: the keys it generated,
//! the stake it committed, how it participated, and the protocol timing
//! constants needed to derive the current phase from wall-clock time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, NanoTokens, Timestamp, TypesError};

/// Election identifier exactly as reported by the chain.
///
/// Membership checks compare the string form; the numeric value is only used
/// for phase arithmetic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectionId(String);

impl ElectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id (decimal, or hex with a `0x` prefix).
    pub fn as_unix(&self) -> Option<u64> {
        match self.0.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => self.0.parse().ok(),
        }
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElectionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for ElectionId {
    fn from(v: u64) -> Self {
        Self(v.to_string())
    }
}

/// How the node took part in an election.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElectionMode {
    /// Bid submitted straight from the validator wallet.
    Validator,
    /// Bid submitted on behalf of a delegated staking pool.
    Depool,
}

impl ElectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionMode::Validator => "VALIDATOR",
            ElectionMode::Depool => "DEPOOL",
        }
    }
}

impl fmt::Display for ElectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol timing constants for an election round (config param 15).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionParams {
    pub validators_elected_for: u64,
    pub elections_start_before: u64,
    pub elections_end_before: u64,
    pub stake_held_for: u64,
}

/// Phase of an election, derived from its params and the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ElectionPhase {
    /// Bids are being accepted.
    Elections,
    /// The elected set is validating.
    Validation,
    /// Validation is over, stakes are still frozen.
    Freeze,
    /// Stakes and rewards can be recovered.
    Reward,
}

impl fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElectionPhase::Elections => "elections",
            ElectionPhase::Validation => "validation",
            ElectionPhase::Freeze => "freeze",
            ElectionPhase::Reward => "reward",
        };
        f.write_str(s)
    }
}

/// Handles of the permanent and ADNL keys registered on the validator node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorKeys {
    pub key: String,
    pub adnl_key: String,
}

/// One election the node is taking (or has taken) part in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ElectionRecord", into = "ElectionRecord")]
pub struct Election {
    id: ElectionId,
    elector_addr: Address,
    keys: Option<ValidatorKeys>,
    stake: NanoTokens,
    restake: bool,
    mode: Option<ElectionMode>,
    depool_addr: Option<Address>,
    proxy_addr: Option<Address>,
    params: Option<ElectionParams>,
}

impl Election {
    /// Grace added to the end of the hold period when preparing the key
    /// validity window on the node.
    pub const STOP_TIME_GRACE_SECS: u64 = 1000;

    pub fn new(id: ElectionId, elector_addr: Address) -> Self {
        Self {
            id,
            elector_addr,
            keys: None,
            stake: NanoTokens::ZERO,
            restake: false,
            mode: None,
            depool_addr: None,
            proxy_addr: None,
            params: None,
        }
    }

    pub fn id(&self) -> &ElectionId {
        &self.id
    }

    pub fn elector_addr(&self) -> &Address {
        &self.elector_addr
    }

    pub fn keys(&self) -> Option<&ValidatorKeys> {
        self.keys.as_ref()
    }

    pub fn set_keys(&mut self, keys: ValidatorKeys) {
        self.keys = Some(keys);
    }

    /// Remove and return the keys, e.g. once they have been released on the node.
    pub fn take_keys(&mut self) -> Option<ValidatorKeys> {
        self.keys.take()
    }

    pub fn stake(&self) -> NanoTokens {
        self.stake
    }

    /// Stake only ever grows while the election is open.
    pub fn add_stake(&mut self, amount: NanoTokens) {
        self.stake += amount;
    }

    pub fn restake(&self) -> bool {
        self.restake
    }

    pub fn set_restake(&mut self, restake: bool) {
        self.restake = restake;
    }

    pub fn mode(&self) -> Option<ElectionMode> {
        self.mode
    }

    /// Set the participation mode. Setting the same mode again is a no-op;
    /// switching to a different one is refused.
    pub fn set_mode(&mut self, mode: ElectionMode) -> Result<(), TypesError> {
        match self.mode {
            None => {
                self.mode = Some(mode);
                Ok(())
            }
            Some(current) if current == mode => Ok(()),
            Some(current) => Err(TypesError::ModeAlreadySet {
                election_id: self.id.to_string(),
                current: current.to_string(),
                requested: mode.to_string(),
            }),
        }
    }

    pub fn depool_addr(&self) -> Option<&Address> {
        self.depool_addr.as_ref()
    }

    pub fn proxy_addr(&self) -> Option<&Address> {
        self.proxy_addr.as_ref()
    }

    /// Record the pool and proxy a delegated bid went through.
    pub fn set_pool(&mut self, depool: Address, proxy: Address) {
        self.depool_addr = Some(depool);
        self.proxy_addr = Some(proxy);
    }

    pub fn params(&self) -> Option<&ElectionParams> {
        self.params.as_ref()
    }

    pub fn set_params(&mut self, params: ElectionParams) {
        self.params = Some(params);
    }

    /// Current phase, or `None` when params are unknown or the id is not numeric.
    pub fn phase(&self, now: Timestamp) -> Option<ElectionPhase> {
        let params = self.params?;
        let start = self.id.as_unix()? as i128;
        let now = now.as_secs() as i128;
        let election_end = start - params.elections_end_before as i128;
        let validation_end = start + params.validators_elected_for as i128;
        let frozen_until = validation_end + params.stake_held_for as i128;
        let phase = if now > frozen_until {
            ElectionPhase::Reward
        } else if now > validation_end {
            ElectionPhase::Freeze
        } else if now > election_end {
            ElectionPhase::Validation
        } else {
            ElectionPhase::Elections
        };
        Some(phase)
    }

    /// Whether the election may leave the registry: its phase is `Reward`, or
    /// the phase cannot be derived at all.
    pub fn can_return(&self, now: Timestamp) -> bool {
        matches!(self.phase(now), None | Some(ElectionPhase::Reward))
    }

    /// Seconds until bids close; negative once closed. `None` without params.
    pub fn seconds_to_close(&self, now: Timestamp) -> Option<i64> {
        let params = self.params?;
        let start = self.id.as_unix()? as i64;
        Some(start - params.elections_end_before as i64 - now.as_secs() as i64)
    }

    /// End of the key validity window to register on the node.
    pub fn stop_time(&self, params: &ElectionParams) -> Option<u64> {
        let start = self.id.as_unix()?;
        Some(
            start
                + Self::STOP_TIME_GRACE_SECS
                + params.elections_start_before
                + params.validators_elected_for
                + params.elections_end_before
                + params.stake_held_for,
        )
    }
}

impl fmt::Display for Election {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.elector_addr.short())
    }
}

/// Durable representation of an [`Election`]; keeps the on-disk field names
/// stable and enforces the key-pair invariant on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ElectionRecord {
    id: ElectionId,
    elector_addr: Address,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    adnl_key: Option<String>,
    #[serde(default)]
    election_stake: NanoTokens,
    #[serde(default)]
    restake: bool,
    #[serde(default)]
    mode: Option<ElectionMode>,
    #[serde(default)]
    depool_addr: Option<Address>,
    #[serde(default)]
    proxy_addr: Option<Address>,
    #[serde(default)]
    election_params: Option<ElectionParams>,
}

impl TryFrom<ElectionRecord> for Election {
    type Error = TypesError;

    fn try_from(r: ElectionRecord) -> Result<Self, Self::Error> {
        let keys = match (r.key, r.adnl_key) {
            (Some(key), Some(adnl_key)) => Some(ValidatorKeys { key, adnl_key }),
            (None, None) => None,
            _ => return Err(TypesError::PartialKeys(r.id.to_string())),
        };
        Ok(Self {
            id: r.id,
            elector_addr: r.elector_addr,
            keys,
            stake: r.election_stake,
            restake: r.restake,
            mode: r.mode,
            depool_addr: r.depool_addr,
            proxy_addr: r.proxy_addr,
            params: r.election_params,
        })
    }
}

impl From<Election> for ElectionRecord {
    fn from(e: Election) -> Self {
        let (key, adnl_key) = match e.keys {
            Some(k) => (Some(k.key), Some(k.adnl_key)),
            None => (None, None),
        };
        Self {
            id: e.id,
            elector_addr: e.elector_addr,
            key,
            adnl_key,
            election_stake: e.stake,
            restake: e.restake,
            mode: e.mode,
            depool_addr: e.depool_addr,
            proxy_addr: e.proxy_addr,
            election_params: e.params,
        }
    }
}
