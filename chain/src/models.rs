//! Data returned by chain collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

use stakeward_types::{Address, ElectionId, NanoTokens};

/// How far the node lags behind the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncLag {
    Seconds(i64),
    /// The node answered but did not report a lag (still booting).
    Unknown,
}

impl SyncLag {
    /// Whether the lag is known and within `max_secs`.
    pub fn is_within(&self, max_secs: i64) -> bool {
        match self {
            SyncLag::Seconds(lag) => *lag <= max_secs,
            SyncLag::Unknown => false,
        }
    }
}

impl fmt::Display for SyncLag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncLag::Seconds(lag) => write!(f, "{lag}s"),
            SyncLag::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub acc_type: String,
    pub balance: NanoTokens,
}

/// Multisig transaction id returned by `submitTransaction`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signature over a validation request, as produced by the node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestSignature {
    pub public_key: String,
    pub signature: String,
}

/// Event emitted by a staking pool contract, newest last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolEvent {
    pub id: String,
    /// Unix time the event was emitted.
    pub created_at: u64,
    pub kind: PoolEventKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEventKind {
    /// The pool asks its validator to sign a bid for `election_id` through `proxy`.
    StakeSigningRequested {
        election_id: ElectionId,
        proxy: Address,
    },
    /// The pool needs `replenishment` more to keep paying for ticktocks.
    TooLowBalance { replenishment: NanoTokens },
    Other(String),
}

/// State of a staking pool (`getDePoolInfo`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolInfo {
    pub closed: bool,
    pub proxies: Vec<Address>,
    pub validator_wallet: Address,
}
