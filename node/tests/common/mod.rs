//! Shared wiring for the orchestration tests: every collaborator is a
//! nullable the test can configure and inspect.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use stakeward_node::{Collaborators, ElectionSettings, LoopSettings, Orchestrator, Strategy};
use stakeward_nullables::{
    MemoryStore, NullClock, NullSecrets, NullValidatorNode, NullWallet, RecordingTelemetry,
};
use stakeward_registry::ElectionRegistry;
use stakeward_types::{
    Address, Election, ElectionId, ElectionMode, ElectionParams, NanoTokens, StakeBounds,
    ValidatorKeys,
};

pub const VALIDATOR: &str = "-1:7777777777777777777777777777777777777777777777777777777777777777";
pub const ELECTOR: &str = "-1:3333333333333333333333333333333333333333333333333333333333333333";
pub const POOL: &str = "0:5555555555555555555555555555555555555555555555555555555555555555";
pub const PROXY: &str = "-1:9999999999999999999999999999999999999999999999999999999999999999";

/// Open election used by most scenarios; bids close at `ELECTION - 8192`.
pub const ELECTION: &str = "1700000000";
/// An election from an earlier round, long past its hold period at `NOW`.
pub const OLD_ELECTION: &str = "1600000000";
/// During the bidding phase of `ELECTION`.
pub const NOW: u64 = 1_699_990_000;

pub const SHORT: Duration = Duration::from_secs(120);
pub const LONG: Duration = Duration::from_secs(900);

pub fn tokens(n: u128) -> NanoTokens {
    NanoTokens::from_tokens(n)
}

pub fn params() -> ElectionParams {
    ElectionParams {
        validators_elected_for: 65536,
        elections_start_before: 32768,
        elections_end_before: 8192,
        stake_held_for: 32768,
    }
}

/// 10 to 500 tokens.
pub fn bounds() -> StakeBounds {
    StakeBounds {
        min_stake: tokens(10),
        max_stake: tokens(500),
    }
}

pub fn loop_settings() -> LoopSettings {
    LoopSettings {
        max_sync_diff: 30,
        short_interval: SHORT,
        long_interval: LONG,
        metrics_file: None,
    }
}

pub fn keys(n: u8) -> ValidatorKeys {
    ValidatorKeys {
        key: format!("{:064X}", 100 + n as u32),
        adnl_key: format!("{:064X}", 200 + n as u32),
    }
}

/// A direct election the node already bid on.
pub fn joined_election(id: &str, stake: NanoTokens) -> Election {
    let mut election = Election::new(ElectionId::new(id), Address::new(ELECTOR));
    election.set_params(params());
    election.set_keys(keys(1));
    election.add_stake(stake);
    election.set_mode(ElectionMode::Validator).unwrap();
    election
}

/// A pool election the node already bid on.
pub fn pool_election(id: &str, stake: NanoTokens) -> Election {
    let mut election = Election::new(ElectionId::new(id), Address::new(ELECTOR));
    election.set_params(params());
    election.set_keys(keys(2));
    election.add_stake(stake);
    election.set_mode(ElectionMode::Depool).unwrap();
    election.set_pool(Address::new(POOL), Address::new(PROXY));
    election
}

pub fn validator_settings() -> ElectionSettings {
    ElectionSettings::default()
}

pub struct Harness {
    pub node: Arc<NullValidatorNode>,
    pub wallet: Arc<NullWallet>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<NullClock>,
}

impl Harness {
    /// Synced node with `ELECTION` open, 1000 tokens in the validator wallet
    /// and an empty registry.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_registry(elections: Vec<Election>) -> Self {
        Self::with_store(MemoryStore::with_snapshot(ElectionRegistry::from_elections(
            elections,
        )))
    }

    fn with_store(store: MemoryStore) -> Self {
        let node = NullValidatorNode::new(ELECTOR);
        node.set_election_ids(&[ELECTION]);
        node.set_elector_params(params());
        node.set_stake_bounds(bounds());
        let wallet = NullWallet::new();
        wallet.set_balance(VALIDATOR, tokens(1000));
        Self {
            node: Arc::new(node),
            wallet: Arc::new(wallet),
            telemetry: Arc::new(RecordingTelemetry::new()),
            store: Arc::new(store),
            clock: Arc::new(NullClock::new(NOW)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            node: self.node.clone(),
            wallet: self.wallet.clone(),
            secrets: Arc::new(NullSecrets::new(VALIDATOR).with_custodians(&["custodian one"])),
            telemetry: self.telemetry.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn orchestrator(&self, settings: ElectionSettings) -> Orchestrator {
        let strategy = Strategy::from_settings(&settings).expect("valid settings");
        Orchestrator::new(loop_settings(), strategy, self.collaborators()).expect("registry loads")
    }
}
