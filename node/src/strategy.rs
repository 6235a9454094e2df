//! How the node takes part in elections, chosen once at startup.

use stakeward_policy::top_competitors;
use stakeward_types::{Election, NanoTokens};

use crate::config::{ElectionModeSetting, ElectionSettings};
use crate::cycle::Cycle;
use crate::direct::DirectStrategy;
use crate::pool::PoolStrategy;
use crate::NodeError;

pub enum Strategy {
    /// Bids funded from the validator wallet.
    Direct(DirectStrategy),
    /// Bids made on behalf of staking pools.
    Pool(PoolStrategy),
}

impl Strategy {
    /// `None` when elections are switched off.
    pub fn from_settings(settings: &ElectionSettings) -> Result<Option<Self>, NodeError> {
        settings.validate()?;
        let strategy = match settings.mode {
            ElectionModeSetting::Off => return Ok(None),
            ElectionModeSetting::Validator => Strategy::Direct(DirectStrategy::new(settings)),
            ElectionModeSetting::Depool => Strategy::Pool(PoolStrategy::new(settings)),
        };
        Ok(Some(strategy))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Direct(_) => "validator",
            Strategy::Pool(_) => "depool",
        }
    }

    pub(crate) fn join(&mut self, cycle: &mut Cycle<'_>, batch: Vec<Election>) -> Result<(), NodeError> {
        match self {
            Strategy::Direct(direct) => direct.join(cycle, batch),
            Strategy::Pool(pool) => pool.join(cycle, batch),
        }
    }
}

/// Stakes already bid in the open election, narrowed to the top validator
/// slots.
pub(crate) struct Competition {
    pub slots: usize,
    pub stakes: Vec<NanoTokens>,
}

impl Competition {
    /// Without validator set limits there is nothing to compare against.
    pub fn fetch(cycle: &Cycle<'_>) -> Result<Self, NodeError> {
        let node = &cycle.deps.node;
        let Some(set) = node.validator_set_params()? else {
            return Ok(Self {
                slots: usize::MAX,
                stakes: Vec::new(),
            });
        };
        let slots = set.max_validators as usize;
        let stakes = top_competitors(node.participant_stakes(&cycle.elector)?, slots);
        Ok(Self { slots, stakes })
    }
}
