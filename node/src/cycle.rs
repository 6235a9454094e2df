//! State shared by the steps of one orchestration cycle, and the bid
//! submission path both strategies go through.

use std::sync::Arc;

use stakeward_chain::{
    BidRequest, ChainError, SecretProvider, Seed, TransactionId, Transfer, ValidatorNode, Wallet,
};
use stakeward_registry::{ElectionRegistry, RegistryStore};
use stakeward_telemetry::{Category, TelemetryRecord, TelemetrySink};
use stakeward_types::{
    Address, Clock, Election, ElectionId, NanoTokens, Timestamp, ValidatorKeys,
};

use crate::metrics::DaemonMetrics;
use crate::report::CycleReport;
use crate::NodeError;

/// Everything the loop talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub node: Arc<dyn ValidatorNode>,
    pub wallet: Arc<dyn Wallet>,
    pub secrets: Arc<dyn SecretProvider>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub store: Arc<dyn RegistryStore>,
    pub clock: Arc<dyn Clock>,
}

/// Snapshot taken at the start of a cycle plus the mutable registry.
pub(crate) struct Cycle<'a> {
    pub deps: &'a Collaborators,
    pub registry: &'a mut ElectionRegistry,
    pub report: &'a mut CycleReport,
    pub metrics: Option<&'a DaemonMetrics>,
    pub now: Timestamp,
    pub validator: Address,
    pub seed: Seed,
    pub elector: Address,
    pub open_ids: Vec<ElectionId>,
    pub balance: NanoTokens,
    /// Stake returned by recovery earlier in this cycle.
    pub recovered: NanoTokens,
}

impl Cycle<'_> {
    pub fn is_open(&self, id: &ElectionId) -> bool {
        self.open_ids.iter().any(|open| open.as_str() == id.as_str())
    }

    pub fn emit(&self, category: Category, record: TelemetryRecord) {
        self.deps.telemetry.send(category, record);
    }

    /// Submit `transfer` from the validator wallet and collect every
    /// custodian confirmation.
    pub fn submit_confirmed(&self, transfer: &Transfer) -> Result<TransactionId, ChainError> {
        let wallet = &self.deps.wallet;
        let tx = wallet.submit_transaction(transfer, &self.seed)?;
        tracing::debug!(
            tx = %tx,
            dest = %transfer.dest,
            value = %transfer.value,
            "transaction submitted"
        );
        for seed in self.deps.secrets.custodian_seeds()? {
            wallet.confirm_transaction(&transfer.from, &tx, &seed)?;
        }
        Ok(tx)
    }

    /// Release keys, logging instead of failing.
    pub fn release_keys(&self, election_id: &ElectionId, keys: &ValidatorKeys) {
        if let Err(e) = self.deps.node.release_keys(keys) {
            tracing::warn!(election_id = %election_id, error = %e, "failed to release validator keys");
        }
    }
}

/// Where a bid goes and who it names as beneficiary.
pub(crate) struct BidPlan<'p> {
    pub beneficiary: &'p Address,
    pub dest: &'p Address,
    /// Value carried by the transfer: the stake itself, or a fee for pools.
    pub value: NanoTokens,
    pub max_factor: f64,
}

/// Run the full bid sequence for `election` and return the keys it should
/// hold afterwards.
///
/// Keys are generated and the election window prepared when the record has
/// none. On any failure, keys generated here are released and the error is
/// returned as [`NodeError::PartialSubmission`].
pub(crate) fn place_bid(
    cycle: &Cycle<'_>,
    election: &Election,
    plan: &BidPlan<'_>,
) -> Result<ValidatorKeys, NodeError> {
    let partial = |source| NodeError::PartialSubmission {
        election_id: election.id().clone(),
        source,
    };
    let (keys, generated) = match election.keys() {
        Some(keys) => (keys.clone(), false),
        None => (generate_keys(cycle, election.id()).map_err(partial)?, true),
    };

    match bid_with_keys(cycle, election, &keys, generated, plan) {
        Ok(()) => Ok(keys),
        Err(source) => {
            if generated {
                cycle.release_keys(election.id(), &keys);
            }
            Err(partial(source))
        }
    }
}

fn generate_keys(cycle: &Cycle<'_>, election_id: &ElectionId) -> Result<ValidatorKeys, ChainError> {
    let node = &cycle.deps.node;
    let key = node.new_key()?;
    match node.new_key() {
        Ok(adnl_key) => Ok(ValidatorKeys { key, adnl_key }),
        Err(e) => {
            let half = ValidatorKeys {
                key,
                adnl_key: String::new(),
            };
            cycle.release_keys(election_id, &half);
            Err(e)
        }
    }
}

fn bid_with_keys(
    cycle: &Cycle<'_>,
    election: &Election,
    keys: &ValidatorKeys,
    prepare: bool,
    plan: &BidPlan<'_>,
) -> Result<(), ChainError> {
    let node = &cycle.deps.node;
    let params = match election.params() {
        Some(params) => Some(*params),
        None => node.elector_params()?,
    };
    let stop = params
        .and_then(|p| election.stop_time(&p))
        .ok_or_else(|| ChainError::Data(format!("cannot derive stop time for election {}", election.id())))?;

    if prepare {
        let start = election
            .id()
            .as_unix()
            .ok_or_else(|| ChainError::Data(format!("non-numeric election id {}", election.id())))?;
        node.prepare_election(keys, start, stop)?;
    }

    let bid = BidRequest {
        election_id: election.id(),
        election_stop: stop,
        adnl_key: &keys.adnl_key,
        beneficiary: plan.beneficiary,
        max_factor: plan.max_factor,
    };
    let request = node.generate_validation_request(&bid)?;
    let signature = node.sign_request(&keys.key, &request)?;
    let payload = node.generate_validation_signed(&bid, &signature)?;

    let transfer = Transfer {
        from: cycle.validator.clone(),
        dest: plan.dest.clone(),
        value: plan.value,
        bounce: true,
        payload,
    };
    let tx = cycle.submit_confirmed(&transfer)?;
    tracing::info!(
        election_id = %election.id(),
        tx = %tx,
        beneficiary = %plan.beneficiary,
        "election bid submitted"
    );
    Ok(())
}
