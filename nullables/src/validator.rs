//! Nullable validator node.

use std::collections::HashMap;
use std::sync::Mutex;

use stakeward_chain::{BidRequest, ChainError, RequestSignature, SyncLag, ValidatorNode};
use stakeward_types::{
    Address, ElectionId, ElectionParams, NanoTokens, StakeBounds, ValidatorKeys,
    ValidatorSetParams,
};

/// Operations that can be told to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeOp {
    SyncTimeDiff,
    NewKey,
    ReleaseKeys,
    PrepareElection,
    ValidationRequest,
    SignRequest,
    ValidationSigned,
    ElectorAddress,
    ElectionIds,
    ElectorParams,
    ParticipantStakes,
    ValidatorSetParams,
    StakeBounds,
    ReturnedStakes,
    RecoverRequest,
}

/// A bid payload the node produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedBid {
    pub election_id: ElectionId,
    pub beneficiary: Address,
    pub adnl_key: String,
    pub election_stop: u64,
}

struct State {
    sync_lag: SyncLag,
    elector: Address,
    election_ids: Vec<ElectionId>,
    params: Option<ElectionParams>,
    validator_set: Option<ValidatorSetParams>,
    bounds: Option<StakeBounds>,
    participant_stakes: Vec<NanoTokens>,
    returned: HashMap<Address, Vec<NanoTokens>>,
    next_key: u32,
    live_keys: Vec<String>,
    released: Vec<ValidatorKeys>,
    prepared: Vec<(ValidatorKeys, u64, u64)>,
    bids: Vec<SubmittedBid>,
    recover_requests: usize,
    failures: HashMap<NodeOp, ChainError>,
}

/// In-memory validator node with a configurable elector.
pub struct NullValidatorNode {
    state: Mutex<State>,
}

impl NullValidatorNode {
    /// A synced node whose elector has no open election.
    pub fn new(elector: impl Into<Address>) -> Self {
        Self {
            state: Mutex::new(State {
                sync_lag: SyncLag::Seconds(0),
                elector: elector.into(),
                election_ids: Vec::new(),
                params: None,
                validator_set: None,
                bounds: None,
                participant_stakes: Vec::new(),
                returned: HashMap::new(),
                next_key: 0,
                live_keys: Vec::new(),
                released: Vec::new(),
                prepared: Vec::new(),
                bids: Vec::new(),
                recover_requests: 0,
                failures: HashMap::new(),
            }),
        }
    }

    pub fn set_sync_lag(&self, lag: SyncLag) {
        self.state.lock().unwrap().sync_lag = lag;
    }

    pub fn set_election_ids(&self, ids: &[&str]) {
        self.state.lock().unwrap().election_ids = ids.iter().map(|s| ElectionId::new(*s)).collect();
    }

    pub fn set_elector_params(&self, params: ElectionParams) {
        self.state.lock().unwrap().params = Some(params);
    }

    pub fn set_validator_set(&self, params: ValidatorSetParams) {
        self.state.lock().unwrap().validator_set = Some(params);
    }

    pub fn set_stake_bounds(&self, bounds: StakeBounds) {
        self.state.lock().unwrap().bounds = Some(bounds);
    }

    pub fn set_participant_stakes(&self, stakes: Vec<NanoTokens>) {
        self.state.lock().unwrap().participant_stakes = stakes;
    }

    /// Amounts `compute_returned_stakes` reports for `elector`.
    pub fn set_returned(&self, elector: impl Into<Address>, amounts: Vec<NanoTokens>) {
        self.state
            .lock()
            .unwrap()
            .returned
            .insert(elector.into(), amounts);
    }

    pub fn fail(&self, op: NodeOp, error: ChainError) {
        self.state.lock().unwrap().failures.insert(op, error);
    }

    pub fn clear_failure(&self, op: NodeOp) {
        self.state.lock().unwrap().failures.remove(&op);
    }

    /// Keys created and not yet released.
    pub fn live_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().live_keys.clone()
    }

    pub fn released(&self) -> Vec<ValidatorKeys> {
        self.state.lock().unwrap().released.clone()
    }

    pub fn prepared(&self) -> Vec<(ValidatorKeys, u64, u64)> {
        self.state.lock().unwrap().prepared.clone()
    }

    pub fn bids(&self) -> Vec<SubmittedBid> {
        self.state.lock().unwrap().bids.clone()
    }

    pub fn recover_requests(&self) -> usize {
        self.state.lock().unwrap().recover_requests
    }

    fn check(&self, op: NodeOp) -> Result<std::sync::MutexGuard<'_, State>, ChainError> {
        let state = self.state.lock().unwrap();
        match state.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(state),
        }
    }
}

impl ValidatorNode for NullValidatorNode {
    fn sync_time_diff(&self) -> Result<SyncLag, ChainError> {
        Ok(self.check(NodeOp::SyncTimeDiff)?.sync_lag)
    }

    fn new_key(&self) -> Result<String, ChainError> {
        let mut state = self.check(NodeOp::NewKey)?;
        state.next_key += 1;
        let key = format!("{:064X}", state.next_key);
        state.live_keys.push(key.clone());
        Ok(key)
    }

    fn release_keys(&self, keys: &ValidatorKeys) -> Result<(), ChainError> {
        let mut state = self.check(NodeOp::ReleaseKeys)?;
        state
            .live_keys
            .retain(|k| k != &keys.key && k != &keys.adnl_key);
        state.released.push(keys.clone());
        Ok(())
    }

    fn prepare_election(
        &self,
        keys: &ValidatorKeys,
        start: u64,
        stop: u64,
    ) -> Result<(), ChainError> {
        let mut state = self.check(NodeOp::PrepareElection)?;
        state.prepared.push((keys.clone(), start, stop));
        Ok(())
    }

    fn generate_validation_request(&self, bid: &BidRequest<'_>) -> Result<String, ChainError> {
        self.check(NodeOp::ValidationRequest)?;
        Ok(format!("request:{}:{}", bid.election_id, bid.adnl_key))
    }

    fn sign_request(&self, key: &str, request: &str) -> Result<RequestSignature, ChainError> {
        self.check(NodeOp::SignRequest)?;
        Ok(RequestSignature {
            public_key: format!("pub:{key}"),
            signature: format!("sig:{request}"),
        })
    }

    fn generate_validation_signed(
        &self,
        bid: &BidRequest<'_>,
        _signature: &RequestSignature,
    ) -> Result<String, ChainError> {
        let mut state = self.check(NodeOp::ValidationSigned)?;
        state.bids.push(SubmittedBid {
            election_id: bid.election_id.clone(),
            beneficiary: bid.beneficiary.clone(),
            adnl_key: bid.adnl_key.to_string(),
            election_stop: bid.election_stop,
        });
        Ok(format!("bid:{}", bid.election_id))
    }

    fn elector_address(&self) -> Result<Address, ChainError> {
        Ok(self.check(NodeOp::ElectorAddress)?.elector.clone())
    }

    fn election_ids(&self, _elector: &Address) -> Result<Vec<ElectionId>, ChainError> {
        Ok(self.check(NodeOp::ElectionIds)?.election_ids.clone())
    }

    fn elector_params(&self) -> Result<Option<ElectionParams>, ChainError> {
        Ok(self.check(NodeOp::ElectorParams)?.params)
    }

    fn participant_stakes(&self, _elector: &Address) -> Result<Vec<NanoTokens>, ChainError> {
        Ok(self.check(NodeOp::ParticipantStakes)?.participant_stakes.clone())
    }

    fn validator_set_params(&self) -> Result<Option<ValidatorSetParams>, ChainError> {
        Ok(self.check(NodeOp::ValidatorSetParams)?.validator_set)
    }

    fn stake_bounds(&self) -> Result<Option<StakeBounds>, ChainError> {
        Ok(self.check(NodeOp::StakeBounds)?.bounds)
    }

    fn compute_returned_stakes(
        &self,
        elector: &Address,
        _validator: &Address,
    ) -> Result<Vec<NanoTokens>, ChainError> {
        let state = self.check(NodeOp::ReturnedStakes)?;
        Ok(state.returned.get(elector).cloned().unwrap_or_default())
    }

    fn recover_stake_request(&self) -> Result<String, ChainError> {
        let mut state = self.check(NodeOp::RecoverRequest)?;
        state.recover_requests += 1;
        Ok("recover-query".into())
    }
}
