//! Validator node capability.

use stakeward_types::{
    Address, ElectionId, ElectionParams, NanoTokens, StakeBounds, ValidatorKeys,
    ValidatorSetParams,
};

use crate::{ChainError, RequestSignature, SyncLag};

/// Inputs shared by both halves of the bid payload.
#[derive(Clone, Copy, Debug)]
pub struct BidRequest<'a> {
    pub election_id: &'a ElectionId,
    /// End of the key validity window, see `Election::stop_time`.
    pub election_stop: u64,
    pub adnl_key: &'a str,
    pub beneficiary: &'a Address,
    pub max_factor: f64,
}

/// Operations the orchestration loop needs from the validator node and the
/// elector contract it reads through the node.
///
/// Implementations that have no use for a step (a node that signs bids
/// internally has no separate key handles) return empty values.
pub trait ValidatorNode: Send + Sync {
    fn sync_time_diff(&self) -> Result<SyncLag, ChainError>;

    /// Create a new key on the node and return its handle.
    fn new_key(&self) -> Result<String, ChainError>;

    /// Remove a key pair from the node, permanent and temporary entries alike.
    fn release_keys(&self, keys: &ValidatorKeys) -> Result<(), ChainError>;

    /// Register `keys` for validation from `start` until `stop`.
    fn prepare_election(
        &self,
        keys: &ValidatorKeys,
        start: u64,
        stop: u64,
    ) -> Result<(), ChainError>;

    /// Unsigned validation request.
    fn generate_validation_request(&self, bid: &BidRequest<'_>) -> Result<String, ChainError>;

    fn sign_request(&self, key: &str, request: &str) -> Result<RequestSignature, ChainError>;

    /// Message body to send to the elector, base64-encoded.
    fn generate_validation_signed(
        &self,
        bid: &BidRequest<'_>,
        signature: &RequestSignature,
    ) -> Result<String, ChainError>;

    fn elector_address(&self) -> Result<Address, ChainError>;

    /// Ids of the elections currently accepting bids.
    fn election_ids(&self, elector: &Address) -> Result<Vec<ElectionId>, ChainError>;

    fn elector_params(&self) -> Result<Option<ElectionParams>, ChainError>;

    /// Stakes already submitted to the open election.
    fn participant_stakes(&self, elector: &Address) -> Result<Vec<NanoTokens>, ChainError>;

    fn validator_set_params(&self) -> Result<Option<ValidatorSetParams>, ChainError>;

    fn stake_bounds(&self) -> Result<Option<StakeBounds>, ChainError>;

    /// Amounts the elector holds for `validator` and would return on recovery.
    fn compute_returned_stakes(
        &self,
        elector: &Address,
        validator: &Address,
    ) -> Result<Vec<NanoTokens>, ChainError>;

    /// Message body of a stake recovery request, base64-encoded.
    fn recover_stake_request(&self) -> Result<String, ChainError>;
}
