//! [`ValidatorNode`] for a node that keeps its own validator keys.
//!
//! The node signs bids itself, so key creation and request signing are
//! no-ops and the whole bid is produced by one console `election-bid` call.
//! Elector state is read through the wallet CLI.

use stakeward_types::{
    Address, AddressKind, ElectionId, ElectionParams, NanoTokens, StakeBounds, ValidatorKeys,
    ValidatorSetParams,
};

use super::console::NodeConsole;
use super::wallet_cli::WalletCli;
use crate::{BidRequest, ChainError, RequestSignature, SyncLag, ValidatorNode};

pub struct RustNode {
    console: NodeConsole,
    cli: WalletCli,
}

impl RustNode {
    pub fn new(console: NodeConsole, cli: WalletCli) -> Self {
        Self { console, cli }
    }
}

impl ValidatorNode for RustNode {
    fn sync_time_diff(&self) -> Result<SyncLag, ChainError> {
        self.console.sync_lag()
    }

    fn new_key(&self) -> Result<String, ChainError> {
        Ok(String::new())
    }

    fn release_keys(&self, _keys: &ValidatorKeys) -> Result<(), ChainError> {
        Ok(())
    }

    fn prepare_election(
        &self,
        _keys: &ValidatorKeys,
        _start: u64,
        _stop: u64,
    ) -> Result<(), ChainError> {
        Ok(())
    }

    fn generate_validation_request(&self, _bid: &BidRequest<'_>) -> Result<String, ChainError> {
        Ok(String::new())
    }

    fn sign_request(&self, _key: &str, _request: &str) -> Result<RequestSignature, ChainError> {
        Ok(RequestSignature::default())
    }

    fn generate_validation_signed(
        &self,
        bid: &BidRequest<'_>,
        _signature: &RequestSignature,
    ) -> Result<String, ChainError> {
        let start = bid.election_id.as_unix().ok_or_else(|| {
            ChainError::Data(format!("election id {} is not a timestamp", bid.election_id))
        })?;
        self.console.election_bid(
            &bid.beneficiary.with_kind(AddressKind::MasterChain),
            start,
            bid.election_stop,
            bid.max_factor,
        )
    }

    fn elector_address(&self) -> Result<Address, ChainError> {
        self.cli.elector_address()
    }

    fn election_ids(&self, elector: &Address) -> Result<Vec<ElectionId>, ChainError> {
        self.cli.active_election_ids(elector)
    }

    fn elector_params(&self) -> Result<Option<ElectionParams>, ChainError> {
        self.cli.election_params()
    }

    fn participant_stakes(&self, elector: &Address) -> Result<Vec<NanoTokens>, ChainError> {
        match self.cli.participant_stakes(elector) {
            Ok(stakes) => Ok(stakes),
            Err(e) if e.is_connectivity() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read participant stakes");
                Ok(Vec::new())
            }
        }
    }

    fn validator_set_params(&self) -> Result<Option<ValidatorSetParams>, ChainError> {
        self.cli.validator_set_params()
    }

    fn stake_bounds(&self) -> Result<Option<StakeBounds>, ChainError> {
        self.cli.stake_bounds()
    }

    fn compute_returned_stakes(
        &self,
        elector: &Address,
        validator: &Address,
    ) -> Result<Vec<NanoTokens>, ChainError> {
        self.cli.compute_returned_stake(elector, validator)
    }

    fn recover_stake_request(&self) -> Result<String, ChainError> {
        self.console.recover_stake()
    }
}
