//! Wallet capability: multisig transfers and staking-pool calls.

use stakeward_types::{Address, NanoTokens};

use crate::{Account, ChainError, PoolEvent, PoolInfo, Seed, TransactionId};

/// An outgoing multisig transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub dest: Address,
    pub value: NanoTokens,
    pub bounce: bool,
    /// Base64 message body.
    pub payload: String,
}

pub trait Wallet: Send + Sync {
    fn account(&self, address: &Address) -> Result<Account, ChainError>;

    fn submit_transaction(
        &self,
        transfer: &Transfer,
        signer: &Seed,
    ) -> Result<TransactionId, ChainError>;

    fn confirm_transaction(
        &self,
        wallet: &Address,
        id: &TransactionId,
        signer: &Seed,
    ) -> Result<(), ChainError>;

    fn pool_events(&self, pool: &Address) -> Result<Vec<PoolEvent>, ChainError>;

    fn pool_info(&self, pool: &Address) -> Result<PoolInfo, ChainError>;

    /// Top up the pool's balance used to pay for ticktocks.
    fn pool_replenish(
        &self,
        pool: &Address,
        wallet: &Address,
        amount: NanoTokens,
        signer: &Seed,
    ) -> Result<(), ChainError>;

    /// Send the periodic ticktock that lets the pool advance its rounds.
    fn pool_ticktock(
        &self,
        pool: &Address,
        wallet: &Address,
        signer: &Seed,
    ) -> Result<(), ChainError>;
}
