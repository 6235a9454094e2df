//! Nullable wallet: balances in memory, every call recorded.

use std::collections::HashMap;
use std::sync::Mutex;

use stakeward_chain::{
    Account, ChainError, PoolEvent, PoolEventKind, PoolInfo, Seed, TransactionId, Transfer,
    Wallet,
};
use stakeward_types::{Address, ElectionId, NanoTokens};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WalletOp {
    Account,
    Submit,
    Confirm,
    PoolEvents,
    PoolInfo,
    Replenish,
    Ticktock,
}

#[derive(Default)]
struct State {
    balances: HashMap<Address, NanoTokens>,
    submitted: Vec<Transfer>,
    confirmations: Vec<(Address, TransactionId)>,
    events: HashMap<Address, Vec<PoolEvent>>,
    pools: HashMap<Address, PoolInfo>,
    replenished: Vec<(Address, NanoTokens)>,
    ticktocks: Vec<Address>,
    next_tx: u64,
    failures: HashMap<WalletOp, ChainError>,
}

#[derive(Default)]
pub struct NullWallet {
    state: Mutex<State>,
}

impl NullWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: impl Into<Address>, balance: NanoTokens) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.into(), balance);
    }

    pub fn balance(&self, address: &Address) -> NanoTokens {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_pool(&self, pool: impl Into<Address>, info: PoolInfo) {
        self.state.lock().unwrap().pools.insert(pool.into(), info);
    }

    pub fn push_event(&self, pool: impl Into<Address>, kind: PoolEventKind) {
        let mut state = self.state.lock().unwrap();
        let events = state.events.entry(pool.into()).or_default();
        let created_at = events.last().map(|e| e.created_at + 1).unwrap_or(1);
        events.push(PoolEvent {
            id: format!("event-{created_at}"),
            created_at,
            kind,
        });
    }

    /// Convenience for a `StakeSigningRequested` event.
    pub fn push_signing_request(&self, pool: impl Into<Address>, election_id: &str, proxy: &str) {
        self.push_event(
            pool,
            PoolEventKind::StakeSigningRequested {
                election_id: ElectionId::new(election_id),
                proxy: Address::new(proxy),
            },
        );
    }

    pub fn fail(&self, op: WalletOp, error: ChainError) {
        self.state.lock().unwrap().failures.insert(op, error);
    }

    pub fn clear_failure(&self, op: WalletOp) {
        self.state.lock().unwrap().failures.remove(&op);
    }

    pub fn submitted(&self) -> Vec<Transfer> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn confirmations(&self) -> Vec<(Address, TransactionId)> {
        self.state.lock().unwrap().confirmations.clone()
    }

    pub fn replenished(&self) -> Vec<(Address, NanoTokens)> {
        self.state.lock().unwrap().replenished.clone()
    }

    pub fn ticktocks(&self) -> Vec<Address> {
        self.state.lock().unwrap().ticktocks.clone()
    }

    fn check(&self, op: WalletOp) -> Result<std::sync::MutexGuard<'_, State>, ChainError> {
        let state = self.state.lock().unwrap();
        match state.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(state),
        }
    }
}

impl Wallet for NullWallet {
    fn account(&self, address: &Address) -> Result<Account, ChainError> {
        let state = self.check(WalletOp::Account)?;
        let balance = state
            .balances
            .get(address)
            .copied()
            .ok_or_else(|| ChainError::Data(format!("account not found: {address}")))?;
        Ok(Account {
            address: address.clone(),
            acc_type: "Active".into(),
            balance,
        })
    }

    /// Debits the sender; the chain would.
    fn submit_transaction(
        &self,
        transfer: &Transfer,
        _signer: &Seed,
    ) -> Result<TransactionId, ChainError> {
        let mut state = self.check(WalletOp::Submit)?;
        let balance = state.balances.entry(transfer.from.clone()).or_default();
        *balance = balance.saturating_sub(transfer.value);
        state.submitted.push(transfer.clone());
        state.next_tx += 1;
        Ok(TransactionId(format!("0x{:x}", state.next_tx)))
    }

    fn confirm_transaction(
        &self,
        wallet: &Address,
        id: &TransactionId,
        _signer: &Seed,
    ) -> Result<(), ChainError> {
        let mut state = self.check(WalletOp::Confirm)?;
        state.confirmations.push((wallet.clone(), id.clone()));
        Ok(())
    }

    fn pool_events(&self, pool: &Address) -> Result<Vec<PoolEvent>, ChainError> {
        let state = self.check(WalletOp::PoolEvents)?;
        Ok(state.events.get(pool).cloned().unwrap_or_default())
    }

    fn pool_info(&self, pool: &Address) -> Result<PoolInfo, ChainError> {
        let state = self.check(WalletOp::PoolInfo)?;
        state
            .pools
            .get(pool)
            .cloned()
            .ok_or_else(|| ChainError::Data(format!("unknown pool {pool}")))
    }

    fn pool_replenish(
        &self,
        pool: &Address,
        _wallet: &Address,
        amount: NanoTokens,
        _signer: &Seed,
    ) -> Result<(), ChainError> {
        let mut state = self.check(WalletOp::Replenish)?;
        state.replenished.push((pool.clone(), amount));
        Ok(())
    }

    fn pool_ticktock(
        &self,
        pool: &Address,
        _wallet: &Address,
        _signer: &Seed,
    ) -> Result<(), ChainError> {
        let mut state = self.check(WalletOp::Ticktock)?;
        state.ticktocks.push(pool.clone());
        Ok(())
    }
}
