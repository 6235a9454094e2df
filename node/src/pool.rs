//! Pool participation: the validator signs bids a staking pool asks for,
//! and keeps the pool ticking.

use stakeward_chain::{PoolEvent, PoolEventKind};
use stakeward_policy::{clamp_to_protocol_bounds, PrudentGate, StakeDecision};
use stakeward_telemetry::{Category, TelemetryRecord};
use stakeward_types::{Address, Election, ElectionId, ElectionMode, NanoTokens, StakeBounds, Timestamp};

use crate::config::{ElectionSettings, PoolSettings};
use crate::cycle::{place_bid, BidPlan, Cycle};
use crate::report::join_record;
use crate::strategy::Competition;
use crate::NodeError;

/// Value sent with a pool bid; the pool itself carries the stake.
pub const POOL_BID_FEE: NanoTokens = NanoTokens::from_tokens(1);

pub struct PoolStrategy {
    max_factor: f64,
    prudent: Option<PrudentGate>,
    pools: Vec<PoolState>,
}

/// A configured pool and what the loop remembers about it between cycles.
#[derive(Debug)]
struct PoolState {
    settings: PoolSettings,
    proxies: Vec<Address>,
    last_ticktock: Option<Timestamp>,
    last_replenish: Option<Timestamp>,
}

impl PoolStrategy {
    pub fn new(settings: &ElectionSettings) -> Self {
        Self {
            max_factor: settings.stake_max_factor,
            prudent: settings.prudent,
            pools: settings
                .pools
                .iter()
                .map(|pool| PoolState {
                    proxies: pool.proxy_addresses.clone(),
                    settings: pool.clone(),
                    last_ticktock: None,
                    last_replenish: None,
                })
                .collect(),
        }
    }

    /// Service every pool in turn. Each open election is bid on through at
    /// most one pool.
    pub(crate) fn join(&mut self, cycle: &mut Cycle<'_>, batch: Vec<Election>) -> Result<(), NodeError> {
        let mut batch: Vec<Election> = batch
            .into_iter()
            .filter(|e| e.mode() != Some(ElectionMode::Validator))
            .collect();
        let mut bounds = None;
        for pool in &mut self.pools {
            pool.service(cycle, &mut batch, &mut bounds, self.max_factor, self.prudent)?;
        }
        Ok(())
    }
}

impl PoolState {
    fn address(&self) -> &Address {
        &self.settings.depool_address
    }

    fn service(
        &mut self,
        cycle: &mut Cycle<'_>,
        batch: &mut Vec<Election>,
        bounds: &mut Option<Option<StakeBounds>>,
        max_factor: f64,
        prudent: Option<PrudentGate>,
    ) -> Result<(), NodeError> {
        let wallet = &cycle.deps.wallet;
        let address = self.address().clone();

        if self.proxies.is_empty() {
            let info = wallet.pool_info(&address)?;
            if info.closed {
                tracing::warn!(depool = %address, "pool is closed, skipping");
                return Ok(());
            }
            tracing::info!(depool = %address, proxies = info.proxies.len(), "resolved pool proxies");
            self.proxies = info.proxies;
        }

        let events = wallet.pool_events(&address)?;
        let ticktock = self.replenish_if_low(cycle, &events)?;

        if self.settings.enable_elections {
            if let Some((index, proxy)) = signing_request(&events, batch) {
                let election = batch.remove(index);
                if !self.proxies.is_empty() && !self.proxies.contains(&proxy) {
                    tracing::warn!(depool = %address, proxy = %proxy, "signing request names an unknown proxy");
                }
                let bounds = match *bounds {
                    Some(b) => b,
                    None => *bounds.insert(cycle.deps.node.stake_bounds()?),
                };
                let gate = self.settings.prudent.or(prudent);
                self.bid(cycle, election, proxy, bounds, gate, max_factor)?;
            }
        }

        let awaiting_request = !cycle.open_ids.is_empty()
            && !events.iter().any(|e| match &e.kind {
                PoolEventKind::StakeSigningRequested { election_id, .. } => cycle.is_open(election_id),
                _ => false,
            });
        let due = self
            .last_ticktock
            .map_or(true, |t| t.has_expired(self.settings.max_ticktock_period, cycle.now));
        if ticktock || (awaiting_request && due) {
            cycle
                .deps
                .wallet
                .pool_ticktock(&address, &cycle.validator, &cycle.seed)?;
            self.last_ticktock = Some(cycle.now);
            tracing::info!(depool = %address, "ticktock sent");
            cycle.emit(
                Category::DepoolTicktock,
                TelemetryRecord::new().with("depool_address", &address),
            );
        }
        Ok(())
    }

    /// Top the pool up when its newest event says it is running low and the
    /// last top-up is old enough. Returns whether a top-up was sent.
    fn replenish_if_low(&mut self, cycle: &Cycle<'_>, events: &[PoolEvent]) -> Result<bool, NodeError> {
        let Some(settings) = &self.settings.replenish else {
            return Ok(false);
        };
        let Some(requested) = events.last().and_then(low_balance) else {
            return Ok(false);
        };
        let due = self
            .last_replenish
            .map_or(true, |t| t.has_expired(settings.max_period, cycle.now));
        if !due {
            tracing::debug!(depool = %self.address(), "pool balance low, top-up not due yet");
            return Ok(false);
        }

        let address = self.address();
        cycle
            .deps
            .wallet
            .pool_replenish(address, &cycle.validator, settings.topup, &cycle.seed)?;
        tracing::info!(depool = %address, amount = %settings.topup, requested = %requested, "pool replenished");
        cycle.emit(
            Category::DepoolReplenish,
            TelemetryRecord::new()
                .with("depool_address", address)
                .with("amount", settings.topup)
                .with("requested", requested),
        );
        self.last_replenish = Some(cycle.now);
        Ok(true)
    }

    /// Bid on `election` for this pool. An election skipped by the stake
    /// checks is left for the next cycle.
    fn bid(
        &self,
        cycle: &mut Cycle<'_>,
        mut election: Election,
        proxy: Address,
        bounds: Option<StakeBounds>,
        gate: Option<PrudentGate>,
        max_factor: f64,
    ) -> Result<(), NodeError> {
        let address = self.address().clone();
        let id = election.id().clone();

        let pool_balance = cycle.deps.wallet.account(&address)?.balance;
        let others_active = cycle
            .registry
            .iter()
            .any(|e| e.depool_addr() == Some(&address) && e.id() != &id);
        let available = if others_active {
            pool_balance.split(2)
        } else {
            pool_balance
        };

        let stake = match bounds.map(|b| clamp_to_protocol_bounds(available, &b)) {
            Some(StakeDecision::Rejected { requested, min_stake }) => {
                tracing::warn!(
                    election_id = %id,
                    depool = %address,
                    stake = %requested,
                    min_stake = %min_stake,
                    "pool stake below protocol minimum, not joining"
                );
                cycle.emit(
                    Category::ElectionJoin,
                    join_record(&id, requested, bounds.as_ref(), Some("stake below minimum"))
                        .with("depool_address", &address),
                );
                return Ok(());
            }
            Some(decision) => decision.amount(),
            None => available,
        };

        if let Some(gate) = gate {
            let competition = Competition::fetch(cycle)?;
            if !gate.admits(&election, cycle.now, stake, competition.slots, &competition.stakes) {
                tracing::info!(election_id = %id, depool = %address, "prudent gate closed, waiting");
                return Ok(());
            }
        }

        let plan = BidPlan {
            beneficiary: &proxy,
            dest: &address,
            value: POOL_BID_FEE,
            max_factor,
        };
        let keys = match place_bid(cycle, &election, &plan) {
            Ok(keys) => keys,
            Err(e) => {
                let reason = e.to_string();
                cycle.emit(
                    Category::ElectionJoin,
                    join_record(&id, stake, bounds.as_ref(), Some(reason.as_str()))
                        .with("depool_address", &address),
                );
                return Err(e);
            }
        };

        election.set_keys(keys);
        election.add_stake(stake);
        election.set_mode(ElectionMode::Depool)?;
        election.set_pool(address.clone(), proxy.clone());
        cycle.registry.add(election);

        cycle.emit(
            Category::ElectionJoin,
            join_record(&id, stake, bounds.as_ref(), None)
                .with("depool_address", &address)
                .with("proxy", &proxy),
        );
        cycle.report.joined.push((id, stake));
        if let Some(metrics) = cycle.metrics {
            metrics.elections_joined.inc();
        }
        Ok(())
    }
}

/// The replenishment a low-balance event asks for.
fn low_balance(event: &PoolEvent) -> Option<NanoTokens> {
    match event.kind {
        PoolEventKind::TooLowBalance { replenishment } => Some(replenishment),
        _ => None,
    }
}

/// The newest signing request for an election in `batch`, as the batch
/// index and the proxy to bid through.
fn signing_request(events: &[PoolEvent], batch: &[Election]) -> Option<(usize, Address)> {
    events.iter().rev().find_map(|event| match &event.kind {
        PoolEventKind::StakeSigningRequested { election_id, proxy } => {
            position(batch, election_id).map(|index| (index, proxy.clone()))
        }
        _ => None,
    })
}

fn position(batch: &[Election], id: &ElectionId) -> Option<usize> {
    batch.iter().position(|e| e.id().as_str() == id.as_str())
}
