//! Direct participation: the validator wallet funds its own bids.

use stakeward_policy::{
    clamp_to_protocol_bounds, compute_stake, PrudentGate, StakeDecision, StakeExpression,
};
use stakeward_telemetry::Category;
use stakeward_types::{Election, ElectionMode, NanoTokens};

use crate::config::ElectionSettings;
use crate::cycle::{place_bid, BidPlan, Cycle};
use crate::report::join_record;
use crate::strategy::Competition;
use crate::NodeError;

#[derive(Clone, Debug)]
pub struct DirectStrategy {
    stake: StakeExpression,
    max_factor: f64,
    min_balance: NanoTokens,
    prudent: Option<PrudentGate>,
}

impl DirectStrategy {
    pub fn new(settings: &ElectionSettings) -> Self {
        Self {
            stake: settings.default_stake,
            max_factor: settings.stake_max_factor,
            min_balance: settings.min_balance,
            prudent: settings.prudent,
        }
    }

    /// Bid on every election in `batch`.
    ///
    /// The stake is computed once from the balance, the stake recovered this
    /// cycle, and the stake already committed to open elections, split
    /// evenly over the batch. A failed bid aborts the rest of the batch; so
    /// does running into the minimum balance.
    pub(crate) fn join(&self, cycle: &mut Cycle<'_>, batch: Vec<Election>) -> Result<(), NodeError> {
        let batch: Vec<Election> = batch
            .into_iter()
            .filter(|e| {
                let pooled = e.mode() == Some(ElectionMode::Depool);
                if pooled {
                    tracing::warn!(election_id = %e.id(), "pool election in direct mode, skipping");
                }
                !pooled
            })
            .collect();
        if batch.is_empty() {
            return Ok(());
        }

        let bounds = cycle.deps.node.stake_bounds()?;
        let competition = match self.prudent {
            Some(_) => Some(Competition::fetch(cycle)?),
            None => None,
        };

        let committed: NanoTokens = cycle
            .registry
            .iter()
            .filter(|e| cycle.is_open(e.id()))
            .map(|e| e.stake())
            .sum();
        let base = cycle.balance + cycle.recovered + committed;
        let per_election = compute_stake(base.split(batch.len()), &self.stake);
        tracing::info!(
            balance = %cycle.balance,
            recovered = %cycle.recovered,
            committed = %committed,
            elections = batch.len(),
            stake = %per_election,
            "computed election stake"
        );

        let elector = cycle.elector.clone();
        let validator = cycle.validator.clone();
        let mut balance_left = cycle.balance;

        for mut election in batch {
            let id = election.id().clone();
            let stake = match bounds.map(|b| clamp_to_protocol_bounds(per_election, &b)) {
                Some(StakeDecision::Rejected { requested, min_stake }) => {
                    tracing::warn!(
                        election_id = %id,
                        stake = %requested,
                        min_stake = %min_stake,
                        "stake below protocol minimum, not joining"
                    );
                    cycle.emit(
                        Category::ElectionJoin,
                        join_record(&id, requested, bounds.as_ref(), Some("stake below minimum")),
                    );
                    continue;
                }
                Some(StakeDecision::Reduced { requested, amount }) => {
                    tracing::info!(election_id = %id, requested = %requested, stake = %amount, "stake reduced to protocol maximum");
                    amount
                }
                Some(StakeDecision::Accepted(amount)) => amount,
                None => per_election,
            };
            if stake.is_zero() {
                tracing::warn!(election_id = %id, "computed stake is zero, not joining");
                continue;
            }

            let remaining = match balance_left.checked_sub(stake) {
                Some(left) if left >= self.min_balance => left,
                _ => {
                    tracing::warn!(
                        election_id = %id,
                        stake = %stake,
                        balance = %balance_left,
                        min_balance = %self.min_balance,
                        "bid would leave less than the minimum balance, stopping"
                    );
                    cycle.emit(
                        Category::ElectionJoin,
                        join_record(&id, stake, bounds.as_ref(), Some("not enough balance")),
                    );
                    break;
                }
            };

            if let (Some(gate), Some(competition)) = (&self.prudent, &competition) {
                if !gate.admits(&election, cycle.now, stake, competition.slots, &competition.stakes) {
                    tracing::info!(election_id = %id, stake = %stake, "prudent gate closed, waiting");
                    continue;
                }
            }

            let plan = BidPlan {
                beneficiary: &validator,
                dest: &elector,
                value: stake,
                max_factor: self.max_factor,
            };
            let keys = match place_bid(cycle, &election, &plan) {
                Ok(keys) => keys,
                Err(e) => {
                    let reason = e.to_string();
                    cycle.emit(
                        Category::ElectionJoin,
                        join_record(&id, stake, bounds.as_ref(), Some(reason.as_str())),
                    );
                    return Err(e);
                }
            };

            election.set_keys(keys);
            election.add_stake(stake);
            election.set_mode(ElectionMode::Validator)?;
            cycle.registry.add(election);
            balance_left = remaining;

            cycle.emit(Category::ElectionJoin, join_record(&id, stake, bounds.as_ref(), None));
            cycle.report.joined.push((id, stake));
            if let Some(metrics) = cycle.metrics {
                metrics.elections_joined.inc();
            }
        }
        Ok(())
    }
}
