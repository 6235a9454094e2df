//! Registry vs. chain: which elections are finished, which need a bid.

use stakeward_telemetry::Category;
use stakeward_types::{Election, ElectionMode};

use crate::cycle::Cycle;
use crate::report::election_record;
use crate::NodeError;

/// Report every registry election and retire the finished ones.
///
/// An election is finished once the elector no longer lists it and its phase
/// allows the stake to return. Pool elections are dropped here (the pool
/// settles them itself); the rest are returned for stake recovery.
pub(crate) fn reconcile(cycle: &mut Cycle<'_>) -> Vec<Election> {
    let mut finished = Vec::new();
    for election in cycle.registry.iter() {
        let done = !cycle.is_open(election.id()) && election.can_return(cycle.now);
        let category = if done {
            Category::FinishedElections
        } else {
            Category::ActiveElections
        };
        cycle.emit(category, election_record(election, cycle.now));
        if done {
            finished.push(election.clone());
        }
    }

    let mut to_recover = Vec::new();
    for election in finished {
        match election.mode() {
            Some(ElectionMode::Depool) => {
                if let Some(keys) = election.keys() {
                    cycle.release_keys(election.id(), keys);
                }
                cycle.registry.remove(election.id());
                tracing::info!(
                    election_id = %election.id(),
                    depool = ?election.depool_addr(),
                    "pool election finished, removed from registry"
                );
            }
            _ => to_recover.push(election),
        }
    }
    to_recover
}

/// Open elections that need a bid this cycle: ones the registry has never
/// seen, and registry entries flagged for re-staking.
///
/// Nothing here touches the registry. A new election only enters it once a
/// bid succeeds, and a re-stake flag is only cleared in the stored record by
/// that same successful bid, so anything skipped is reconsidered next cycle.
pub(crate) fn join_batch(cycle: &Cycle<'_>) -> Result<Vec<Election>, NodeError> {
    let mut batch = Vec::new();
    let mut params = None;
    for id in &cycle.open_ids {
        match cycle.registry.find(id) {
            None => {
                let mut election = Election::new(id.clone(), cycle.elector.clone());
                let elector_params = match params {
                    Some(p) => p,
                    None => *params.insert(cycle.deps.node.elector_params()?),
                };
                if let Some(p) = elector_params {
                    election.set_params(p);
                }
                tracing::info!(election_id = %id, "new election detected");
                batch.push(election);
            }
            Some(existing) if existing.restake() => {
                let mut election = existing.clone();
                election.set_restake(false);
                tracing::info!(election_id = %id, stake = %election.stake(), "re-staking election");
                batch.push(election);
            }
            Some(_) => {}
        }
    }
    Ok(batch)
}
