//! Stake recovery for finished direct elections.

use std::collections::BTreeMap;

use stakeward_chain::Transfer;
use stakeward_telemetry::{Category, TelemetryRecord};
use stakeward_types::{Address, AddressKind, Election, NanoTokens};

use crate::cycle::Cycle;
use crate::NodeError;

/// Value attached to a recovery request to pay for its processing.
pub const RECOVER_FEE: NanoTokens = NanoTokens::from_tokens(1);

/// Recover what the electors hold for `finished`, one request per elector.
///
/// Elections of an elector that returned nothing stay in the registry. A
/// failed recovery is logged and left for the next cycle.
/// Returns the total amount recovered.
pub(crate) fn recover_stakes(cycle: &mut Cycle<'_>, finished: Vec<Election>) -> NanoTokens {
    let mut by_elector: BTreeMap<Address, Vec<Election>> = BTreeMap::new();
    for election in finished {
        by_elector
            .entry(election.elector_addr().clone())
            .or_default()
            .push(election);
    }

    let mut recovered = NanoTokens::ZERO;
    for (elector, elections) in by_elector {
        match recover_from(cycle, &elector, &elections) {
            Ok(Some(amount)) => recovered += amount,
            Ok(None) => tracing::debug!(
                elector = %elector,
                elections = elections.len(),
                "nothing to recover yet"
            ),
            Err(e) => tracing::warn!(
                elector = %elector,
                error = %e,
                "stake recovery failed, will retry next cycle"
            ),
        }
    }
    recovered
}

fn recover_from(
    cycle: &mut Cycle<'_>,
    elector: &Address,
    elections: &[Election],
) -> Result<Option<NanoTokens>, NodeError> {
    let node = &cycle.deps.node;
    let amount: NanoTokens = node
        .compute_returned_stakes(elector, &cycle.validator)?
        .into_iter()
        .sum();
    if amount.is_zero() {
        return Ok(None);
    }

    let transfer = Transfer {
        from: cycle.validator.clone(),
        dest: elector.with_kind(AddressKind::MasterChain),
        value: RECOVER_FEE,
        bounce: true,
        payload: node.recover_stake_request()?,
    };
    let tx = cycle.submit_confirmed(&transfer)?;

    for election in elections {
        if let Some(keys) = election.keys() {
            cycle.release_keys(election.id(), keys);
        }
        cycle.registry.remove(election.id());
    }
    tracing::info!(
        elector = %elector,
        amount = %amount,
        tx = %tx,
        elections = elections.len(),
        "stake recovered"
    );
    cycle.emit(
        Category::StakeRecover,
        TelemetryRecord::new()
            .with("elector_addr", elector)
            .with("recover_amount", amount),
    );
    if let Some(metrics) = cycle.metrics {
        metrics.stake_recoveries.inc();
    }
    cycle.report.recovered += amount;
    Ok(Some(amount))
}
