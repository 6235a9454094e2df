//! Telemetry records the loop emits.

use serde::Serialize;

use stakeward_telemetry::TelemetryRecord;
use stakeward_types::{Address, Election, ElectionId, NanoTokens, StakeBounds, Timestamp};

/// Summary of one cycle, shipped as `election_status`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleReport {
    pub synced: bool,
    pub time_diff: Option<i64>,
    pub validator_address: Option<Address>,
    pub balance: Option<NanoTokens>,
    pub election_ids: Vec<ElectionId>,
    /// Elections bid on this cycle, with the stake committed.
    pub joined: Vec<(ElectionId, NanoTokens)>,
    pub recovered: NanoTokens,
    pub error: Option<String>,
}

impl CycleReport {
    pub fn to_record(&self) -> TelemetryRecord {
        let joined: Vec<_> = self
            .joined
            .iter()
            .map(|(election_id, election_stake)| Joined {
                election_id,
                election_stake: *election_stake,
            })
            .collect();
        TelemetryRecord::new()
            .with("validator_address", &self.validator_address)
            .with("balance", self.balance)
            .with("election_ids", &self.election_ids)
            .with("joined", joined)
            .with("recovered", self.recovered)
            .with("time_diff", self.time_diff)
            .with("error", &self.error)
    }
}

#[derive(Serialize)]
struct Joined<'a> {
    election_id: &'a ElectionId,
    election_stake: NanoTokens,
}

/// `active_elections` / `finished_elections` entry.
pub(crate) fn election_record(election: &Election, now: Timestamp) -> TelemetryRecord {
    TelemetryRecord::new()
        .with("election_id", election.id())
        .with("election_stake", election.stake())
        .with("mode", election.mode().map(|m| m.as_str()))
        .with("phase", election.phase(now).map(|p| p.to_string()))
}

/// `election_join` entry for one bid attempt.
pub(crate) fn join_record(
    election_id: &ElectionId,
    stake: NanoTokens,
    bounds: Option<&StakeBounds>,
    error: Option<&str>,
) -> TelemetryRecord {
    TelemetryRecord::new()
        .with("election_id", election_id)
        .with("election_stake", stake)
        .with("min_stake", bounds.map(|b| b.min_stake))
        .with("max_stake", bounds.map(|b| b.max_stake))
        .with("elected", error.is_none())
        .with("error", error)
}
