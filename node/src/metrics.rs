//! Prometheus metrics for the daemon.
//!
//! [`DaemonMetrics`] owns a dedicated [`Registry`]. There is no HTTP
//! endpoint; [`DaemonMetrics::write_textfile`] dumps the registry in text
//! exposition format for a node-exporter textfile collector.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::path::Path;

use stakeward_types::NanoTokens;

use crate::NodeError;

pub struct DaemonMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Orchestration cycles run.
    pub cycles: IntCounter,
    /// Cycles that ended with an error.
    pub cycle_errors: IntCounter,
    /// Cycles skipped because the node was out of sync.
    pub out_of_sync: IntCounter,
    /// Bids submitted successfully.
    pub elections_joined: IntCounter,
    /// Recovery transactions submitted.
    pub stake_recoveries: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Telemetry records dropped on a full queue since start.
    pub telemetry_dropped: IntGauge,
    /// Validator wallet balance in whole tokens.
    pub validator_balance: IntGauge,
    /// Elections currently held in the registry.
    pub active_elections: IntGauge,
    /// Last reported node sync lag in seconds (-1 when unknown).
    pub sync_lag: IntGauge,
}

impl DaemonMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let cycles = register_int_counter_with_registry!(
            Opts::new("stakeward_cycles_total", "Orchestration cycles run"),
            registry
        )?;
        let cycle_errors = register_int_counter_with_registry!(
            Opts::new("stakeward_cycle_errors_total", "Cycles that ended with an error"),
            registry
        )?;
        let out_of_sync = register_int_counter_with_registry!(
            Opts::new(
                "stakeward_out_of_sync_total",
                "Cycles skipped because the node was out of sync"
            ),
            registry
        )?;
        let elections_joined = register_int_counter_with_registry!(
            Opts::new("stakeward_elections_joined_total", "Election bids submitted"),
            registry
        )?;
        let stake_recoveries = register_int_counter_with_registry!(
            Opts::new(
                "stakeward_stake_recoveries_total",
                "Stake recovery transactions submitted"
            ),
            registry
        )?;

        let telemetry_dropped = register_int_gauge_with_registry!(
            Opts::new(
                "stakeward_telemetry_dropped",
                "Telemetry records dropped because the queue was full"
            ),
            registry
        )?;
        let validator_balance = register_int_gauge_with_registry!(
            Opts::new(
                "stakeward_validator_balance_tokens",
                "Validator wallet balance in whole tokens"
            ),
            registry
        )?;
        let active_elections = register_int_gauge_with_registry!(
            Opts::new("stakeward_active_elections", "Elections held in the registry"),
            registry
        )?;
        let sync_lag = register_int_gauge_with_registry!(
            Opts::new("stakeward_sync_lag_seconds", "Node sync lag, -1 when unknown"),
            registry
        )?;

        Ok(Self {
            registry,
            cycles,
            cycle_errors,
            out_of_sync,
            elections_joined,
            stake_recoveries,
            telemetry_dropped,
            validator_balance,
            active_elections,
            sync_lag,
        })
    }

    pub fn set_balance(&self, balance: NanoTokens) {
        let tokens = balance.nano() / NanoTokens::PER_TOKEN;
        self.validator_balance
            .set(i64::try_from(tokens).unwrap_or(i64::MAX));
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| NodeError::Metrics(e.to_string()))
    }

    /// Write the exposition to `path` through a sibling temp file, so the
    /// collector never reads a half-written file.
    pub fn write_textfile(&self, path: &Path) -> Result<(), NodeError> {
        let text = self.encode()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_lists_registered_metrics() {
        let m = DaemonMetrics::new().unwrap();
        m.cycles.inc();
        m.sync_lag.set(-1);
        m.set_balance(NanoTokens::new(1_500_000_000_000));
        let text = m.encode().unwrap();
        assert!(text.contains("stakeward_cycles_total 1"));
        assert!(text.contains("stakeward_sync_lag_seconds -1"));
        assert!(text.contains("stakeward_validator_balance_tokens 1500"));
    }

    #[test]
    fn textfile_is_replaced_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stakeward.prom");
        let m = DaemonMetrics::new().unwrap();
        m.write_textfile(&path).unwrap();
        m.elections_joined.inc();
        m.write_textfile(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("stakeward_elections_joined_total 1"));
        assert!(!dir.path().join("stakeward.prom.tmp").exists());
    }
}
