//! The election orchestration loop.
//!
//! One cycle: check that the node is in sync, reconcile the registry with
//! the elector, recover stakes of finished elections, bid on new ones,
//! persist the registry and report. The loop then sleeps for the short
//! interval after an out-of-sync or connectivity failure, the long one
//! otherwise.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use stakeward_chain::SyncLag;
use stakeward_registry::ElectionRegistry;
use stakeward_telemetry::{Category, TelemetryRecord};
use stakeward_types::{NanoTokens, Timestamp};
use stakeward_utils::{format_duration, LogThrottle, ThrottleDecision};

use crate::config::DaemonConfig;
use crate::cycle::{Collaborators, Cycle};
use crate::metrics::DaemonMetrics;
use crate::reconcile::{join_batch, reconcile};
use crate::recovery::recover_stakes;
use crate::report::CycleReport;
use crate::strategy::Strategy;
use crate::NodeError;

/// Identical cycle errors are logged at most once per this window.
const ERROR_LOG_WINDOW_SECS: u64 = 3600;

/// Timing knobs of the loop.
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub max_sync_diff: i64,
    pub short_interval: Duration,
    pub long_interval: Duration,
    pub metrics_file: Option<PathBuf>,
}

impl From<&DaemonConfig> for LoopSettings {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            max_sync_diff: config.max_sync_diff,
            short_interval: config.short_interval(),
            long_interval: config.long_interval(),
            metrics_file: config.metrics_file.clone(),
        }
    }
}

/// What a cycle did and how long to sleep before the next one.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    pub sleep: Duration,
    pub report: CycleReport,
}

pub struct Orchestrator {
    settings: LoopSettings,
    strategy: Option<Strategy>,
    deps: Collaborators,
    registry: ElectionRegistry,
    metrics: Option<Arc<DaemonMetrics>>,
    throttle: LogThrottle,
    last_error: Option<String>,
}

impl Orchestrator {
    /// Load the registry and get ready to run. A registry that cannot be
    /// read is fatal: starting empty would forget stakes still held by the
    /// elector.
    pub fn new(
        settings: LoopSettings,
        strategy: Option<Strategy>,
        deps: Collaborators,
    ) -> Result<Self, NodeError> {
        let registry = deps.store.load()?;
        tracing::info!(
            elections = registry.len(),
            strategy = strategy.as_ref().map_or("off", |s| s.name()),
            "election registry loaded"
        );
        Ok(Self {
            settings,
            strategy,
            deps,
            registry,
            metrics: None,
            throttle: LogThrottle::new(ERROR_LOG_WINDOW_SECS),
            last_error: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<DaemonMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ElectionRegistry {
        &self.registry
    }

    /// Run one cycle. Never fails: errors end up in the report and decide
    /// the sleep.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let now = self.deps.clock.now();
        let mut report = CycleReport::default();
        if let Some(metrics) = &self.metrics {
            metrics.cycles.inc();
        }

        report.synced = self.check_sync(&mut report);
        let sleep = if !report.synced {
            if let Some(metrics) = &self.metrics {
                metrics.out_of_sync.inc();
            }
            self.settings.short_interval
        } else {
            match self.elections(now, &mut report) {
                Ok(()) => {
                    if let Some(key) = self.last_error.take() {
                        self.throttle.reset(&key);
                    }
                    self.settings.long_interval
                }
                Err(e) => {
                    self.log_cycle_error(&e, now);
                    report.error = Some(e.to_string());
                    if let Some(metrics) = &self.metrics {
                        metrics.cycle_errors.inc();
                    }
                    if e.is_connectivity() {
                        self.settings.short_interval
                    } else {
                        self.settings.long_interval
                    }
                }
            }
        };

        self.persist(&mut report);
        self.deps
            .telemetry
            .send(Category::ElectionStatus, report.to_record());
        self.update_metrics(&report);

        CycleOutcome { sleep, report }
    }

    /// Cycle until `shutdown` fires. A cycle in progress always completes;
    /// only the sleep between cycles is cut short.
    ///
    /// Needs the multi-threaded runtime: cycles block on collaborator calls.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("orchestration loop started");
        loop {
            let outcome = tokio::task::block_in_place(|| self.run_cycle());
            tracing::info!(
                joined = outcome.report.joined.len(),
                recovered = %outcome.report.recovered,
                error = outcome.report.error.as_deref().unwrap_or(""),
                next_in = %format_duration(outcome.sleep),
                "cycle finished"
            );
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(outcome.sleep) => {}
            }
        }
        tracing::info!("orchestration loop stopped");
    }

    fn check_sync(&self, report: &mut CycleReport) -> bool {
        match self.deps.node.sync_time_diff() {
            Ok(lag) => {
                report.time_diff = match lag {
                    SyncLag::Seconds(secs) => Some(secs),
                    SyncLag::Unknown => None,
                };
                self.deps.telemetry.send(
                    Category::NodeStatus,
                    TelemetryRecord::new().with("time_diff", report.time_diff),
                );
                if lag.is_within(self.settings.max_sync_diff) {
                    return true;
                }
                tracing::warn!(lag = %lag, max = self.settings.max_sync_diff, "node is out of sync");
                report.error = Some(format!("out of sync ({lag})"));
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to query node sync status");
                self.deps.telemetry.send(
                    Category::NodeStatus,
                    TelemetryRecord::new()
                        .with("time_diff", None::<i64>)
                        .with("error", e.to_string()),
                );
                report.error = Some(format!("out of sync: {e}"));
                false
            }
        }
    }

    fn elections(&mut self, now: Timestamp, report: &mut CycleReport) -> Result<(), NodeError> {
        let deps = &self.deps;
        let validator = deps.secrets.validator_address()?;
        report.validator_address = Some(validator.clone());
        let balance = deps.wallet.account(&validator)?.balance;
        report.balance = Some(balance);

        let Some(strategy) = self.strategy.as_mut() else {
            tracing::debug!("elections are switched off");
            return Ok(());
        };

        let elector = deps.node.elector_address()?;
        let open_ids = deps.node.election_ids(&elector)?;
        report.election_ids = open_ids.clone();
        tracing::debug!(elector = %elector, open = open_ids.len(), balance = %balance, "elector state");

        let mut cycle = Cycle {
            deps,
            registry: &mut self.registry,
            report,
            metrics: self.metrics.as_deref(),
            now,
            seed: deps.secrets.validator_seed()?,
            validator,
            elector,
            open_ids,
            balance,
            recovered: NanoTokens::ZERO,
        };

        let finished = reconcile(&mut cycle);
        if !finished.is_empty() {
            cycle.recovered = recover_stakes(&mut cycle, finished);
        }
        // Pools are serviced every cycle, even with nothing new to join.
        let batch = join_batch(&cycle)?;
        strategy.join(&mut cycle, batch)
    }

    /// Save the registry if anything changed, even after a failed cycle.
    fn persist(&mut self, report: &mut CycleReport) {
        if !self.registry.is_dirty() {
            return;
        }
        match self.deps.store.save(&self.registry) {
            Ok(()) => {
                self.registry.mark_clean();
                tracing::debug!(elections = self.registry.len(), "election registry saved");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save election registry");
                report
                    .error
                    .get_or_insert_with(|| format!("failed to save registry: {e}"));
            }
        }
    }

    fn log_cycle_error(&mut self, error: &NodeError, now: Timestamp) {
        let key = error.to_string();
        let decision = self.throttle.observe(&key, now);
        self.last_error = Some(key);
        match decision {
            ThrottleDecision::Emit => tracing::error!(error = %error, "election cycle failed"),
            ThrottleDecision::EmitAfterSuppressed { suppressed } => {
                tracing::error!(error = %error, suppressed, "election cycle failed")
            }
            ThrottleDecision::Suppress => tracing::debug!(error = %error, "election cycle failed"),
        }
    }

    fn update_metrics(&self, report: &CycleReport) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        metrics.sync_lag.set(report.time_diff.unwrap_or(-1));
        metrics.active_elections.set(self.registry.len() as i64);
        if let Some(balance) = report.balance {
            metrics.set_balance(balance);
        }
        if let Some(path) = &self.settings.metrics_file {
            if let Err(e) = metrics.write_textfile(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to write metrics file");
            }
        }
    }
}
