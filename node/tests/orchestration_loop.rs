//! Loop-level behaviour: sync gating, sleep selection, persistence,
//! metrics and shutdown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use serde_json::json;

use stakeward_chain::{ChainError, SyncLag};
use stakeward_node::{
    DaemonMetrics, ElectionModeSetting, ElectionSettings, LoopSettings, NodeError, Orchestrator,
    ShutdownController, Strategy,
};
use stakeward_nullables::{NodeOp, WalletOp};
use stakeward_registry::JsonFileStore;
use stakeward_telemetry::Category;
use stakeward_types::{ElectionId, NanoTokens};

// ---------------------------------------------------------------------------
// Sync gating and sleep selection
// ---------------------------------------------------------------------------

#[test]
fn lagging_node_skips_elections_and_retries_soon() {
    let h = Harness::new();
    h.node.set_sync_lag(SyncLag::Seconds(120));
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, SHORT);
    assert!(!outcome.report.synced);
    assert_eq!(outcome.report.time_diff, Some(120));
    assert!(outcome.report.error.is_some());
    assert!(h.wallet.submitted().is_empty());
    assert!(h.node.live_keys().is_empty());

    let status = h.telemetry.of(Category::NodeStatus);
    assert_eq!(status[0].get("time_diff"), Some(&json!(120)));
}

#[test]
fn lag_at_the_limit_counts_as_synced() {
    let h = Harness::new();
    h.node.set_sync_lag(SyncLag::Seconds(30));
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert!(outcome.report.synced);
    assert_eq!(outcome.report.joined.len(), 1);
}

#[test]
fn unknown_lag_is_out_of_sync() {
    let h = Harness::new();
    h.node.set_sync_lag(SyncLag::Unknown);
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, SHORT);
    assert_eq!(outcome.report.time_diff, None);
    assert!(h.wallet.submitted().is_empty());
}

#[test]
fn unreachable_node_console_is_out_of_sync() {
    let h = Harness::new();
    h.node.fail(
        NodeOp::SyncTimeDiff,
        ChainError::Connectivity("connection refused".into()),
    );
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, SHORT);
    assert!(!outcome.report.synced);
    let error = outcome.report.error.expect("error reported");
    assert!(error.starts_with("out of sync"), "{error}");
}

#[test]
fn connectivity_error_retries_soon() {
    let h = Harness::new();
    h.node.fail(
        NodeOp::ElectorAddress,
        ChainError::Connectivity("network down".into()),
    );
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert!(outcome.report.synced);
    assert_eq!(outcome.sleep, SHORT);
    assert!(outcome.report.error.is_some());
}

#[test]
fn other_errors_wait_the_long_interval() {
    let h = Harness::new();
    h.node.fail(
        NodeOp::ElectionIds,
        ChainError::Data("garbled getter output".into()),
    );
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, LONG);
    assert!(outcome.report.error.is_some());
}

#[test]
fn elections_off_only_reports_status() {
    let h = Harness::new();
    let mut orchestrator = h.orchestrator(ElectionSettings {
        mode: ElectionModeSetting::Off,
        ..validator_settings()
    });

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, LONG);
    assert_eq!(outcome.report.error, None);
    assert_eq!(outcome.report.balance, Some(tokens(1000)));
    assert!(outcome.report.election_ids.is_empty());
    assert!(h.wallet.submitted().is_empty());
    assert_eq!(h.telemetry.of(Category::ElectionStatus).len(), 1);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn registry_is_saved_even_when_the_cycle_fails() {
    let h = Harness::with_registry(vec![joined_election(OLD_ELECTION, tokens(300))]);
    h.node.set_returned(ELECTOR, vec![tokens(300)]);
    // Recovery goes through, the following bid does not.
    h.node.fail(
        NodeOp::SignRequest,
        ChainError::Execution("signer crashed".into()),
    );
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert!(outcome.report.error.is_some());
    assert_eq!(outcome.report.recovered, tokens(300));
    assert_eq!(h.store.save_count(), 1);
    let saved = h.store.snapshot().expect("registry saved");
    assert!(!saved.contains(&ElectionId::new(OLD_ELECTION)));
}

#[test]
fn save_failure_is_reported_and_retried() {
    let h = Harness::new();
    h.store.fail_saves(true);
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    let error = outcome.report.error.expect("save failure reported");
    assert!(error.contains("registry"), "{error}");
    assert_eq!(orchestrator.registry().len(), 1);

    h.store.fail_saves(false);
    orchestrator.run_cycle();
    assert_eq!(h.store.save_count(), 1);
    assert_eq!(h.store.snapshot().map(|r| r.len()), Some(1));
}

#[test]
fn registry_survives_restart_through_the_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elections.json");
    let h = Harness::new();
    let deps = stakeward_node::Collaborators {
        store: Arc::new(JsonFileStore::new(&path)),
        ..h.collaborators()
    };
    let strategy = Strategy::from_settings(&validator_settings()).unwrap();

    let mut first = Orchestrator::new(loop_settings(), strategy, deps.clone()).unwrap();
    first.run_cycle();
    assert_eq!(first.registry().len(), 1);
    drop(first);

    let strategy = Strategy::from_settings(&validator_settings()).unwrap();
    let mut second = Orchestrator::new(loop_settings(), strategy, deps).unwrap();
    let election = second
        .registry()
        .find(&ElectionId::new(ELECTION))
        .expect("reloaded from disk")
        .clone();
    assert_eq!(election.stake(), tokens(300));

    // Already joined, so the restarted loop does not bid again.
    let outcome = second.run_cycle();
    assert!(outcome.report.joined.is_empty());
    assert_eq!(h.wallet.submitted().len(), 1);
}

#[test]
fn unreadable_registry_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elections.json");
    std::fs::write(&path, "{ not json").unwrap();
    let h = Harness::new();
    let deps = stakeward_node::Collaborators {
        store: Arc::new(JsonFileStore::new(&path)),
        ..h.collaborators()
    };

    let result = Orchestrator::new(loop_settings(), None, deps);

    assert!(matches!(result, Err(NodeError::Registry(_))));
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[test]
fn metrics_follow_the_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let metrics_file = dir.path().join("stakeward.prom");
    let h = Harness::new();
    let settings = LoopSettings {
        metrics_file: Some(metrics_file.clone()),
        ..loop_settings()
    };
    let metrics = Arc::new(DaemonMetrics::new().unwrap());
    let strategy = Strategy::from_settings(&validator_settings()).unwrap();
    let mut orchestrator = Orchestrator::new(settings, strategy, h.collaborators())
        .unwrap()
        .with_metrics(metrics.clone());

    orchestrator.run_cycle();
    h.wallet.fail(
        WalletOp::Account,
        ChainError::Connectivity("wallet unreachable".into()),
    );
    orchestrator.run_cycle();

    assert_eq!(metrics.cycles.get(), 2);
    assert_eq!(metrics.cycle_errors.get(), 1);
    assert_eq!(metrics.elections_joined.get(), 1);
    assert_eq!(metrics.active_elections.get(), 1);
    assert_eq!(metrics.sync_lag.get(), 0);

    let text = std::fs::read_to_string(&metrics_file).unwrap();
    assert!(text.contains("stakeward_cycles_total 2"), "{text}");
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_loop_stops_on_shutdown() {
    let h = Harness::new();
    let orchestrator = h.orchestrator(validator_settings());
    let shutdown = ShutdownController::new();
    let handle = tokio::spawn(orchestrator.run(shutdown.subscribe()));

    // The first cycle runs straight away, then the loop sleeps.
    for _ in 0..100 {
        if !h.telemetry.of(Category::ElectionStatus).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown.shutdown();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop stopped")
        .expect("loop task did not panic");
    assert_eq!(h.telemetry.of(Category::ElectionStatus).len(), 1);
    assert_eq!(h.wallet.submitted().len(), 1);
    assert_eq!(
        h.wallet.balance(&stakeward_types::Address::new(VALIDATOR)),
        NanoTokens::from_tokens(700)
    );
}
