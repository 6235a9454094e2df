//! Direct participation end to end: the orchestrator drives nullable
//! collaborators through whole cycles and the tests check what reached the
//! node, the wallet, the registry and telemetry.

mod common;

use common::*;
use serde_json::json;

use stakeward_chain::{ChainError, TransactionId};
use stakeward_node::{ElectionSettings, RECOVER_FEE};
use stakeward_nullables::{NodeOp, WalletOp};
use stakeward_policy::{PrudentGate, StakeExpression};
use stakeward_telemetry::Category;
use stakeward_types::{Address, ElectionId, ElectionMode, NanoTokens, ValidatorKeys, ValidatorSetParams};

fn election_id() -> ElectionId {
    ElectionId::new(ELECTION)
}

// ---------------------------------------------------------------------------
// Joining
// ---------------------------------------------------------------------------

#[test]
fn new_election_is_joined_with_configured_share() {
    let h = Harness::new();
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, LONG);
    assert_eq!(outcome.report.error, None);
    assert_eq!(outcome.report.joined, vec![(election_id(), tokens(300))]);

    let submitted = h.wallet.submitted();
    assert_eq!(submitted.len(), 1);
    let transfer = &submitted[0];
    assert_eq!(transfer.from, Address::new(VALIDATOR));
    assert_eq!(transfer.dest, Address::new(ELECTOR));
    assert_eq!(transfer.value, tokens(300));
    assert!(transfer.bounce);
    assert_eq!(transfer.payload, format!("bid:{ELECTION}"));
    assert_eq!(
        h.wallet.confirmations(),
        vec![(Address::new(VALIDATOR), TransactionId("0x1".into()))]
    );
    assert_eq!(h.wallet.balance(&Address::new(VALIDATOR)), tokens(700));

    let generated = ValidatorKeys {
        key: format!("{:064X}", 1),
        adnl_key: format!("{:064X}", 2),
    };
    assert_eq!(
        h.node.prepared(),
        vec![(generated.clone(), 1_700_000_000, 1_700_140_264)]
    );
    let bids = h.node.bids();
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].beneficiary, Address::new(VALIDATOR));
    assert_eq!(bids[0].adnl_key, generated.adnl_key);
    assert_eq!(bids[0].election_stop, 1_700_140_264);

    let saved = h.store.snapshot().expect("registry saved");
    let election = saved.find(&election_id()).expect("election recorded");
    assert_eq!(election.stake(), tokens(300));
    assert_eq!(election.mode(), Some(ElectionMode::Validator));
    assert_eq!(election.keys(), Some(&generated));
    assert!(!election.restake());
}

#[test]
fn stake_above_protocol_maximum_is_reduced() {
    let h = Harness::new();
    let mut orchestrator = h.orchestrator(ElectionSettings {
        default_stake: StakeExpression::percent(60),
        ..validator_settings()
    });

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.report.joined, vec![(election_id(), tokens(500))]);
    assert_eq!(h.wallet.submitted()[0].value, tokens(500));
    let joins = h.telemetry.of(Category::ElectionJoin);
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].get("elected"), Some(&json!(true)));
}

#[test]
fn stake_below_protocol_minimum_is_not_bid() {
    let h = Harness::new();
    h.wallet.set_balance(VALIDATOR, tokens(20));
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.report.error, None);
    assert!(outcome.report.joined.is_empty());
    assert!(h.wallet.submitted().is_empty());
    assert!(h.node.live_keys().is_empty());
    assert!(orchestrator.registry().is_empty());
    let joins = h.telemetry.of(Category::ElectionJoin);
    assert_eq!(joins[0].get("error"), Some(&json!("stake below minimum")));
}

#[test]
fn bid_that_breaches_minimum_balance_stops_the_batch() {
    let h = Harness::new();
    h.node.set_election_ids(&[ELECTION, "1700065536"]);
    let mut orchestrator = h.orchestrator(ElectionSettings {
        min_balance: tokens(900),
        ..validator_settings()
    });

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, LONG);
    assert_eq!(outcome.report.error, None);
    assert!(h.wallet.submitted().is_empty());
    assert!(orchestrator.registry().is_empty());
    // The first election breaks the batch; the second is never considered.
    let joins = h.telemetry.of(Category::ElectionJoin);
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].get("error"), Some(&json!("not enough balance")));
}

#[test]
fn batch_splits_stake_evenly() {
    let h = Harness::new();
    h.node.set_election_ids(&[ELECTION, "1700065536"]);
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(
        outcome.report.joined,
        vec![
            (election_id(), tokens(150)),
            (ElectionId::new("1700065536"), tokens(150)),
        ]
    );
    assert_eq!(orchestrator.registry().len(), 2);
}

#[test]
fn flagged_election_is_restaked_with_existing_keys() {
    let mut existing = joined_election(ELECTION, tokens(100));
    existing.set_restake(true);
    let h = Harness::with_registry(vec![existing]);
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    // 30% of wallet balance plus the 100 already committed.
    assert_eq!(outcome.report.joined, vec![(election_id(), tokens(330))]);
    assert!(h.node.prepared().is_empty());
    assert!(h.node.live_keys().is_empty());
    assert_eq!(h.node.bids()[0].adnl_key, keys(1).adnl_key);

    let election = orchestrator.registry().find(&election_id()).expect("still tracked");
    assert_eq!(election.stake(), tokens(430));
    assert!(!election.restake());
}

#[test]
fn already_joined_election_is_left_alone() {
    let h = Harness::with_registry(vec![joined_election(ELECTION, tokens(300))]);
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert!(outcome.report.joined.is_empty());
    assert!(h.wallet.submitted().is_empty());
    assert_eq!(h.telemetry.of(Category::ActiveElections).len(), 1);
    // Nothing changed, so nothing was written.
    assert_eq!(h.store.save_count(), 0);
}

// ---------------------------------------------------------------------------
// Failures mid-bid
// ---------------------------------------------------------------------------

#[test]
fn failed_signature_releases_generated_keys_and_aborts_batch() {
    let h = Harness::new();
    h.node.set_election_ids(&[ELECTION, "1700065536"]);
    h.node.fail(NodeOp::SignRequest, ChainError::Execution("signer crashed".into()));
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, LONG);
    let error = outcome.report.error.expect("cycle error reported");
    assert!(error.contains(ELECTION), "{error}");
    assert_eq!(h.node.prepared().len(), 1);
    assert_eq!(h.node.released().len(), 1);
    assert!(h.node.live_keys().is_empty());
    assert!(h.wallet.submitted().is_empty());
    assert!(orchestrator.registry().is_empty());

    let joins = h.telemetry.of(Category::ElectionJoin);
    assert_eq!(joins.len(), 1);
    assert!(joins[0].get("error").is_some_and(|e| e.is_string()));
}

#[test]
fn failed_prepare_releases_generated_keys() {
    let h = Harness::new();
    let mut orchestrator = h.orchestrator(validator_settings());
    h.node.fail(NodeOp::PrepareElection, ChainError::Execution("bad window".into()));

    orchestrator.run_cycle();

    assert!(h.node.live_keys().is_empty());
    assert_eq!(h.node.released().len(), 1);
}

#[test]
fn lost_connection_during_submission_retries_soon() {
    let h = Harness::new();
    h.wallet.fail(WalletOp::Submit, ChainError::Connectivity("wallet unreachable".into()));
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.sleep, SHORT);
    assert!(h.node.live_keys().is_empty());
    assert!(orchestrator.registry().is_empty());

    h.wallet.clear_failure(WalletOp::Submit);
    let outcome = orchestrator.run_cycle();
    assert_eq!(outcome.sleep, LONG);
    assert_eq!(outcome.report.joined.len(), 1);
}

// ---------------------------------------------------------------------------
// Prudent gate
// ---------------------------------------------------------------------------

fn prudent_settings(threshold: u8) -> ElectionSettings {
    ElectionSettings {
        prudent: Some(PrudentGate {
            election_end_join_offset: None,
            join_threshold: threshold,
        }),
        ..validator_settings()
    }
}

#[test]
fn prudent_gate_admits_while_slots_are_free() {
    let h = Harness::new();
    h.node.set_validator_set(ValidatorSetParams {
        max_validators: 3,
        max_main_validators: 3,
        min_validators: 1,
    });
    h.node.set_participant_stakes(vec![tokens(400), tokens(450)]);
    let mut orchestrator = h.orchestrator(prudent_settings(90));

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.report.joined, vec![(election_id(), tokens(300))]);
}

#[test]
fn prudent_gate_waits_when_outbid() {
    let h = Harness::new();
    h.node.set_validator_set(ValidatorSetParams {
        max_validators: 3,
        max_main_validators: 3,
        min_validators: 1,
    });
    h.node
        .set_participant_stakes(vec![tokens(400), tokens(450), tokens(480), tokens(490)]);
    let mut orchestrator = h.orchestrator(prudent_settings(50));

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.report.error, None);
    assert!(outcome.report.joined.is_empty());
    assert!(h.wallet.submitted().is_empty());
    assert!(h.node.live_keys().is_empty());
    assert!(orchestrator.registry().is_empty());
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[test]
fn finished_election_stake_is_recovered_and_reused() {
    let h = Harness::with_registry(vec![joined_election(OLD_ELECTION, tokens(300))]);
    h.node.set_returned(ELECTOR, vec![tokens(300), tokens(12)]);
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.report.recovered, tokens(312));
    assert_eq!(h.node.recover_requests(), 1);
    assert_eq!(h.node.released(), vec![keys(1)]);

    let submitted = h.wallet.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].dest, Address::new(ELECTOR));
    assert_eq!(submitted[0].value, RECOVER_FEE);
    assert_eq!(submitted[0].payload, "recover-query");

    // The recovered amount joins the base for the new bid.
    assert_eq!(
        outcome.report.joined,
        vec![(election_id(), NanoTokens::new(393_600_000_000))]
    );

    let saved = h.store.snapshot().expect("registry saved");
    assert!(!saved.contains(&ElectionId::new(OLD_ELECTION)));
    assert!(saved.contains(&election_id()));

    let recoveries = h.telemetry.of(Category::StakeRecover);
    assert_eq!(recoveries.len(), 1);
    assert_eq!(recoveries[0].get("elector_addr"), Some(&json!(ELECTOR)));
    assert_eq!(h.telemetry.of(Category::FinishedElections).len(), 1);
}

#[test]
fn nothing_returned_keeps_the_election() {
    let h = Harness::with_registry(vec![joined_election(OLD_ELECTION, tokens(300))]);
    h.node.set_election_ids(&[]);
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();

    assert_eq!(outcome.report.recovered, NanoTokens::ZERO);
    assert_eq!(h.node.recover_requests(), 0);
    assert!(h.wallet.submitted().is_empty());
    assert!(orchestrator.registry().contains(&ElectionId::new(OLD_ELECTION)));
    assert!(h.node.released().is_empty());
}

#[test]
fn election_still_frozen_is_not_recovered() {
    // Validation ended, hold period has not.
    let h = Harness::with_registry(vec![joined_election("1699900000", tokens(300))]);
    h.node.set_returned(ELECTOR, vec![tokens(300)]);
    h.node.set_election_ids(&[]);
    let mut orchestrator = h.orchestrator(validator_settings());

    orchestrator.run_cycle();

    assert_eq!(h.node.recover_requests(), 0);
    assert_eq!(orchestrator.registry().len(), 1);
    assert_eq!(h.telemetry.of(Category::ActiveElections).len(), 1);
}

#[test]
fn failed_recovery_is_retried_next_cycle() {
    let h = Harness::with_registry(vec![joined_election(OLD_ELECTION, tokens(300))]);
    h.node.set_election_ids(&[]);
    h.node.set_returned(ELECTOR, vec![tokens(300)]);
    h.wallet.fail(WalletOp::Confirm, ChainError::Execution("custodian offline".into()));
    let mut orchestrator = h.orchestrator(validator_settings());

    let outcome = orchestrator.run_cycle();
    assert_eq!(outcome.report.error, None);
    assert_eq!(orchestrator.registry().len(), 1);

    h.wallet.clear_failure(WalletOp::Confirm);
    let outcome = orchestrator.run_cycle();
    assert_eq!(outcome.report.recovered, tokens(300));
    assert!(orchestrator.registry().is_empty());
}
