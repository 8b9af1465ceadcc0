//! Transfer orchestration against a scripted wallet engine.
//!
//! Covers the retry bound, pre-check ordering, cancellation checkpoints,
//! every timeout, and teardown on each exit path.

use std::time::{Duration, Instant};

use night_nullables::{utxo_id, NullEngine};
use night_types::{NetworkId, NetworkProfile, NightAmount, Timestamp, TokenType, TypesError, WalletAddress};
use night_wallet_core::{
    CancelToken, EngineError, SigningMaterial, TransferConfig, TransferError, TransferEvent,
    TransferOrchestrator, TransferRequest, TransferResult, TransferStage, MAX_SUBMIT_ATTEMPTS,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const NIGHT: u128 = 1_000_000;

fn recipient(network: NetworkId) -> String {
    WalletAddress::encode(network, [9; 32])
        .expect("valid address")
        .to_string()
}

fn fast_config() -> TransferConfig {
    TransferConfig {
        sync_timeout: Duration::from_millis(500),
        resync_timeout: Duration::from_millis(500),
        dust_timeout: Duration::from_millis(300),
        dust_poll_interval: Duration::from_millis(10),
        proof_timeout: Duration::from_millis(200),
        ttl: Duration::from_secs(1_800),
    }
}

fn request(amount: &str, cancel: &CancelToken) -> TransferRequest {
    TransferRequest {
        recipient: recipient(NetworkId::Undeployed),
        amount: amount.to_string(),
        material: SigningMaterial::from_bytes(vec![1; 32]).expect("seed"),
        cancel: cancel.clone(),
    }
}

async fn run(
    engine: &NullEngine,
    config: TransferConfig,
    request: TransferRequest,
) -> (Result<TransferResult, TransferError>, Vec<TransferEvent>) {
    let mut events = Vec::new();
    let outcome = {
        let mut orchestrator =
            TransferOrchestrator::new(engine, NetworkProfile::for_network(NetworkId::Undeployed))
                .with_config(config)
                .with_observer(|event| events.push(event.clone()));
        orchestrator.execute(request).await
    };
    (outcome, events)
}

// ---------------------------------------------------------------------------
// 1. Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transfer_submits_and_tears_down_once() {
    let engine = NullEngine::with_balance(250 * NIGHT);
    let cancel = CancelToken::new();
    let before = Timestamp::now();

    let (outcome, events) = run(&engine, fast_config(), request("100", &cancel)).await;

    let result = outcome.expect("transfer succeeds");
    assert_eq!(result.tx_id, "tx-1");
    assert_eq!(result.amount, NightAmount::from_minor(100_000_000));

    let calls = engine.calls();
    assert_eq!((calls.start, calls.stop), (1, 1));
    assert_eq!((calls.build, calls.sign, calls.prove, calls.submit), (1, 1, 1, 1));
    assert_eq!(calls.register_dust, 0);
    assert_eq!(calls.resync, 0);

    let recipes = engine.recipes();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].amount, 100_000_000);
    assert_eq!(recipes[0].token_type, TokenType::NATIVE);
    assert_eq!(recipes[0].recipient, recipient(NetworkId::Undeployed));
    assert!(recipes[0].ttl.as_secs() >= before.as_secs() + 1_800);

    assert!(events.contains(&TransferEvent::Submitted { tx_id: "tx-1".into() }));
    assert_eq!(events.last(), Some(&TransferEvent::Stage(TransferStage::TearingDown)));
}

#[tokio::test]
async fn delayed_sync_reports_progress_before_proceeding() {
    let engine = NullEngine::with_balance(10 * NIGHT).sync_after(Duration::from_millis(20));
    let cancel = CancelToken::new();

    let (outcome, events) = run(&engine, fast_config(), request("1.5", &cancel)).await;

    assert_eq!(outcome.unwrap().amount.minor(), 1_500_000);
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            TransferEvent::SyncProgress { applied, highest } => Some((*applied, *highest)),
            _ => None,
        })
        .collect();
    assert_eq!(progress.first(), Some(&(0, 1)));
    assert_eq!(progress.last(), Some(&(1, 1)));
}

#[tokio::test]
async fn engine_warnings_surface_as_events() {
    let engine = NullEngine::with_balance(10 * NIGHT).warn_on_start("indexer lagging");
    let cancel = CancelToken::new();

    let (outcome, events) = run(&engine, fast_config(), request("1", &cancel)).await;

    assert!(outcome.is_ok());
    assert!(events.contains(&TransferEvent::Warning("indexer lagging".into())));
}

// ---------------------------------------------------------------------------
// 2. Stale-input retry bound
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_input_on_every_attempt_exhausts_after_three() {
    let engine = NullEngine::with_balance(250 * NIGHT).always_stale();
    let cancel = CancelToken::new();

    let (outcome, events) = run(&engine, fast_config(), request("100", &cancel)).await;

    match outcome.unwrap_err() {
        TransferError::ConflictExhausted { attempts, .. } => assert_eq!(attempts, MAX_SUBMIT_ATTEMPTS),
        other => panic!("expected exhausted conflict, got {other:?}"),
    }
    let calls = engine.calls();
    assert_eq!(calls.submit, 3);
    assert_eq!(calls.resync, 2);
    assert_eq!(calls.build, 3);
    assert_eq!(calls.stop, 1);

    let retries: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            TransferEvent::Retrying { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![1, 2]);
}

#[tokio::test]
async fn stale_input_recovers_within_bound() {
    let engine = NullEngine::with_balance(250 * NIGHT).stale_submits(2);
    let cancel = CancelToken::new();

    let (outcome, _) = run(&engine, fast_config(), request("100", &cancel)).await;

    assert_eq!(outcome.unwrap().tx_id, "tx-3");
    assert_eq!(engine.calls().resync, 2);
    assert_eq!(engine.calls().stop, 1);
}

#[tokio::test]
async fn stalled_resync_times_out_on_the_resync_budget() {
    let engine = NullEngine::with_balance(250 * NIGHT).always_stale().stall_resync();
    let cancel = CancelToken::new();
    let config = TransferConfig {
        sync_timeout: Duration::from_secs(5),
        resync_timeout: Duration::from_millis(50),
        ..fast_config()
    };

    let started = Instant::now();
    let (outcome, events) = run(&engine, config, request("100", &cancel)).await;

    assert!(matches!(
        outcome.unwrap_err(),
        TransferError::SyncTimeout { budget } if budget == Duration::from_millis(50)
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
    let calls = engine.calls();
    assert_eq!((calls.submit, calls.resync, calls.build), (1, 1, 1));
    assert_eq!(calls.stop, 1);
    assert!(events.contains(&TransferEvent::Stage(TransferStage::Resyncing)));
}

#[tokio::test]
async fn cancel_after_stale_submit_skips_the_resync() {
    let cancel = CancelToken::new();
    let engine = NullEngine::with_balance(250 * NIGHT)
        .always_stale()
        .cancel_on_stale(cancel.clone());

    let (outcome, events) = run(&engine, fast_config(), request("100", &cancel)).await;

    assert!(outcome.unwrap_err().is_cancelled());
    let calls = engine.calls();
    assert_eq!((calls.build, calls.submit, calls.resync), (1, 1, 0));
    assert_eq!(calls.stop, 1);
    assert!(events.iter().any(|e| matches!(e, TransferEvent::Retrying { attempt: 1, .. })));
}

#[tokio::test]
async fn cancel_during_resync_stops_before_rebuilding() {
    let cancel = CancelToken::new();
    let engine = NullEngine::with_balance(250 * NIGHT)
        .stale_submits(1)
        .cancel_on_resync(cancel.clone());

    let (outcome, _) = run(&engine, fast_config(), request("100", &cancel)).await;

    assert!(outcome.unwrap_err().is_cancelled());
    let calls = engine.calls();
    assert_eq!((calls.build, calls.submit, calls.resync), (1, 1, 1));
    assert_eq!(calls.stop, 1);
}

// ---------------------------------------------------------------------------
// 3. Balance and fee tokens
// ---------------------------------------------------------------------------

#[tokio::test]
async fn insufficient_balance_short_circuits_before_fee_tokens() {
    let engine = NullEngine::with_balance(50 * NIGHT).without_dust(vec![(utxo_id(1, 0), 50 * NIGHT)]);
    let cancel = CancelToken::new();

    let (outcome, events) = run(&engine, fast_config(), request("100", &cancel)).await;

    match outcome.unwrap_err() {
        TransferError::InsufficientBalance { available, requested } => {
            assert_eq!(available, "50");
            assert_eq!(requested, "100");
        }
        other => panic!("expected insufficient balance, got {other:?}"),
    }
    let calls = engine.calls();
    assert_eq!(calls.register_dust, 0);
    assert_eq!(calls.build, 0);
    assert_eq!(calls.stop, 1);
    assert!(!events.contains(&TransferEvent::Stage(TransferStage::EnsuringFeeTokens)));
}

#[tokio::test]
async fn whole_balance_can_be_sent() {
    let engine = NullEngine::with_balance(100 * NIGHT);
    let cancel = CancelToken::new();

    let (outcome, _) = run(&engine, fast_config(), request("100", &cancel)).await;

    assert_eq!(outcome.unwrap().amount, NightAmount::from_minor(100 * NIGHT));
    assert_eq!(engine.calls().submit, 1);
}

#[tokio::test]
async fn unregistered_utxos_are_registered_then_awaited() {
    let engine = NullEngine::with_balance(80 * NIGHT)
        .without_dust(vec![(utxo_id(1, 0), 30 * NIGHT), (utxo_id(2, 1), 50 * NIGHT)])
        .dust_after_registration(5_000, Duration::from_millis(30));
    let cancel = CancelToken::new();

    let (outcome, events) = run(&engine, fast_config(), request("20", &cancel)).await;

    assert!(outcome.is_ok());
    assert_eq!(engine.calls().register_dust, 1);
    assert_eq!(engine.registered(), vec![utxo_id(1, 0), utxo_id(2, 1)]);
    assert!(events.iter().any(|e| matches!(e, TransferEvent::DustRegistered { utxos: 2, .. })));
    assert!(events.iter().any(|e| matches!(e, TransferEvent::DustWaiting { .. })));
    let state = engine.current_state().expect("session started");
    assert!(state.night_utxos.iter().all(|u| u.registered_for_dust));
}

#[tokio::test]
async fn fee_tokens_that_never_arrive_time_out() {
    // Nothing to register: the wait still runs its full budget.
    let engine = NullEngine::with_balance(80 * NIGHT).without_dust(vec![]);
    let cancel = CancelToken::new();
    let config = TransferConfig {
        dust_timeout: Duration::from_millis(100),
        ..fast_config()
    };

    let started = Instant::now();
    let (outcome, _) = run(&engine, config, request("20", &cancel)).await;

    match outcome.unwrap_err() {
        TransferError::FeeTokenTimeout { budget } => assert_eq!(budget, Duration::from_millis(100)),
        other => panic!("expected fee-token timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(engine.calls().register_dust, 0);
    assert_eq!(engine.calls().build, 0);
    assert_eq!(engine.calls().stop, 1);
}

// ---------------------------------------------------------------------------
// 4. Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_during_fee_token_wait_never_signs() {
    let engine = NullEngine::with_balance(80 * NIGHT).without_dust(vec![(utxo_id(1, 0), 80 * NIGHT)]);
    let cancel = CancelToken::new();
    let config = TransferConfig {
        dust_timeout: Duration::from_secs(10),
        dust_poll_interval: Duration::from_secs(5),
        ..fast_config()
    };

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let (outcome, _) = run(&engine, config, request("20", &cancel)).await;

    let err = outcome.unwrap_err();
    assert!(err.is_cancelled());
    // The poll sleep is interrupted, not waited out.
    assert!(started.elapsed() < Duration::from_secs(5));

    let calls = engine.calls();
    assert_eq!(calls.register_dust, 1);
    assert_eq!((calls.build, calls.sign, calls.prove, calls.submit), (0, 0, 0, 0));
    assert_eq!(calls.stop, 1);
}

#[tokio::test]
async fn cancelled_before_start_never_touches_the_engine() {
    let engine = NullEngine::with_balance(80 * NIGHT);
    let cancel = CancelToken::new();
    cancel.cancel();

    let (outcome, _) = run(&engine, fast_config(), request("1", &cancel)).await;

    assert!(outcome.unwrap_err().is_cancelled());
    assert_eq!(engine.calls().start, 0);
    assert_eq!(engine.calls().stop, 0);
}

// ---------------------------------------------------------------------------
// 5. Timeouts and engine failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initial_sync_timeout_is_fatal() {
    let engine = NullEngine::with_balance(80 * NIGHT).never_synced();
    let cancel = CancelToken::new();
    let config = TransferConfig {
        sync_timeout: Duration::from_millis(50),
        ..fast_config()
    };

    let (outcome, _) = run(&engine, config, request("1", &cancel)).await;

    assert!(matches!(
        outcome.unwrap_err(),
        TransferError::SyncTimeout { budget } if budget == Duration::from_millis(50)
    ));
    assert_eq!(engine.calls().build, 0);
    assert_eq!(engine.calls().stop, 1);
}

#[tokio::test]
async fn slow_proof_times_out_without_submitting() {
    let engine = NullEngine::with_balance(80 * NIGHT).slow_prove(Duration::from_secs(2));
    let cancel = CancelToken::new();
    let config = TransferConfig {
        proof_timeout: Duration::from_millis(50),
        ..fast_config()
    };

    let (outcome, _) = run(&engine, config, request("1", &cancel)).await;

    assert!(matches!(outcome.unwrap_err(), TransferError::ProofTimeout { .. }));
    assert_eq!(engine.calls().prove, 1);
    assert_eq!(engine.calls().submit, 0);
    assert_eq!(engine.calls().stop, 1);
}

#[tokio::test]
async fn engine_start_failure_skips_teardown() {
    let engine = NullEngine::with_balance(80 * NIGHT).failing_start(EngineError::Transport {
        endpoint: "http://127.0.0.1:9955".into(),
        reason: "connection refused".into(),
    });
    let cancel = CancelToken::new();

    let (outcome, _) = run(&engine, fast_config(), request("1", &cancel)).await;

    assert!(matches!(
        outcome.unwrap_err(),
        TransferError::Engine(EngineError::Transport { .. })
    ));
    assert_eq!(engine.calls().start, 1);
    assert_eq!(engine.calls().stop, 0);
}

#[tokio::test]
async fn stop_failure_does_not_mask_the_outcome() {
    let engine = NullEngine::with_balance(80 * NIGHT)
        .failing_stop(EngineError::Other("already stopped".into()));
    let cancel = CancelToken::new();

    let (outcome, _) = run(&engine, fast_config(), request("1", &cancel)).await;

    assert!(outcome.is_ok());
    assert_eq!(engine.calls().stop, 1);
}

// ---------------------------------------------------------------------------
// 6. Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_amounts_are_rejected_before_starting() {
    let engine = NullEngine::with_balance(80 * NIGHT);
    let cancel = CancelToken::new();

    let (zero, _) = run(&engine, fast_config(), request("0", &cancel)).await;
    assert!(matches!(
        zero.unwrap_err(),
        TransferError::Validation(TypesError::NonPositiveAmount)
    ));

    let (precise, _) = run(&engine, fast_config(), request("0.0000001", &cancel)).await;
    assert!(matches!(
        precise.unwrap_err(),
        TransferError::Validation(TypesError::ExcessPrecision { .. })
    ));

    let (garbage, _) = run(&engine, fast_config(), request("ten", &cancel)).await;
    assert!(matches!(
        garbage.unwrap_err(),
        TransferError::Validation(TypesError::InvalidAmount(_))
    ));

    assert_eq!(engine.calls().start, 0);
}

#[tokio::test]
async fn recipient_on_another_network_is_rejected() {
    let engine = NullEngine::with_balance(80 * NIGHT);
    let cancel = CancelToken::new();
    let mut req = request("1", &cancel);
    req.recipient = recipient(NetworkId::Preprod);

    let (outcome, _) = run(&engine, fast_config(), req).await;

    assert!(matches!(
        outcome.unwrap_err(),
        TransferError::Validation(TypesError::NetworkMismatch { .. })
    ));
    assert_eq!(engine.calls().start, 0);
}
