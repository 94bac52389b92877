//! End-to-end game flow against the mock ledger: entropy generation
//! (degraded to the local fallback), result logging, confirmation, and
//! history, all wired through the service container.

use async_trait::async_trait;
use onearcade::config::ArcadeConfig;
use onearcade::entropy::EntropyProvider;
use onearcade::errors::{ArcadeResult, ClassifiedError, ErrorKind};
use onearcade::ledger::{is_mock_digest, MockLedgerBackend};
use onearcade::resilience::{execute_independently, IndependentOptions};
use onearcade::services::ServiceBuilder;
use onearcade::types::{current_timestamp_ms, EntropyResult, GameResultRecord, GameType};
use serde_json::json;
use std::sync::Arc;

/// Oracle stand-in that is permanently down.
struct UnreachableOracle;

#[async_trait]
impl EntropyProvider for UnreachableOracle {
    async fn request_entropy(
        &self,
        _game_type: GameType,
        _game_config: &serde_json::Value,
    ) -> ArcadeResult<EntropyResult> {
        Err(ClassifiedError::network("oracle unreachable"))
    }

    fn source_label(&self) -> &str {
        "Unreachable Oracle"
    }
}

fn fast_config() -> ArcadeConfig {
    let mut config = ArcadeConfig::local_dev();
    config.entropy.retry_base_delay_ms = 1;
    config.ledger.submit_retry_delay_ms = 1;
    config.ledger.balance_retry_delay_ms = 1;
    config.ledger.confirmation_poll_interval_ms = 5;
    config.ledger.confirmation_timeout_ms = 500;
    config
}

fn record_from_entropy(entropy: &EntropyResult, player: &str) -> GameResultRecord {
    GameResultRecord {
        game_type: entropy.game_type,
        player_address: player.to_string(),
        bet_amount: 1_000_000_000,
        payout_amount: 1_850_000_000,
        game_config: entropy.game_config.clone(),
        result_data: json!({ "number": entropy.random_value % 37, "won": true }),
        entropy_value: entropy.random_value.to_string(),
        entropy_tx_hash: entropy.proof.transaction_hash.clone(),
        timestamp: current_timestamp_ms(),
    }
}

#[tokio::test]
async fn test_full_game_flow_survives_oracle_outage() {
    let backend = Arc::new(MockLedgerBackend::with_latency(1, 5));
    let container = ServiceBuilder::new()
        .with_config(fast_config())
        .with_entropy_provider(Arc::new(UnreachableOracle))
        .with_ledger_backend(backend.clone())
        .build()
        .unwrap();

    // The oracle never answers, so the source degrades to the local
    // fallback instead of blocking the game.
    let entropy = container
        .entropy()
        .generate_random(GameType::Roulette, json!({ "betType": "red" }))
        .await;
    assert!(entropy.is_fallback());
    assert_eq!(entropy.metadata.attempts, 2);
    assert_eq!(entropy.proof.network, "local");

    // The outcome still reaches the ledger with full provenance.
    let record = record_from_entropy(&entropy, "0xplayer1");
    let ledger = container.ledger();
    let digest = ledger.log_game_result(&record).await.unwrap();
    assert!(is_mock_digest(&digest));

    let receipt = ledger.wait_for_transaction(&digest, None).await.unwrap();
    assert!(receipt.succeeded());

    let history = ledger.query_game_history("0xplayer1", None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].entropy_value, record.entropy_value);
    assert_eq!(history[0].entropy_tx_hash, record.entropy_tx_hash);
    assert_eq!(backend.submitted_count(), 1);
}

#[tokio::test]
async fn test_history_is_newest_first_and_limited() {
    let container = ServiceBuilder::new()
        .with_config(fast_config())
        .with_entropy_provider(Arc::new(UnreachableOracle))
        .with_ledger_backend(Arc::new(MockLedgerBackend::with_latency(1, 3)))
        .build()
        .unwrap();
    let ledger = container.ledger();

    for bet in [1u64, 2, 3] {
        let entropy = container
            .entropy()
            .generate_random(GameType::Mines, json!({ "mines": 5 }))
            .await;
        let mut record = record_from_entropy(&entropy, "0xplayer2");
        record.bet_amount = bet;
        ledger.log_game_result(&record).await.unwrap();
    }

    let history = ledger.query_game_history("0xplayer2", None).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].bet_amount, 3);
    assert_eq!(history[2].bet_amount, 1);

    let limited = ledger
        .query_game_history("0xplayer2", Some(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].bet_amount, 3);
}

#[tokio::test]
async fn test_independent_operations_isolate_entropy_failure() {
    let container = ServiceBuilder::new()
        .with_config(fast_config())
        .with_entropy_provider(Arc::new(UnreachableOracle))
        .with_ledger_backend(Arc::new(MockLedgerBackend::with_latency(1, 3)))
        .build()
        .unwrap();
    let ledger = container.ledger();

    let outcomes = execute_independently(
        vec![
            Box::pin(async {
                Err(ClassifiedError::network("oracle unreachable")
                    .with_context("Requesting entropy"))
            }),
            Box::pin(async {
                let balance = ledger.get_balance("0xplayer3").await;
                Ok(json!({ "balance": balance }))
            }),
        ],
        &IndependentOptions::default(),
    )
    .await;

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].success());
    assert!(outcomes[1].success());
    let balance = outcomes[1].result.as_ref().unwrap();
    assert_eq!(balance["balance"], "10000000000000000000");
}

#[tokio::test]
async fn test_submission_breaker_opens_and_rejects() {
    struct DownLedger;

    #[async_trait]
    impl onearcade::ledger::LedgerBackend for DownLedger {
        fn is_connected(&self) -> bool {
            true
        }
        async fn get_coins(
            &self,
            _address: &str,
        ) -> ArcadeResult<Vec<onearcade::ledger::CoinObject>> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
        async fn execute_transaction(
            &self,
            _call: &onearcade::ledger::MoveCall,
        ) -> ArcadeResult<String> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
        async fn get_transaction_status(
            &self,
            _digest: &str,
        ) -> ArcadeResult<Option<onearcade::ledger::TransactionReceipt>> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
        async fn query_events(
            &self,
            _address: &str,
            _event_type: &str,
            _limit: usize,
        ) -> ArcadeResult<Vec<serde_json::Value>> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
    }

    let mut config = fast_config();
    config.ledger.breaker_failure_threshold = 2;
    config.ledger.submit_max_retries = 1;

    let container = ServiceBuilder::new()
        .with_config(config)
        .with_entropy_provider(Arc::new(UnreachableOracle))
        .with_ledger_backend(Arc::new(DownLedger))
        .build()
        .unwrap();
    let ledger = container.ledger();

    let entropy = container
        .entropy()
        .generate_random(GameType::Wheel, json!({ "segments": 10 }))
        .await;
    let record = record_from_entropy(&entropy, "0xplayer4");

    for _ in 0..2 {
        let err = ledger.log_game_result(&record).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    // The breaker is now open; further submissions are rejected before
    // the backend is reached, while reads keep working independently.
    let err = ledger.log_game_result(&record).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Connection);
    assert!(err.message.contains("temporarily unavailable"));

    assert_eq!(ledger.get_balance("0xplayer4").await, "0");
}
