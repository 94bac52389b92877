//! Game-ledger client for the primary chain (One Chain): balance
//! queries, result submission, confirmation polling, and history.
//!
//! The chain itself is abstracted behind [`LedgerBackend`]. A JSON-RPC
//! backend talks to a real fullnode; the mock backend is selected when
//! no ledger package is configured, so development flows are never
//! blocked by a missing deployment.

use crate::config::LedgerConfig;
use crate::errors::{ArcadeResult, ClassifiedError};
use crate::resilience::{retry_transient, CircuitBreaker, RetryOptions};
use crate::types::{current_timestamp_ms, explorer_tx_url, GameResultRecord, GameType};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use uuid::Uuid;

/// Shared clock object passed to every ledger-contract call.
const CLOCK_OBJECT_ID: &str = "0x6";

/// Prefix of every mock transaction digest: hex of "mock". Real digests
/// never start with this, so simulated submissions are recognizable in
/// logs and tests.
pub const MOCK_DIGEST_PREFIX: &str = "0x6d6f636b";

pub fn is_mock_digest(digest: &str) -> bool {
    digest.starts_with(MOCK_DIGEST_PREFIX)
}

/// A coin object owned by an address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinObject {
    pub coin_object_id: String,
    /// Balance in the smallest unit, as the RPC reports it.
    pub balance: String,
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub digest: String,
    pub status: String,
    pub checkpoint: Option<u64>,
    pub timestamp_ms: Option<u64>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == "success"
    }
}

/// One ledger-contract invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCall {
    pub package: String,
    pub module: String,
    pub function: String,
    pub arguments: Vec<Value>,
}

/// Chain access used by [`GameLedgerClient`].
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn get_coins(&self, address: &str) -> ArcadeResult<Vec<CoinObject>>;

    async fn execute_transaction(&self, call: &MoveCall) -> ArcadeResult<String>;

    /// `Ok(None)` means "not found yet" and is treated as transient.
    async fn get_transaction_status(&self, digest: &str)
        -> ArcadeResult<Option<TransactionReceipt>>;

    async fn query_events(
        &self,
        address: &str,
        event_type: &str,
        limit: usize,
    ) -> ArcadeResult<Vec<Value>>;
}

/// JSON-RPC 2.0 backend against a One Chain fullnode.
pub struct RpcLedgerBackend {
    http: reqwest::Client,
    rpc_url: String,
}

impl RpcLedgerBackend {
    pub fn new(rpc_url: &str) -> ArcadeResult<Self> {
        if rpc_url.trim().is_empty() {
            return Err(ClassifiedError::validation("Ledger RPC URL is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ClassifiedError::from)?;
        Ok(Self {
            http,
            rpc_url: rpc_url.to_string(),
        })
    }

    async fn rpc_call(&self, method: &str, params: Value) -> ArcadeResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(ClassifiedError::from)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ClassifiedError::network(format!(
                "Ledger RPC returned HTTP {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(ClassifiedError::rpc(format!(
                "Ledger RPC rejected {} with HTTP {}",
                method, status
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ClassifiedError::validation(format!("Malformed RPC response: {}", e)))?;

        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(ClassifiedError::rpc(format!(
                "RPC {} failed: {}",
                method, message
            )));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| ClassifiedError::validation("RPC response is missing result"))
    }
}

fn is_not_found(err: &ClassifiedError) -> bool {
    let lower = err.message.to_ascii_lowercase();
    lower.contains("not found") || lower.contains("could not find")
}

/// Accept u64 values the RPC encodes either as numbers or strings.
fn as_u64_lenient(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[async_trait]
impl LedgerBackend for RpcLedgerBackend {
    fn is_connected(&self) -> bool {
        true
    }

    async fn get_coins(&self, address: &str) -> ArcadeResult<Vec<CoinObject>> {
        let result = self.rpc_call("suix_getCoins", json!([address])).await?;
        let data = result
            .get("data")
            .cloned()
            .ok_or_else(|| ClassifiedError::validation("Coin query result is missing data"))?;
        serde_json::from_value(data).map_err(ClassifiedError::from)
    }

    async fn execute_transaction(&self, call: &MoveCall) -> ArcadeResult<String> {
        let result = self
            .rpc_call(
                "sui_executeTransactionBlock",
                json!([call, { "showEffects": true }]),
            )
            .await?;
        result
            .get("digest")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClassifiedError::transaction("Execution response is missing digest"))
    }

    async fn get_transaction_status(
        &self,
        digest: &str,
    ) -> ArcadeResult<Option<TransactionReceipt>> {
        let result = self
            .rpc_call(
                "sui_getTransactionBlock",
                json!([digest, { "showEffects": true }]),
            )
            .await;

        let result = match result {
            Ok(value) => value,
            Err(err) if is_not_found(&err) => return Ok(None),
            Err(err) => return Err(err),
        };

        let status = result
            .pointer("/effects/status/status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        Ok(Some(TransactionReceipt {
            digest: digest.to_string(),
            status,
            checkpoint: result.get("checkpoint").and_then(as_u64_lenient),
            timestamp_ms: result.get("timestampMs").and_then(as_u64_lenient),
        }))
    }

    async fn query_events(
        &self,
        address: &str,
        event_type: &str,
        limit: usize,
    ) -> ArcadeResult<Vec<Value>> {
        let result = self
            .rpc_call(
                "suix_queryEvents",
                json!([{ "MoveEventType": event_type }, null, limit, true]),
            )
            .await;

        let result = match result {
            Ok(value) => value,
            Err(err) if is_not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let events = result
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // The event filter is by type only; narrow to this player here.
        Ok(events
            .into_iter()
            .filter(|event| {
                event.get("sender").and_then(Value::as_str) == Some(address)
                    || event.pointer("/parsedJson/playerAddress").and_then(Value::as_str)
                        == Some(address)
            })
            .collect())
    }
}

struct SubmittedCall {
    digest: String,
    call: MoveCall,
    timestamp: u64,
}

/// In-memory stand-in for the ledger, used when no package address is
/// configured. Simulates submission latency and keeps submitted calls
/// so receipts and history queries work in development.
pub struct MockLedgerBackend {
    latency_ms: (u64, u64),
    submitted: Mutex<Vec<SubmittedCall>>,
}

impl MockLedgerBackend {
    pub fn new() -> Self {
        Self::with_latency(100, 400)
    }

    pub fn with_latency(min_ms: u64, max_ms: u64) -> Self {
        Self {
            latency_ms: (min_ms, max_ms.max(min_ms + 1)),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn mock_digest() -> String {
        format!("{}{}", MOCK_DIGEST_PREFIX, hex::encode(Uuid::new_v4().as_bytes()))
    }

    fn bytes_arg(value: &Value) -> Option<Vec<u8>> {
        value
            .as_array()?
            .iter()
            .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect()
    }

    /// Rebuild the event JSON a real ledger would have emitted for a
    /// submitted call, in the same shape `parse_game_event` consumes.
    fn call_to_event(submitted: &SubmittedCall, event_type: &str) -> Option<Value> {
        let args = &submitted.call.arguments;
        let player = args.first()?.as_str()?;
        let game_type = GameType::from_move_function(&submitted.call.function)?;
        let game_config: Value =
            serde_json::from_slice(&Self::bytes_arg(args.get(3)?)?).ok()?;
        let result_data: Value =
            serde_json::from_slice(&Self::bytes_arg(args.get(4)?)?).ok()?;
        let entropy_value = String::from_utf8(Self::bytes_arg(args.get(5)?)?).ok()?;
        let entropy_tx_hash = String::from_utf8(Self::bytes_arg(args.get(6)?)?).ok()?;

        Some(json!({
            "id": { "txDigest": submitted.digest },
            "type": event_type,
            "sender": player,
            "parsedJson": {
                "gameType": game_type.to_string(),
                "playerAddress": player,
                "betAmount": args.get(1)?.as_str()?,
                "payoutAmount": args.get(2)?.as_str()?,
                "gameConfig": game_config,
                "resultData": result_data,
                "entropyValue": entropy_value,
                "entropyTxHash": entropy_tx_hash,
                "timestamp": submitted.timestamp,
            },
        }))
    }
}

impl Default for MockLedgerBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerBackend for MockLedgerBackend {
    fn is_connected(&self) -> bool {
        true
    }

    async fn get_coins(&self, _address: &str) -> ArcadeResult<Vec<CoinObject>> {
        Ok(vec![CoinObject {
            coin_object_id: format!("{}coin", MOCK_DIGEST_PREFIX),
            balance: "10000000000000000000".to_string(),
        }])
    }

    async fn execute_transaction(&self, call: &MoveCall) -> ArcadeResult<String> {
        let (min, max) = self.latency_ms;
        let latency = rand::thread_rng().gen_range(min..max);
        sleep(Duration::from_millis(latency)).await;

        let digest = Self::mock_digest();
        tracing::info!(digest = %digest, function = %call.function, "mock ledger accepted transaction");
        self.submitted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(SubmittedCall {
                digest: digest.clone(),
                call: call.clone(),
                timestamp: current_timestamp_ms(),
            });
        Ok(digest)
    }

    async fn get_transaction_status(
        &self,
        digest: &str,
    ) -> ArcadeResult<Option<TransactionReceipt>> {
        let submitted = self.submitted.lock().unwrap_or_else(|p| p.into_inner());
        Ok(submitted
            .iter()
            .position(|s| s.digest == digest)
            .map(|index| TransactionReceipt {
                digest: digest.to_string(),
                status: "success".to_string(),
                checkpoint: Some(index as u64 + 1),
                timestamp_ms: submitted[index].timestamp.into(),
            }))
    }

    async fn query_events(
        &self,
        address: &str,
        event_type: &str,
        limit: usize,
    ) -> ArcadeResult<Vec<Value>> {
        let submitted = self.submitted.lock().unwrap_or_else(|p| p.into_inner());
        Ok(submitted
            .iter()
            .rev()
            .filter(|s| s.call.arguments.first().and_then(Value::as_str) == Some(address))
            .filter_map(|s| Self::call_to_event(s, event_type))
            .take(limit)
            .collect())
    }
}

/// Parse one game-result event into a record. `None` means the event is
/// malformed and should be skipped, not surfaced as an error.
pub fn parse_game_event(event: &Value) -> Option<GameResultRecord> {
    let parsed = event.get("parsedJson")?;
    let game_type = GameType::parse(parsed.get("gameType")?.as_str()?)?;
    let player_address = parsed.get("playerAddress")?.as_str()?.to_string();
    let bet_amount = as_u64_lenient(parsed.get("betAmount")?)?;
    let payout_amount = as_u64_lenient(parsed.get("payoutAmount")?)?;

    Some(GameResultRecord {
        game_type,
        player_address,
        bet_amount,
        payout_amount,
        game_config: parsed.get("gameConfig").cloned().unwrap_or(Value::Null),
        result_data: parsed.get("resultData").cloned().unwrap_or(Value::Null),
        entropy_value: parsed
            .get("entropyValue")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        entropy_tx_hash: parsed
            .get("entropyTxHash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        timestamp: parsed
            .get("timestamp")
            .and_then(as_u64_lenient)
            .unwrap_or(0),
    })
}

/// Client for submitting game outcomes to the primary chain and querying
/// history, isolated from the randomness oracle.
///
/// Policy: state-changing submission goes through the circuit breaker;
/// read-only operations (balance, confirmation polling, history) retry
/// transient failures but are never breaker-gated.
pub struct GameLedgerClient {
    backend: Arc<dyn LedgerBackend>,
    breaker: CircuitBreaker,
    config: LedgerConfig,
}

impl GameLedgerClient {
    pub fn new(backend: Arc<dyn LedgerBackend>, config: LedgerConfig) -> Self {
        let breaker = CircuitBreaker::new(
            config.breaker_failure_threshold,
            Duration::from_millis(config.breaker_reset_timeout_ms),
        );
        Self {
            backend,
            breaker,
            config,
        }
    }

    /// Select the backend from configuration: a configured package
    /// address means the real chain, otherwise the mock.
    pub fn from_config(config: LedgerConfig) -> ArcadeResult<Self> {
        let backend: Arc<dyn LedgerBackend> = if config.package_address.is_some() {
            Arc::new(RpcLedgerBackend::new(&config.rpc_url)?)
        } else {
            tracing::warn!("no ledger package configured, using mock ledger backend");
            Arc::new(MockLedgerBackend::new())
        };
        Ok(Self::new(backend, config))
    }

    pub fn breaker_state(&self) -> crate::resilience::CircuitBreakerState {
        self.breaker.state()
    }

    pub fn explorer_url(&self, digest: &str) -> String {
        explorer_tx_url(&self.config.explorer_base, digest)
    }

    /// Total balance across all coin objects, in the smallest unit.
    ///
    /// Returns `"0"` rather than failing on a transient RPC problem: a
    /// balance readout is never worth blocking a game flow over.
    pub async fn get_balance(&self, address: &str) -> String {
        if address.trim().is_empty() {
            tracing::warn!("balance requested for empty address");
            return "0".to_string();
        }

        let options = RetryOptions::new(
            self.config.balance_max_retries,
            Duration::from_millis(self.config.balance_retry_delay_ms),
        );
        let backend = Arc::clone(&self.backend);

        let result = retry_transient(
            move || {
                let backend = Arc::clone(&backend);
                async move {
                    let coins = backend.get_coins(address).await?;
                    let mut total: u128 = 0;
                    for coin in coins {
                        match coin.balance.parse::<u128>() {
                            Ok(balance) => total = total.saturating_add(balance),
                            Err(_) => {
                                tracing::warn!(
                                    coin = %coin.coin_object_id,
                                    balance = %coin.balance,
                                    "skipping coin with malformed balance"
                                );
                            }
                        }
                    }
                    Ok(total)
                }
            },
            &options,
        )
        .await;

        match result {
            Ok(total) => total.to_string(),
            Err(err) => {
                tracing::error!(address, error = %err, "balance lookup failed, reporting zero");
                "0".to_string()
            }
        }
    }

    /// Submit a transaction under the circuit breaker, retrying
    /// transient failures within each admitted attempt.
    pub async fn submit_transaction(&self, call: &MoveCall) -> ArcadeResult<String> {
        if !self.backend.is_connected() {
            return Err(ClassifiedError::connection("Ledger connection not established")
                .with_context("Submitting transaction"));
        }

        let options = RetryOptions::new(
            self.config.submit_max_retries,
            Duration::from_millis(self.config.submit_retry_delay_ms),
        );

        self.breaker
            .execute(|| async {
                retry_transient(|| self.backend.execute_transaction(call), &options).await
            })
            .await
    }

    /// Poll until the transaction is confirmed or the timeout elapses.
    ///
    /// "Not found" is transient while the fullnode indexes the digest.
    /// The timeout error deliberately notes the transaction may still be
    /// processing; a timeout is not evidence of failure.
    pub async fn wait_for_transaction(
        &self,
        digest: &str,
        timeout: Option<Duration>,
    ) -> ArcadeResult<TransactionReceipt> {
        let timeout = timeout.unwrap_or_else(|| self.config.confirmation_timeout());
        let poll_interval = self.config.confirmation_poll_interval();
        let deadline = Instant::now() + timeout;

        loop {
            match self.backend.get_transaction_status(digest).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {
                    tracing::debug!(digest, "transaction not yet indexed, continuing to poll");
                }
                Err(err) if err.is_retryable() => {
                    tracing::debug!(digest, error = %err, "status poll failed, continuing");
                }
                Err(err) => return Err(err.with_context("Confirming transaction")),
            }

            if Instant::now() + poll_interval > deadline {
                return Err(ClassifiedError::timeout(format!(
                    "Transaction {} was not confirmed within {}ms; it may still be processing",
                    digest,
                    timeout.as_millis()
                ))
                .with_context("Confirming transaction"));
            }
            sleep(poll_interval).await;
        }
    }

    /// Record a game outcome on the ledger. Validation fails fast before
    /// any network call is attempted.
    pub async fn log_game_result(&self, record: &GameResultRecord) -> ArcadeResult<String> {
        Self::validate_record(record)?;
        let call = self.build_game_call(record)?;
        let digest = self.submit_transaction(&call).await?;
        tracing::info!(
            digest = %digest,
            game_type = %record.game_type,
            player = %record.player_address,
            "game result logged"
        );
        Ok(digest)
    }

    fn validate_record(record: &GameResultRecord) -> ArcadeResult<()> {
        if record.player_address.trim().is_empty() {
            return Err(ClassifiedError::validation("playerAddress is required"));
        }
        if record.bet_amount == 0 {
            return Err(ClassifiedError::validation(
                "betAmount must be greater than zero",
            ));
        }
        Ok(())
    }

    fn build_game_call(&self, record: &GameResultRecord) -> ArcadeResult<MoveCall> {
        let package = self
            .config
            .package_address
            .clone()
            .unwrap_or_else(|| "0x0".to_string());
        let game_config = serde_json::to_vec(&record.game_config)?;
        let result_data = serde_json::to_vec(&record.result_data)?;

        Ok(MoveCall {
            package,
            module: self.config.module_name.clone(),
            function: record.game_type.move_function().to_string(),
            arguments: vec![
                json!(record.player_address),
                json!(record.bet_amount.to_string()),
                json!(record.payout_amount.to_string()),
                json!(game_config),
                json!(result_data),
                json!(record.entropy_value.as_bytes()),
                json!(record.entropy_tx_hash.as_bytes()),
                json!(CLOCK_OBJECT_ID),
            ],
        })
    }

    /// Game history for an address, newest first. Malformed events are
    /// skipped (logged, not surfaced); no matches is an empty list.
    pub async fn query_game_history(
        &self,
        address: &str,
        limit: Option<usize>,
    ) -> ArcadeResult<Vec<GameResultRecord>> {
        if address.trim().is_empty() {
            return Err(ClassifiedError::validation("playerAddress is required"));
        }
        let limit = limit.unwrap_or(self.config.history_default_limit);
        let event_type = self.config.event_type().unwrap_or_else(|| {
            format!("{}::{}", self.config.module_name, self.config.event_struct)
        });

        let events = self
            .backend
            .query_events(address, &event_type, limit)
            .await?;

        let mut records = Vec::with_capacity(events.len());
        for event in &events {
            match parse_game_event(event) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!("skipping malformed game-result event");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> LedgerConfig {
        LedgerConfig {
            submit_retry_delay_ms: 1,
            balance_retry_delay_ms: 1,
            confirmation_poll_interval_ms: 5,
            confirmation_timeout_ms: 200,
            ..Default::default()
        }
    }

    fn sample_record() -> GameResultRecord {
        GameResultRecord {
            game_type: GameType::Roulette,
            player_address: "0xplayer1".to_string(),
            bet_amount: 1_000_000_000,
            payout_amount: 2_000_000_000,
            game_config: json!({"betType": "red"}),
            result_data: json!({"number": 32, "won": true}),
            entropy_value: "123456789".to_string(),
            entropy_tx_hash: "0xfeedbeef".to_string(),
            timestamp: current_timestamp_ms(),
        }
    }

    fn mock_client() -> (Arc<MockLedgerBackend>, GameLedgerClient) {
        let backend = Arc::new(MockLedgerBackend::with_latency(1, 3));
        let client = GameLedgerClient::new(backend.clone(), fast_config());
        (backend, client)
    }

    /// Backend that fails every call with a retryable error.
    struct FailingBackend;

    #[async_trait]
    impl LedgerBackend for FailingBackend {
        fn is_connected(&self) -> bool {
            true
        }
        async fn get_coins(&self, _address: &str) -> ArcadeResult<Vec<CoinObject>> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
        async fn execute_transaction(&self, _call: &MoveCall) -> ArcadeResult<String> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
        async fn get_transaction_status(
            &self,
            _digest: &str,
        ) -> ArcadeResult<Option<TransactionReceipt>> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
        async fn query_events(
            &self,
            _address: &str,
            _event_type: &str,
            _limit: usize,
        ) -> ArcadeResult<Vec<Value>> {
            Err(ClassifiedError::network("fullnode unreachable"))
        }
    }

    struct DisconnectedBackend;

    #[async_trait]
    impl LedgerBackend for DisconnectedBackend {
        fn is_connected(&self) -> bool {
            false
        }
        async fn get_coins(&self, _address: &str) -> ArcadeResult<Vec<CoinObject>> {
            unreachable!("disconnected backend should never be called")
        }
        async fn execute_transaction(&self, _call: &MoveCall) -> ArcadeResult<String> {
            unreachable!("disconnected backend should never be called")
        }
        async fn get_transaction_status(
            &self,
            _digest: &str,
        ) -> ArcadeResult<Option<TransactionReceipt>> {
            unreachable!("disconnected backend should never be called")
        }
        async fn query_events(
            &self,
            _address: &str,
            _event_type: &str,
            _limit: usize,
        ) -> ArcadeResult<Vec<Value>> {
            unreachable!("disconnected backend should never be called")
        }
    }

    #[test]
    fn test_mock_digest_pattern() {
        let digest = MockLedgerBackend::mock_digest();
        assert!(is_mock_digest(&digest));
        assert!(!is_mock_digest("0xab34f2"));
    }

    #[tokio::test]
    async fn test_log_game_result_validates_before_network() {
        let (backend, client) = mock_client();

        let mut record = sample_record();
        record.player_address = "".to_string();
        let err = client.log_game_result(&record).await.unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Validation);

        let mut record = sample_record();
        record.bet_amount = 0;
        assert!(client.log_game_result(&record).await.is_err());

        assert_eq!(backend.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_log_wait_and_history_round_trip() {
        let (_, client) = mock_client();
        let record = sample_record();

        let digest = client.log_game_result(&record).await.unwrap();
        assert!(is_mock_digest(&digest));

        let receipt = client.wait_for_transaction(&digest, None).await.unwrap();
        assert!(receipt.succeeded());
        assert_eq!(receipt.digest, digest);

        let history = client
            .query_game_history(&record.player_address, None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        let replayed = &history[0];
        assert_eq!(replayed.game_type, GameType::Roulette);
        assert_eq!(replayed.bet_amount, record.bet_amount);
        assert_eq!(replayed.payout_amount, record.payout_amount);
        assert_eq!(replayed.game_config, record.game_config);
        assert_eq!(replayed.entropy_value, record.entropy_value);
        assert_eq!(replayed.entropy_tx_hash, record.entropy_tx_hash);
    }

    #[tokio::test]
    async fn test_history_is_empty_for_unknown_address() {
        let (_, client) = mock_client();
        client.log_game_result(&sample_record()).await.unwrap();

        let history = client.query_game_history("0xsomeoneelse", None).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_get_balance_sums_coins() {
        let (_, client) = mock_client();
        assert_eq!(client.get_balance("0xplayer1").await, "10000000000000000000");
    }

    #[tokio::test]
    async fn test_get_balance_returns_zero_on_failure() {
        let client = GameLedgerClient::new(Arc::new(FailingBackend), fast_config());
        assert_eq!(client.get_balance("0xplayer1").await, "0");
    }

    #[tokio::test]
    async fn test_submit_fails_fast_when_disconnected() {
        let client = GameLedgerClient::new(Arc::new(DisconnectedBackend), fast_config());
        let call = MoveCall {
            package: "0x0".to_string(),
            module: "game_ledger".to_string(),
            function: "log_roulette_game".to_string(),
            arguments: vec![],
        };
        let err = client.submit_transaction(&call).await.unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_breaker_opens_after_repeated_submit_failures() {
        let mut config = fast_config();
        config.breaker_failure_threshold = 2;
        config.submit_max_retries = 1;
        let client = GameLedgerClient::new(Arc::new(FailingBackend), config);

        for _ in 0..2 {
            assert!(client.log_game_result(&sample_record()).await.is_err());
        }
        assert_eq!(
            client.breaker_state().state,
            crate::resilience::BreakerState::Open
        );

        // Rejected without reaching the backend.
        let err = client.log_game_result(&sample_record()).await.unwrap_err();
        assert!(err.message.contains("temporarily unavailable"));
    }

    #[tokio::test]
    async fn test_wait_for_transaction_times_out_with_processing_note() {
        let (_, client) = mock_client();
        let err = client
            .wait_for_transaction("0xunknown", Some(Duration::from_millis(30)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Timeout);
        assert!(err.message.contains("may still be processing"));
    }

    #[test]
    fn test_parse_game_event_skips_malformed() {
        // Missing betAmount
        let event = json!({
            "parsedJson": {
                "gameType": "mines",
                "playerAddress": "0xp",
                "payoutAmount": "0",
            }
        });
        assert!(parse_game_event(&event).is_none());

        // Unknown game type
        let event = json!({
            "parsedJson": {
                "gameType": "poker",
                "playerAddress": "0xp",
                "betAmount": "1",
                "payoutAmount": "0",
            }
        });
        assert!(parse_game_event(&event).is_none());

        // Numeric amounts are accepted alongside string-encoded ones.
        let event = json!({
            "parsedJson": {
                "gameType": "wheel",
                "playerAddress": "0xp",
                "betAmount": 100,
                "payoutAmount": "250",
            }
        });
        let record = parse_game_event(&event).unwrap();
        assert_eq!(record.bet_amount, 100);
        assert_eq!(record.payout_amount, 250);
    }
}
