//! Entropy sourcing: a verifiable random value from the randomness
//! oracle on the secondary chain, with a local fallback so game flow is
//! never blocked by oracle downtime.
//!
//! The oracle and the fallback are separate [`EntropyProvider`]
//! implementations; which one produced a value is always visible in the
//! result's `metadata.source`.

use crate::config::EntropyConfig;
use crate::errors::{ArcadeResult, ClassifiedError};
use crate::resilience::{retry_with_backoff, RetryOptions};
use crate::types::{current_timestamp_ms, explorer_tx_url, EntropyMetadata, EntropyProof, EntropyResult, GameType};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source label attached to locally generated entropy. Downstream
/// auditing keys off the word "Fallback".
pub const FALLBACK_SOURCE: &str = "Local Fallback (non-oracle)";

/// A strategy for producing a random value with provenance.
#[async_trait]
pub trait EntropyProvider: Send + Sync {
    async fn request_entropy(
        &self,
        game_type: GameType,
        game_config: &serde_json::Value,
    ) -> ArcadeResult<EntropyResult>;

    fn source_label(&self) -> &str;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OracleResponse {
    success: bool,
    random_value: Option<u64>,
    entropy_proof: Option<OracleProof>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OracleProof {
    request_id: Option<String>,
    sequence_number: Option<u64>,
    transaction_hash: Option<String>,
    block_number: Option<u64>,
    network: Option<String>,
    explorer_url: Option<String>,
    timestamp: Option<u64>,
}

/// Requests randomness from the oracle HTTP endpoint, which performs the
/// on-chain entropy request on the secondary network.
pub struct OracleEntropyProvider {
    http: reqwest::Client,
    endpoint: String,
    network: String,
    explorer_base: String,
    label: String,
}

impl OracleEntropyProvider {
    pub fn new(config: &EntropyConfig) -> ArcadeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(ClassifiedError::from)?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/api/generate-entropy",
                config.oracle_url.trim_end_matches('/')
            ),
            network: config.network.clone(),
            explorer_base: config.explorer_base.clone(),
            label: format!("Pyth Entropy ({})", config.network),
        })
    }
}

#[async_trait]
impl EntropyProvider for OracleEntropyProvider {
    async fn request_entropy(
        &self,
        game_type: GameType,
        game_config: &serde_json::Value,
    ) -> ArcadeResult<EntropyResult> {
        let body = serde_json::json!({
            "gameType": game_type.to_string(),
            "gameConfig": game_config,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(ClassifiedError::from)?;

        let status = response.status();
        if status.is_server_error() {
            // Transient oracle-side trouble: worth retrying.
            return Err(ClassifiedError::network(format!(
                "Entropy oracle returned HTTP {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(ClassifiedError::contract(format!(
                "Entropy oracle rejected request with HTTP {}",
                status
            )));
        }

        let payload: OracleResponse = response.json().await.map_err(|e| {
            ClassifiedError::validation(format!("Malformed oracle response: {}", e))
        })?;

        if !payload.success {
            return Err(ClassifiedError::contract(format!(
                "Entropy oracle reported failure: {}",
                payload.error.as_deref().unwrap_or("no reason given")
            )));
        }

        let random_value = payload.random_value.ok_or_else(|| {
            ClassifiedError::validation("Oracle response is missing randomValue")
        })?;

        let proof = payload.entropy_proof.unwrap_or(OracleProof {
            request_id: None,
            sequence_number: None,
            transaction_hash: None,
            block_number: None,
            network: None,
            explorer_url: None,
            timestamp: None,
        });

        let transaction_hash = proof.transaction_hash.unwrap_or_default();
        let explorer_url = proof
            .explorer_url
            .unwrap_or_else(|| explorer_tx_url(&self.explorer_base, &transaction_hash));
        let now = current_timestamp_ms();

        Ok(EntropyResult {
            random_value,
            proof: EntropyProof {
                request_id: proof.request_id.unwrap_or_default(),
                sequence_number: proof.sequence_number.unwrap_or(0),
                transaction_hash,
                block_number: proof.block_number.unwrap_or(0),
                network: proof.network.unwrap_or_else(|| self.network.clone()),
                explorer_url,
                timestamp: proof.timestamp.unwrap_or(now),
            },
            game_type,
            game_config: game_config.clone(),
            metadata: EntropyMetadata {
                source: self.label.clone(),
                generated_at: now,
                attempts: 1,
            },
        })
    }

    fn source_label(&self) -> &str {
        &self.label
    }
}

/// Local pseudo-random entropy, substituted when the oracle cannot be
/// reached. Trades verifiability for availability; the result is tagged
/// so consumers can treat it differently for auditing.
#[derive(Default)]
pub struct FallbackEntropyProvider;

impl FallbackEntropyProvider {
    pub fn new() -> Self {
        Self
    }

    /// Infallible generation. The request id is a deterministic hash of
    /// `(game_type, timestamp)` for traceability.
    pub fn generate(&self, game_type: GameType, game_config: serde_json::Value) -> EntropyResult {
        let now = current_timestamp_ms();
        let digest = Sha256::digest(format!("{}:{}", game_type, now).as_bytes());

        let random_value = rand::thread_rng().gen_range(0..u32::MAX as u64);

        EntropyResult {
            random_value,
            proof: EntropyProof {
                request_id: hex::encode(&digest[..16]),
                sequence_number: 0,
                transaction_hash: format!("0x{}", hex::encode(digest)),
                block_number: 0,
                network: "local".to_string(),
                explorer_url: String::new(),
                timestamp: now,
            },
            game_type,
            game_config,
            metadata: EntropyMetadata {
                source: FALLBACK_SOURCE.to_string(),
                generated_at: now,
                attempts: 0,
            },
        }
    }
}

#[async_trait]
impl EntropyProvider for FallbackEntropyProvider {
    async fn request_entropy(
        &self,
        game_type: GameType,
        game_config: &serde_json::Value,
    ) -> ArcadeResult<EntropyResult> {
        Ok(self.generate(game_type, game_config.clone()))
    }

    fn source_label(&self) -> &str {
        FALLBACK_SOURCE
    }
}

/// Facade over the configured provider plus the local fallback.
///
/// `generate_random` always resolves: retryable oracle failures are
/// retried per the configured options, and exhaustion or a
/// non-retryable failure degrades to the fallback provider.
pub struct EntropySource {
    provider: Arc<dyn EntropyProvider>,
    fallback: FallbackEntropyProvider,
    retry_options: RetryOptions,
}

impl EntropySource {
    pub fn new(provider: Arc<dyn EntropyProvider>, retry_options: RetryOptions) -> Self {
        Self {
            provider,
            fallback: FallbackEntropyProvider::new(),
            retry_options,
        }
    }

    pub fn from_config(config: &EntropyConfig) -> ArcadeResult<Self> {
        let provider = OracleEntropyProvider::new(config)?;
        Ok(Self::new(
            Arc::new(provider),
            RetryOptions::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        ))
    }

    pub async fn generate_random(
        &self,
        game_type: GameType,
        game_config: serde_json::Value,
    ) -> EntropyResult {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                self.provider.request_entropy(game_type, &game_config)
            },
            &self.retry_options,
            |e| e.is_retryable(),
            |_, _| {},
        )
        .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match result {
            Ok(mut result) => {
                result.metadata.attempts = attempts;
                tracing::debug!(
                    game_type = %game_type,
                    attempts,
                    source = %result.metadata.source,
                    "entropy generated"
                );
                result
            }
            Err(err) => {
                tracing::warn!(
                    game_type = %game_type,
                    attempts,
                    error = %err,
                    "oracle entropy unavailable, degrading to local fallback"
                );
                let mut result = self.fallback.generate(game_type, game_config);
                result.metadata.attempts = attempts;
                result
            }
        }
    }
}
