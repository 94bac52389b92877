//! Configuration management with validation and defaults
//!
//! Centralized configuration for the entropy and ledger services. The
//! effect of each parameter is part of the service contract; loading is
//! plain TOML plus `ONEARCADE_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the OneArcade core services.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArcadeConfig {
    pub entropy: EntropyConfig,
    pub ledger: LedgerConfig,
    pub resilience: ResilienceConfig,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            entropy: EntropyConfig::default(),
            ledger: LedgerConfig::default(),
            resilience: ResilienceConfig::default(),
        }
    }
}

/// Randomness-oracle (secondary chain) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntropyConfig {
    /// Base URL of the service exposing `POST /api/generate-entropy`.
    pub oracle_url: String,
    /// Secondary network name, for proofs and labels.
    pub network: String,
    /// Entropy contract address on the secondary chain.
    pub contract_address: String,
    /// Explorer base for the secondary chain.
    pub explorer_base: String,
    pub request_timeout_ms: u64,
    /// Total oracle attempts before degrading to the local fallback.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            oracle_url: "http://localhost:3000".to_string(),
            network: "Arbitrum Sepolia".to_string(),
            contract_address: "0x549Ebba8036Ab746611B4fFA1423eb0A4Df61440".to_string(),
            explorer_base: "https://sepolia.arbiscan.io".to_string(),
            request_timeout_ms: 15_000,
            max_retries: 2,
            retry_base_delay_ms: 1_000,
        }
    }
}

/// Primary-chain (One Chain) ledger configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    /// Deployed ledger package address. When absent, the mock backend
    /// is selected so development flows are not blocked.
    pub package_address: Option<String>,
    pub module_name: String,
    /// Move event struct emitted per logged game result.
    pub event_struct: String,
    pub explorer_base: String,
    pub balance_max_retries: u32,
    pub balance_retry_delay_ms: u64,
    pub submit_max_retries: u32,
    pub submit_retry_delay_ms: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_reset_timeout_ms: u64,
    pub confirmation_poll_interval_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub history_default_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc-testnet.onelabs.cc".to_string(),
            package_address: None,
            module_name: "game_ledger".to_string(),
            event_struct: "GameResultLogged".to_string(),
            explorer_base: "https://onescan.cc/testnet".to_string(),
            balance_max_retries: 2,
            balance_retry_delay_ms: 500,
            submit_max_retries: 2,
            submit_retry_delay_ms: 1_000,
            breaker_failure_threshold: 5,
            breaker_reset_timeout_ms: 60_000,
            confirmation_poll_interval_ms: 1_000,
            confirmation_timeout_ms: 30_000,
            history_default_limit: 50,
        }
    }
}

impl LedgerConfig {
    /// Fully-qualified Move event type, when a package is configured.
    pub fn event_type(&self) -> Option<String> {
        self.package_address
            .as_ref()
            .map(|pkg| format!("{}::{}::{}", pkg, self.module_name, self.event_struct))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_interval_ms)
    }
}

/// Defaults for the shared retry/backoff primitives.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ResilienceConfig {
    pub fn to_retry_options(&self) -> crate::resilience::RetryOptions {
        crate::resilience::RetryOptions {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

impl ArcadeConfig {
    /// Configuration for the public testnets both chains run on.
    pub fn testnet() -> Self {
        Self::default()
    }

    /// Local development: mock ledger, local oracle endpoint.
    pub fn local_dev() -> Self {
        Self {
            entropy: EntropyConfig {
                oracle_url: "http://localhost:3000".to_string(),
                ..Default::default()
            },
            ledger: LedgerConfig {
                package_address: None,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entropy.oracle_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("entropy.oracle_url".to_string()));
        }
        if self.ledger.rpc_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("ledger.rpc_url".to_string()));
        }
        if self.entropy.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "entropy.request_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.entropy.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "entropy.max_retries must be > 0".to_string(),
            ));
        }
        if self.ledger.breaker_failure_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "ledger.breaker_failure_threshold must be > 0".to_string(),
            ));
        }
        if self.ledger.confirmation_poll_interval_ms == 0
            || self.ledger.confirmation_timeout_ms == 0
        {
            return Err(ConfigError::InvalidValue(
                "ledger confirmation intervals must be > 0".to_string(),
            ));
        }
        if self.ledger.confirmation_poll_interval_ms > self.ledger.confirmation_timeout_ms {
            return Err(ConfigError::LogicalInconsistency(
                "confirmation poll interval exceeds the confirmation timeout".to_string(),
            ));
        }
        if self.resilience.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue(
                "resilience.backoff_multiplier must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables.
    pub fn load(&self) -> Result<ArcadeConfig, ConfigError> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            ArcadeConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> Result<ArcadeConfig, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(&self, config: &mut ArcadeConfig) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("ONEARCADE_ORACLE_URL") {
            config.entropy.oracle_url = url;
        }
        if let Ok(network) = env::var("ONEARCADE_ENTROPY_NETWORK") {
            config.entropy.network = network;
        }
        if let Ok(address) = env::var("ONEARCADE_ENTROPY_CONTRACT") {
            config.entropy.contract_address = address;
        }
        if let Ok(url) = env::var("ONEARCADE_LEDGER_RPC_URL") {
            config.ledger.rpc_url = url;
        }
        if let Ok(package) = env::var("ONEARCADE_LEDGER_PACKAGE") {
            config.ledger.package_address = if package.trim().is_empty() {
                None
            } else {
                Some(package)
            };
        }
        if let Ok(timeout) = env::var("ONEARCADE_ENTROPY_TIMEOUT_MS") {
            config.entropy.request_timeout_ms = timeout.parse().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "ONEARCADE_ENTROPY_TIMEOUT_MS: '{}' is not a number",
                    timeout
                ))
            })?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Configuration logical inconsistency: {0}")]
    LogicalInconsistency(String),
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

impl From<ConfigError> for crate::errors::ClassifiedError {
    fn from(e: ConfigError) -> Self {
        crate::errors::ClassifiedError::validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ArcadeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_local_dev_selects_mock_ledger() {
        let config = ArcadeConfig::local_dev();
        assert!(config.ledger.package_address.is_none());
        assert!(config.ledger.event_type().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_event_type_is_fully_qualified() {
        let mut config = ArcadeConfig::default();
        config.ledger.package_address = Some("0xabc".to_string());
        assert_eq!(
            config.ledger.event_type().unwrap(),
            "0xabc::game_ledger::GameResultLogged"
        );
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = ArcadeConfig::default();
        config.entropy.oracle_url = "".to_string();
        assert!(config.validate().is_err());

        let mut config = ArcadeConfig::default();
        config.ledger.breaker_failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timing_consistency_validation() {
        let mut config = ArcadeConfig::default();
        config.ledger.confirmation_poll_interval_ms = 60_000;
        config.ledger.confirmation_timeout_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_options_conversion() {
        let options = ResilienceConfig::default().to_retry_options();
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.base_delay, Duration::from_millis(1000));
        assert_eq!(options.max_delay, Duration::from_millis(10_000));
    }
}
