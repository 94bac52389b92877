//! Service layer wiring the entropy source and ledger client together
//!
//! A [`ServiceContainer`] owns the configured services; the
//! [`ServiceBuilder`] assembles one from configuration with optional
//! overrides so tests can inject scripted providers and backends.

use crate::config::{ArcadeConfig, ConfigLoader};
use crate::entropy::{EntropyProvider, EntropySource};
use crate::errors::ArcadeResult;
use crate::ledger::{GameLedgerClient, LedgerBackend};
use crate::resilience::RetryOptions;
use std::sync::Arc;
use std::time::Duration;

/// Service container for the core game-flow services.
pub struct ServiceContainer {
    config: ArcadeConfig,
    entropy: Arc<EntropySource>,
    ledger: Arc<GameLedgerClient>,
}

impl ServiceContainer {
    /// Create a container with services built from the configuration.
    pub fn new(config: ArcadeConfig) -> ArcadeResult<Self> {
        let entropy = Arc::new(EntropySource::from_config(&config.entropy)?);
        let ledger = Arc::new(GameLedgerClient::from_config(config.ledger.clone())?);
        Ok(Self {
            config,
            entropy,
            ledger,
        })
    }

    pub fn config(&self) -> &ArcadeConfig {
        &self.config
    }

    pub fn entropy(&self) -> Arc<EntropySource> {
        Arc::clone(&self.entropy)
    }

    pub fn ledger(&self) -> Arc<GameLedgerClient> {
        Arc::clone(&self.ledger)
    }
}

/// Builder for configured service containers with test overrides.
pub struct ServiceBuilder {
    config_path: Option<String>,
    config_override: Option<ArcadeConfig>,
    entropy_override: Option<Arc<dyn EntropyProvider>>,
    ledger_override: Option<Arc<dyn LedgerBackend>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            config_path: None,
            config_override: None,
            entropy_override: None,
            ledger_override: None,
        }
    }

    /// Load configuration from the given TOML file.
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use this configuration instead of loading one.
    pub fn with_config(mut self, config: ArcadeConfig) -> Self {
        self.config_override = Some(config);
        self
    }

    /// Inject an entropy provider instead of the configured oracle.
    pub fn with_entropy_provider(mut self, provider: Arc<dyn EntropyProvider>) -> Self {
        self.entropy_override = Some(provider);
        self
    }

    /// Inject a ledger backend instead of the configured one.
    pub fn with_ledger_backend(mut self, backend: Arc<dyn LedgerBackend>) -> Self {
        self.ledger_override = Some(backend);
        self
    }

    pub fn build(self) -> ArcadeResult<ServiceContainer> {
        let config = match self.config_override {
            Some(config) => {
                config.validate()?;
                config
            }
            None => {
                let mut loader = ConfigLoader::new();
                if let Some(path) = self.config_path {
                    loader = loader.with_path(path);
                }
                loader.load()?
            }
        };

        let entropy = match self.entropy_override {
            Some(provider) => Arc::new(EntropySource::new(
                provider,
                RetryOptions::new(
                    config.entropy.max_retries,
                    Duration::from_millis(config.entropy.retry_base_delay_ms),
                ),
            )),
            None => Arc::new(EntropySource::from_config(&config.entropy)?),
        };

        let ledger = match self.ledger_override {
            Some(backend) => Arc::new(GameLedgerClient::new(backend, config.ledger.clone())),
            None => Arc::new(GameLedgerClient::from_config(config.ledger.clone())?),
        };

        Ok(ServiceContainer {
            config,
            entropy,
            ledger,
        })
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
