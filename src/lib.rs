//! OneArcade core services: provably-fair entropy sourcing and on-chain
//! game-result logging for the arcade's casino games.
//!
//! Two chains are in play. A randomness oracle on a secondary chain
//! produces entropy with a verifiable proof; the primary chain (One
//! Chain) holds the game ledger. Both paths are wrapped in a shared
//! resilience layer: classified errors, retry with exponential backoff,
//! a circuit breaker on the submission path, and a local entropy
//! fallback so gameplay survives oracle outages.

pub mod amount;
pub mod config;
pub mod entropy;
pub mod errors;
pub mod ledger;
pub mod resilience;
pub mod services;
pub mod types;

pub use config::{ArcadeConfig, ConfigLoader};
pub use entropy::{EntropyProvider, EntropySource, FallbackEntropyProvider};
pub use errors::{ArcadeResult, ClassifiedError, ErrorKind, Severity};
pub use ledger::{GameLedgerClient, LedgerBackend, MockLedgerBackend};
pub use resilience::{retry_with_backoff, CircuitBreaker, RetryOptions};
pub use services::{ServiceBuilder, ServiceContainer};
pub use types::{EntropyResult, GameResultRecord, GameType};

/// Initialize structured logging. Filter via `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
