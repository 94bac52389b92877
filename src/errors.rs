//! Error taxonomy shared by the entropy and ledger services.
//!
//! Every failure is represented as a [`ClassifiedError`] constructed at the
//! point of failure. Classification drives retryability and user-facing
//! messaging; severity is diagnostic only.

use crate::types::current_timestamp_ms;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classes used to decide retryability and user messaging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Network,
    Connection,
    InsufficientFunds,
    Timeout,
    Transaction,
    Contract,
    Rpc,
    Validation,
    Unknown,
}

impl ErrorKind {
    /// Only transient infrastructure failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Connection | ErrorKind::Timeout | ErrorKind::Rpc
        )
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorKind::InsufficientFunds => Severity::Critical,
            ErrorKind::Transaction | ErrorKind::Contract => Severity::High,
            ErrorKind::Network | ErrorKind::Connection | ErrorKind::Rpc => Severity::Medium,
            ErrorKind::Timeout | ErrorKind::Validation => Severity::Low,
            ErrorKind::Unknown => Severity::Medium,
        }
    }

    /// One-line human-readable message; callers never display raw
    /// technical error text to end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Network issue detected. Please check your connection and try again.",
            ErrorKind::Connection => "Unable to reach the service. Please try again shortly.",
            ErrorKind::InsufficientFunds => "Insufficient balance for this action.",
            ErrorKind::Timeout => "The operation took too long. It may still complete in the background.",
            ErrorKind::Transaction => "The transaction could not be completed.",
            ErrorKind::Contract => "The game contract rejected the request.",
            ErrorKind::Rpc => "The chain endpoint is having trouble. Please try again.",
            ErrorKind::Validation => "Some of the provided details are invalid.",
            ErrorKind::Unknown => "Something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "NETWORK"),
            ErrorKind::Connection => write!(f, "CONNECTION"),
            ErrorKind::InsufficientFunds => write!(f, "INSUFFICIENT_FUNDS"),
            ErrorKind::Timeout => write!(f, "TIMEOUT"),
            ErrorKind::Transaction => write!(f, "TRANSACTION"),
            ErrorKind::Contract => write!(f, "CONTRACT"),
            ErrorKind::Rpc => write!(f, "RPC"),
            ErrorKind::Validation => write!(f, "VALIDATION"),
            ErrorKind::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Triage severity. Does not change propagation behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Best-effort heuristic classifier over error message text.
///
/// Not guaranteed exhaustive; unmatched messages bucket into
/// [`ErrorKind::Unknown`], which is treated as non-retryable.
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_ascii_lowercase();

    // Ordering matters: more specific substrings are checked first.
    if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline") {
        ErrorKind::Timeout
    } else if lower.contains("insufficient") {
        ErrorKind::InsufficientFunds
    } else if lower.contains("invalid") || lower.contains("required") || lower.contains("missing") {
        ErrorKind::Validation
    } else if lower.contains("contract") || lower.contains("abi") || lower.contains("move call") {
        ErrorKind::Contract
    } else if lower.contains("rpc") {
        ErrorKind::Rpc
    } else if lower.contains("connect") || lower.contains("disconnected") {
        ErrorKind::Connection
    } else if lower.contains("network")
        || lower.contains("fetch")
        || lower.contains("unreachable")
        || lower.contains("dns")
    {
        ErrorKind::Network
    } else if lower.contains("transaction") || lower.contains("tx ") {
        ErrorKind::Transaction
    } else {
        ErrorKind::Unknown
    }
}

/// Terminal artifact of a failed operation; never retried itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub context: Option<String>,
    /// Epoch milliseconds at construction.
    pub timestamp: u64,
    /// Stringified underlying cause, when one exists.
    pub cause: Option<String>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            context: None,
            timestamp: current_timestamp_ms(),
            cause: None,
        }
    }

    /// Construct by inferring the kind from the message text.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(classify_message(&message), message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Contract, message)
    }

    pub fn rpc(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rpc, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Message suitable for end users, optionally prefixed with the
    /// operation's context string.
    pub fn user_facing(&self) -> String {
        match &self.context {
            Some(context) => format!("{}: {}", context, self.kind.user_message()),
            None => self.kind.user_message().to_string(),
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.kind, self.severity, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " (context: {})", context)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ClassifiedError {}

impl From<reqwest::Error> for ClassifiedError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            ErrorKind::Timeout
        } else if e.is_connect() {
            ErrorKind::Connection
        } else if e.is_decode() {
            ErrorKind::Validation
        } else {
            ErrorKind::Network
        };
        Self::new(kind, e.to_string())
    }
}

impl From<serde_json::Error> for ClassifiedError {
    fn from(e: serde_json::Error) -> Self {
        Self::validation(format!("Invalid payload: {}", e))
    }
}

/// Convenience type alias for Results
pub type ArcadeResult<T> = Result<T, ClassifiedError>;
