//! Core domain types shared by the entropy and ledger services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Roulette,
    Mines,
    Plinko,
    Wheel,
}

impl GameType {
    /// Ledger-contract function that records a result for this game.
    ///
    /// The mapping is fixed by the deployed Move module and must not be
    /// derived from user input.
    pub fn move_function(&self) -> &'static str {
        match self {
            GameType::Roulette => "log_roulette_game",
            GameType::Mines => "log_mines_game",
            GameType::Plinko => "log_plinko_game",
            GameType::Wheel => "log_wheel_game",
        }
    }

    /// Inverse of [`move_function`](Self::move_function), used when
    /// reconstructing records from submitted calls.
    pub fn from_move_function(function: &str) -> Option<Self> {
        match function {
            "log_roulette_game" => Some(GameType::Roulette),
            "log_mines_game" => Some(GameType::Mines),
            "log_plinko_game" => Some(GameType::Plinko),
            "log_wheel_game" => Some(GameType::Wheel),
            _ => None,
        }
    }

    /// Parse a game type from an arbitrary (user- or event-supplied) string.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "roulette" => Some(GameType::Roulette),
            "mines" => Some(GameType::Mines),
            "plinko" => Some(GameType::Plinko),
            "wheel" => Some(GameType::Wheel),
            _ => None,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Roulette => write!(f, "roulette"),
            GameType::Mines => write!(f, "mines"),
            GameType::Plinko => write!(f, "plinko"),
            GameType::Wheel => write!(f, "wheel"),
        }
    }
}

/// Verifiable provenance of a random value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyProof {
    pub request_id: String,
    pub sequence_number: u64,
    pub transaction_hash: String,
    pub block_number: u64,
    pub network: String,
    pub explorer_url: String,
    /// Epoch milliseconds at which the request settled.
    pub timestamp: u64,
}

/// Provenance metadata attached to every entropy result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyMetadata {
    /// Human-readable origin. Contains "Fallback" iff the value was
    /// generated locally instead of by the oracle.
    pub source: String,
    pub generated_at: u64,
    /// Oracle attempts made before this result was produced.
    pub attempts: u32,
}

/// A random value together with its proof; immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyResult {
    pub random_value: u64,
    pub proof: EntropyProof,
    pub game_type: GameType,
    pub game_config: serde_json::Value,
    pub metadata: EntropyMetadata,
}

impl EntropyResult {
    /// Whether this value was substituted locally rather than sourced
    /// from the randomness oracle. Callers auditing real-money outcomes
    /// should gate on this.
    pub fn is_fallback(&self) -> bool {
        self.metadata.source.contains("Fallback")
    }
}

/// One append-only ledger entry per game action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResultRecord {
    pub game_type: GameType,
    pub player_address: String,
    /// Bet in the token's smallest unit.
    pub bet_amount: u64,
    pub payout_amount: u64,
    pub game_config: serde_json::Value,
    pub result_data: serde_json::Value,
    pub entropy_value: String,
    pub entropy_tx_hash: String,
    pub timestamp: u64,
}

/// Explorer link for a transaction hash, for display and audit only.
pub fn explorer_tx_url(explorer_base: &str, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer_base.trim_end_matches('/'), tx_hash)
}

/// Current time as epoch milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_function_mapping() {
        assert_eq!(GameType::Roulette.move_function(), "log_roulette_game");
        assert_eq!(GameType::Mines.move_function(), "log_mines_game");
        assert_eq!(GameType::Plinko.move_function(), "log_plinko_game");
        assert_eq!(GameType::Wheel.move_function(), "log_wheel_game");

        for game in [GameType::Roulette, GameType::Mines, GameType::Plinko, GameType::Wheel] {
            assert_eq!(GameType::from_move_function(game.move_function()), Some(game));
        }
        assert_eq!(GameType::from_move_function("log_poker_game"), None);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(GameType::parse("ROULETTE"), Some(GameType::Roulette));
        assert_eq!(GameType::parse("Wheel"), Some(GameType::Wheel));
        assert_eq!(GameType::parse("blackjack"), None);
    }

    #[test]
    fn test_explorer_url_format() {
        assert_eq!(
            explorer_tx_url("https://onescan.cc/", "0xabc"),
            "https://onescan.cc/tx/0xabc"
        );
    }

    #[test]
    fn test_fallback_detection() {
        let result = EntropyResult {
            random_value: 7,
            proof: EntropyProof {
                request_id: "r".to_string(),
                sequence_number: 0,
                transaction_hash: "0x0".to_string(),
                block_number: 0,
                network: "local".to_string(),
                explorer_url: String::new(),
                timestamp: 0,
            },
            game_type: GameType::Plinko,
            game_config: serde_json::json!({}),
            metadata: EntropyMetadata {
                source: "Local Fallback (non-oracle)".to_string(),
                generated_at: 0,
                attempts: 2,
            },
        };
        assert!(result.is_fallback());
    }
}
