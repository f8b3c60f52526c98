//! Session configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::difficulty::MIN_ELO;

#[derive(Clone, Debug)]
pub struct Config {
    /// Path to a UCI engine binary.
    pub stockfish_path: String,

    /// Time budget per engine search.
    pub movetime: Duration,

    /// Fixed delay before the opponent's turn starts.
    pub opponent_delay: Duration,

    /// Opponent strength at startup.
    pub initial_elo: u32,

    /// Advisory service endpoint; advisory features are disabled when unset.
    pub advisor_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables. Defaults: 1s
    /// searches, 500ms opponent delay, weakest strength limit.
    pub fn from_env() -> Self {
        let stockfish_path = env::var("STOCKFISH_PATH")
            .unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string());

        let movetime = env::var("ENGINE_MOVETIME_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(1000));

        let opponent_delay = env::var("OPPONENT_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(500));

        let initial_elo = env::var("INITIAL_ELO")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(MIN_ELO);

        let advisor_url = env::var("ADVISOR_URL").ok();

        Self {
            stockfish_path,
            movetime,
            opponent_delay,
            initial_elo,
            advisor_url,
        }
    }
}
