use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shakmaty::uci::UciMove;

use game_session::clients::advisor::{AdvisoryError, AdvisoryProvider};
use game_session::Config;
use uci_engine::{EngineError, MoveProvider};

/// Config with zero delays, for deterministic runtime tests.
pub fn test_config() -> Config {
    Config {
        stockfish_path: "unused".to_string(),
        movetime: Duration::from_millis(0),
        opponent_delay: Duration::from_millis(0),
        initial_elo: 1320,
        advisor_url: None,
    }
}

/// Deterministic move provider replaying a fixed UCI script; records every
/// strength configuration it receives. Fails once the script runs dry.
pub struct ScriptedEngine {
    moves: VecDeque<UciMove>,
    pub configured_elos: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedEngine {
    pub fn new(moves: &[&str]) -> Self {
        Self {
            moves: moves.iter().map(|m| m.parse().expect("valid uci")).collect(),
            configured_elos: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn elo_log(&self) -> Arc<Mutex<Vec<u32>>> {
        self.configured_elos.clone()
    }
}

#[async_trait]
impl MoveProvider for ScriptedEngine {
    async fn configure(&mut self, elo: u32) -> Result<(), EngineError> {
        self.configured_elos.lock().unwrap().push(elo);
        Ok(())
    }

    async fn request_move(
        &mut self,
        _fen: &str,
        _time_budget: Duration,
    ) -> Result<UciMove, EngineError> {
        self.moves
            .pop_front()
            .ok_or_else(|| EngineError::Protocol("script exhausted".into()))
    }
}

/// Advisory double returning the same canned reply for every digest.
pub struct CannedAdvisor {
    pub reply: String,
    pub digests: Arc<Mutex<Vec<String>>>,
}

impl CannedAdvisor {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            digests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AdvisoryProvider for CannedAdvisor {
    async fn advise(
        &self,
        digest: &str,
        _user_message: Option<&str>,
    ) -> Result<String, AdvisoryError> {
        self.digests.lock().unwrap().push(digest.to_string());
        Ok(self.reply.clone())
    }
}
