//! Move-search capability seam and its error taxonomy.

use std::time::Duration;

use async_trait::async_trait;
use shakmaty::uci::UciMove;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The adapter could not be acquired or is gone; automated play is
    /// disabled until a fresh one exists.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The process is alive but spoke something we cannot use.
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// An external move-search capability, strength-limited to a target rating.
///
/// `request_move` makes exactly one attempt; retry policy belongs to the
/// caller. Implementations must not mutate any game state of their own —
/// advisory "best move here" queries reuse this interface on live sessions.
#[async_trait]
pub trait MoveProvider: Send {
    /// Set (or reconfirm) the strength limit. Called before every search.
    async fn configure(&mut self, elo: u32) -> Result<(), EngineError>;

    /// Search the given position within the time budget and return the best
    /// move found.
    async fn request_move(
        &mut self,
        fen: &str,
        time_budget: Duration,
    ) -> Result<UciMove, EngineError>;

    /// Orderly release of the underlying resource, called at most once when
    /// the owning worker stops. Dropping the provider remains the
    /// hard-release path.
    async fn shutdown(&mut self) {}
}
