//! Board-state legality facade and move history.
//!
//! Wraps `shakmaty` so the session layer never touches move generation
//! directly: all mutation goes through [`BoardState::apply`], which
//! re-validates every candidate move against the legal-move set.

pub mod board;
pub mod history;

pub use board::{BoardState, CandidateMove, DrawReason, GameStatus, InvalidMove};
pub use history::{side_name, HistoryEntry, HistoryLog};
