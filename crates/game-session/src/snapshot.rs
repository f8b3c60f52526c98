//! Read-only view handed to the presentation collaborator.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PieceOnSquare {
    /// Square name, e.g. `e4`.
    pub square: String,
    /// FEN piece letter; uppercase is White.
    pub piece: char,
}

/// Everything the presentation layer may read. Produced on demand by the
/// session; never a channel for mutation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub pieces: Vec<PieceOnSquare>,
    /// Currently selected square, if a piece is picked up.
    pub selected: Option<String>,
    /// Legal destinations for the current selection, for highlighting.
    pub legal_destinations: Vec<String>,
    /// Origin and destination of the last applied move.
    pub last_move: Option<(String, String)>,
    /// Human-readable game status line.
    pub status: String,
    pub human_wins: u32,
    pub engine_wins: u32,
    /// The opponent's current Elo target.
    pub rating: u32,
    /// Best-move hint text, present only while suggestions are enabled.
    pub suggestion: Option<String>,
    /// Latest advisory reply (or inline advisory error text).
    pub advisory: Option<String>,
}
