//! Append-only record of applied moves and the advisory digest built from it.

use shakmaty::Color;

pub fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// One successfully applied half-move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// 1-based half-move index.
    pub ply: u32,
    pub side: Color,
    /// The move in UCI notation, e.g. `e2e4` or `a7a8q`.
    pub uci: String,
    /// FEN of the position the move produced.
    pub fen: String,
}

/// Ordered, append-only log of every half-move applied since the last reset.
/// Consumed only by the advisory digest builder; the board never reads it.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, side: Color, uci: String, fen: String) {
        let ply = self.entries.len() as u32 + 1;
        self.entries.push(HistoryEntry {
            ply,
            side,
            uci,
            fen,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Plain-text game record handed to advisory collaborators: one line per
    /// half-move in play order, then the current position and side to move.
    /// The reply to this digest is treated as opaque display text.
    pub fn digest(&self, current_fen: &str, to_move: Color) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!(
                "Move {}. {}: {} (Position: {})\n",
                entry.ply,
                side_name(entry.side),
                entry.uci,
                entry.fen
            ));
        }
        out.push_str(&format!("Current position: {current_fen}\n"));
        out.push_str(&format!("{} to move", side_name(to_move)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardState, CandidateMove};

    fn play(board: &mut BoardState, log: &mut HistoryLog, from: &str, to: &str) {
        let candidate = CandidateMove::new(from.parse().unwrap(), to.parse().unwrap());
        let side = board.turn();
        board.apply(&candidate).expect("legal move");
        log.append(side, candidate.to_string(), board.fen());
    }

    #[test]
    fn test_append_assigns_sequential_plies() {
        let mut board = BoardState::new();
        let mut log = HistoryLog::new();
        play(&mut board, &mut log, "e2", "e4");
        play(&mut board, &mut log, "e7", "e5");

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].ply, 1);
        assert_eq!(log.entries()[0].side, Color::White);
        assert_eq!(log.entries()[1].ply, 2);
        assert_eq!(log.entries()[1].side, Color::Black);
    }

    #[test]
    fn test_digest_after_first_move() {
        let mut board = BoardState::new();
        let mut log = HistoryLog::new();
        play(&mut board, &mut log, "e2", "e4");

        let digest = log.digest(&board.fen(), board.turn());
        assert!(digest.starts_with("Move 1. White: e2e4 (Position: "));
        assert!(digest.ends_with("Black to move"));
    }

    #[test]
    fn test_digest_orders_entries_and_reports_side_to_move() {
        let mut board = BoardState::new();
        let mut log = HistoryLog::new();
        play(&mut board, &mut log, "e2", "e4");
        play(&mut board, &mut log, "e7", "e5");

        let digest = log.digest(&board.fen(), board.turn());
        let lines: Vec<&str> = digest.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Move 1. White: e2e4"));
        assert!(lines[1].starts_with("Move 2. Black: e7e5"));
        // Each entry records the position its move produced.
        assert!(lines[0].contains(" b "));
        assert!(lines[1].contains(" w "));
        assert!(lines[2].starts_with("Current position: "));
        assert_eq!(lines[3], "White to move");
    }

    #[test]
    fn test_clear_empties_the_log() {
        let mut board = BoardState::new();
        let mut log = HistoryLog::new();
        play(&mut board, &mut log, "e2", "e4");
        log.clear();
        assert!(log.is_empty());
    }
}
