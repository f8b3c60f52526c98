//! Turn-handoff state machine between the human and the engine opponent.

use chess_board::{side_name, BoardState, CandidateMove, GameStatus, HistoryLog};
use shakmaty::{uci::UciMove, Color, Role, Square};
use uci_engine::EngineError;

use crate::difficulty::{DifficultyRegulator, WinTally};
use crate::snapshot::{PieceOnSquare, SessionSnapshot};

/// The human always plays White; the engine answers as Black.
pub const HUMAN_SIDE: Color = Color::White;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the human to pick one of their pieces.
    AwaitingSelection,
    /// A piece is selected; waiting for a destination (or a deselect).
    AwaitingDestination(Square),
    /// A pawn is about to reach its farthest rank; waiting for the
    /// promotion sub-protocol to deliver a piece choice or a cancellation.
    AwaitingPromotion { from: Square, to: Square },
    /// The engine is computing its reply; input is ignored, not queued.
    AwaitingOpponentMove,
    /// Terminal until `reset`.
    GameOver(GameEnd),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEnd {
    Finished(GameStatus),
    /// The opponent turn failed (engine error or illegal engine move); the
    /// board is left exactly as it was before the failed turn.
    Halted(String),
}

/// What a transition produced, and what the caller must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// The input was a no-op in the current state.
    Ignored,
    Selected { destinations: Vec<Square> },
    Deselected,
    /// The caller must run the promotion sub-protocol: offer Queen, Rook,
    /// Bishop and Knight, then report the choice or the cancellation.
    PromotionPrompt { from: Square, to: Square },
    PromotionCancelled,
    /// The move was outside the legal set; selection has been cleared.
    Rejected,
    /// A human move was applied and the game goes on: schedule the
    /// opponent's turn after the configured delay.
    OpponentTurn,
    /// The opponent's move was applied; the human is to move.
    HumanTurn,
    GameEnded(GameEnd),
}

/// Orchestrates one session: owns the board, the history log, the selection
/// and the difficulty state. All mutation is driven through this type from a
/// single task; nothing here blocks or performs I/O.
pub struct SessionController {
    board: BoardState,
    history: HistoryLog,
    state: TurnState,
    regulator: DifficultyRegulator,
    last_move: Option<(Square, Square)>,
}

impl SessionController {
    pub fn new(initial_elo: u32) -> Self {
        Self {
            board: BoardState::new(),
            history: HistoryLog::new(),
            state: TurnState::AwaitingSelection,
            regulator: DifficultyRegulator::new(initial_elo),
            last_move: None,
        }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn rating(&self) -> u32 {
        self.regulator.rating()
    }

    pub fn tally(&self) -> WinTally {
        self.regulator.tally()
    }

    /// Text record of the game so far, for advisory collaborators.
    pub fn digest(&self) -> String {
        self.history.digest(&self.board.fen(), self.board.turn())
    }

    pub fn handle_click(&mut self, square: Square) -> Reaction {
        match self.state {
            TurnState::AwaitingSelection => self.select(square),
            TurnState::AwaitingDestination(selected) => {
                if selected == square {
                    self.state = TurnState::AwaitingSelection;
                    return Reaction::Deselected;
                }
                self.attempt_move(selected, square)
            }
            TurnState::AwaitingPromotion { .. }
            | TurnState::AwaitingOpponentMove
            | TurnState::GameOver(_) => Reaction::Ignored,
        }
    }

    fn select(&mut self, square: Square) -> Reaction {
        match self.board.piece_at(square) {
            Some(piece) if piece.color == self.board.turn() => {
                let destinations = self.board.legal_destinations(square);
                self.state = TurnState::AwaitingDestination(square);
                Reaction::Selected { destinations }
            }
            // Empty square or an opponent piece: no transition, no mutation.
            _ => Reaction::Ignored,
        }
    }

    fn attempt_move(&mut self, from: Square, to: Square) -> Reaction {
        if self.board.is_promotion(from, to) {
            self.state = TurnState::AwaitingPromotion { from, to };
            return Reaction::PromotionPrompt { from, to };
        }
        self.apply_human(CandidateMove::new(from, to))
    }

    /// Complete the promotion sub-protocol with an explicit piece choice.
    pub fn choose_promotion(&mut self, piece: Role) -> Reaction {
        let (from, to) = match self.state {
            TurnState::AwaitingPromotion { from, to } => (from, to),
            _ => return Reaction::Ignored,
        };
        if !matches!(
            piece,
            Role::Queen | Role::Rook | Role::Bishop | Role::Knight
        ) {
            return Reaction::Ignored;
        }
        self.apply_human(CandidateMove::with_promotion(from, to, piece))
    }

    /// Abort the promotion sub-protocol: the move is discarded, nothing is
    /// mutated and the selection is cleared.
    pub fn cancel_promotion(&mut self) -> Reaction {
        match self.state {
            TurnState::AwaitingPromotion { .. } => {
                self.state = TurnState::AwaitingSelection;
                Reaction::PromotionCancelled
            }
            _ => Reaction::Ignored,
        }
    }

    fn apply_human(&mut self, candidate: CandidateMove) -> Reaction {
        match self.apply_validated(candidate) {
            Ok(GameStatus::InProgress) => {
                self.state = TurnState::AwaitingOpponentMove;
                Reaction::OpponentTurn
            }
            Ok(over) => self.finish(over),
            Err(err) => {
                tracing::debug!(%err, "move rejected");
                self.state = TurnState::AwaitingSelection;
                Reaction::Rejected
            }
        }
    }

    /// Feed back the engine's reply (or failure) for the scheduled opponent
    /// turn. Replies arriving in any other state are stale and ignored.
    pub fn opponent_reply(&mut self, reply: Result<UciMove, EngineError>) -> Reaction {
        if !matches!(self.state, TurnState::AwaitingOpponentMove) {
            return Reaction::Ignored;
        }
        match reply {
            Ok(uci) => match CandidateMove::from_uci(&uci) {
                Some(candidate) => match self.apply_validated(candidate) {
                    Ok(GameStatus::InProgress) => {
                        self.state = TurnState::AwaitingSelection;
                        Reaction::HumanTurn
                    }
                    Ok(over) => self.finish(over),
                    Err(err) => self.halt(format!("engine played an illegal move: {err}")),
                },
                None => self.halt("engine returned a null move".to_string()),
            },
            Err(err) => self.halt(err.to_string()),
        }
    }

    /// Start a fresh game. Win tallies and the difficulty rating persist
    /// across games within a run.
    pub fn reset(&mut self) {
        self.board.reset();
        self.history.clear();
        self.last_move = None;
        self.state = TurnState::AwaitingSelection;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (selected, legal_destinations) = match &self.state {
            TurnState::AwaitingDestination(square) => (
                Some(square.to_string()),
                self.board
                    .legal_destinations(*square)
                    .iter()
                    .map(|sq| sq.to_string())
                    .collect(),
            ),
            _ => (None, Vec::new()),
        };

        let status = match &self.state {
            TurnState::GameOver(GameEnd::Finished(s)) => s.describe().to_string(),
            TurnState::GameOver(GameEnd::Halted(reason)) => format!("halted: {reason}"),
            TurnState::AwaitingPromotion { .. } => {
                "choose a promotion piece or cancel".to_string()
            }
            _ => {
                let side = side_name(self.board.turn());
                if self.board.is_check() {
                    format!("{side} to move (check)")
                } else {
                    format!("{side} to move")
                }
            }
        };

        let tally = self.tally();
        SessionSnapshot {
            pieces: self
                .board
                .pieces()
                .into_iter()
                .map(|(square, piece)| PieceOnSquare {
                    square: square.to_string(),
                    piece: piece.char(),
                })
                .collect(),
            selected,
            legal_destinations,
            last_move: self
                .last_move
                .map(|(from, to)| (from.to_string(), to.to_string())),
            status,
            human_wins: tally.human,
            engine_wins: tally.engine,
            rating: self.rating(),
            suggestion: None,
            advisory: None,
        }
    }

    fn apply_validated(
        &mut self,
        candidate: CandidateMove,
    ) -> Result<GameStatus, chess_board::InvalidMove> {
        let mover = self.board.turn();
        let status = self.board.apply(&candidate)?;
        self.history
            .append(mover, candidate.to_string(), self.board.fen());
        self.last_move = Some((candidate.from, candidate.to));
        Ok(status)
    }

    fn finish(&mut self, status: GameStatus) -> Reaction {
        if let GameStatus::Win(winner) = status {
            if winner == HUMAN_SIDE {
                self.regulator.record_human_win();
            } else {
                self.regulator.record_engine_win();
            }
        }
        let end = GameEnd::Finished(status);
        self.state = TurnState::GameOver(end.clone());
        Reaction::GameEnded(end)
    }

    fn halt(&mut self, reason: String) -> Reaction {
        tracing::error!(%reason, "opponent turn halted");
        let end = GameEnd::Halted(reason);
        self.state = TurnState::GameOver(end.clone());
        Reaction::GameEnded(end)
    }
}
