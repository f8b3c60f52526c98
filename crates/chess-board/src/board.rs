//! Position state, legality checks and game-end detection.

use std::fmt;

use shakmaty::{
    fen::Fen, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, File, Move, Piece,
    Position, Rank, Role, Square,
};
use thiserror::Error;

/// Why an attempted move was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMove {
    #[error("no legal move from {from} to {to}")]
    NotLegal { from: Square, to: Square },

    #[error("promotion move requires a promotion piece")]
    MissingPromotion,

    #[error("null move cannot be applied")]
    NullMove,

    #[error("game is already over")]
    GameOver,
}

/// Outcome of the position after a move has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    /// Checkmate delivered by the given side.
    Win(Color),
    Draw(DrawReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    Repetition,
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            GameStatus::InProgress => "in progress",
            GameStatus::Win(Color::White) => "White wins by checkmate",
            GameStatus::Win(Color::Black) => "Black wins by checkmate",
            GameStatus::Draw(DrawReason::Stalemate) => "Draw by stalemate",
            GameStatus::Draw(DrawReason::InsufficientMaterial) => "Draw by insufficient material",
            GameStatus::Draw(DrawReason::FiftyMoveRule) => "Draw by fifty-move rule",
            GameStatus::Draw(DrawReason::Repetition) => "Draw by threefold repetition",
        }
    }
}

/// A move as the session layer sees it: origin, destination and an optional
/// promotion piece. Castling uses the king's two-square destination, the
/// same convention UCI engines speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl CandidateMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(from: Square, to: Square, role: Role) -> Self {
        Self {
            from,
            to,
            promotion: Some(role),
        }
    }

    /// Engine-supplied moves arrive as UCI; null moves are not representable.
    pub fn from_uci(uci: &UciMove) -> Option<Self> {
        match *uci {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => Some(Self {
                from,
                to,
                promotion,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for CandidateMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

/// Full chess position plus the repetition ledger needed for threefold
/// detection. Exactly one instance lives per session; mutation happens only
/// through [`BoardState::apply`] / [`BoardState::apply_uci`] / reset.
#[derive(Debug, Clone)]
pub struct BoardState {
    position: Chess,
    // Normalized keys (first four FEN fields) of every position reached,
    // including the initial one.
    repetition_keys: Vec<String>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardState {
    pub fn new() -> Self {
        let position = Chess::default();
        let repetition_keys = vec![repetition_key(&position)];
        Self {
            position,
            repetition_keys,
        }
    }

    /// Rebuild from a FEN string. Returns `None` for unparseable or illegal
    /// positions. Repetition history starts fresh at the given position.
    pub fn from_fen(fen: &str) -> Option<Self> {
        let parsed: Fen = fen.parse().ok()?;
        let position: Chess = parsed.into_position(CastlingMode::Standard).ok()?;
        let repetition_keys = vec![repetition_key(&position)];
        Some(Self {
            position,
            repetition_keys,
        })
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    pub fn is_check(&self) -> bool {
        self.position.is_check()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square)
    }

    /// All occupied squares with their pieces, for presentation snapshots.
    pub fn pieces(&self) -> Vec<(Square, Piece)> {
        Square::ALL
            .iter()
            .filter_map(|&sq| self.piece_at(sq).map(|piece| (sq, piece)))
            .collect()
    }

    /// Destination squares of every legal move from `from`. Empty when the
    /// square is empty or holds a piece of the side not to move.
    pub fn legal_destinations(&self, from: Square) -> Vec<Square> {
        let mut destinations: Vec<Square> = self
            .position
            .legal_moves()
            .iter()
            .filter(|m| m.from() == Some(from))
            .map(ui_destination)
            .collect();
        destinations.sort();
        destinations.dedup();
        destinations
    }

    /// True iff the piece on `from` is a pawn of the side to move heading to
    /// its farthest rank. Says nothing about legality.
    pub fn is_promotion(&self, from: Square, to: Square) -> bool {
        match self.piece_at(from) {
            Some(piece) if piece.role == Role::Pawn && piece.color == self.turn() => {
                let last_rank = match piece.color {
                    Color::White => Rank::Eighth,
                    Color::Black => Rank::First,
                };
                to.rank() == last_rank
            }
            _ => false,
        }
    }

    /// Validate and apply a move, returning the resulting status.
    ///
    /// The candidate must match a member of the current legal-move set; a
    /// pawn reaching its farthest rank without a promotion piece attached is
    /// rejected before the legality lookup.
    pub fn apply(&mut self, candidate: &CandidateMove) -> Result<GameStatus, InvalidMove> {
        if self.status().is_over() {
            return Err(InvalidMove::GameOver);
        }
        if self.is_promotion(candidate.from, candidate.to) && candidate.promotion.is_none() {
            return Err(InvalidMove::MissingPromotion);
        }

        let matched = self
            .position
            .legal_moves()
            .iter()
            .find(|m| {
                m.from() == Some(candidate.from)
                    && ui_destination(m) == candidate.to
                    && m.promotion() == candidate.promotion
            })
            .cloned();

        let mv = matched.ok_or(InvalidMove::NotLegal {
            from: candidate.from,
            to: candidate.to,
        })?;

        self.position.play_unchecked(mv);
        self.repetition_keys.push(repetition_key(&self.position));
        Ok(self.status())
    }

    /// Apply an engine-supplied UCI move through the same validation path.
    pub fn apply_uci(&mut self, uci: &UciMove) -> Result<GameStatus, InvalidMove> {
        let candidate = CandidateMove::from_uci(uci).ok_or(InvalidMove::NullMove)?;
        self.apply(&candidate)
    }

    /// Current status, first truth wins: checkmate > stalemate >
    /// insufficient material > fifty-move > threefold repetition.
    pub fn status(&self) -> GameStatus {
        if self.position.is_checkmate() {
            return GameStatus::Win(self.position.turn().other());
        }
        if self.position.is_stalemate() {
            return GameStatus::Draw(DrawReason::Stalemate);
        }
        if self.position.is_insufficient_material() {
            return GameStatus::Draw(DrawReason::InsufficientMaterial);
        }
        if self.position.halfmoves() >= 100 {
            return GameStatus::Draw(DrawReason::FiftyMoveRule);
        }
        if self.repetition_count() >= 3 {
            return GameStatus::Draw(DrawReason::Repetition);
        }
        GameStatus::InProgress
    }

    /// Serialized snapshot sufficient to reconstruct the position.
    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn repetition_count(&self) -> usize {
        let current = repetition_key(&self.position);
        self.repetition_keys
            .iter()
            .filter(|key| **key == current)
            .count()
    }
}

/// Position key for repetition detection: placement, side to move, castling
/// rights and en-passant square, without the move counters.
fn repetition_key(position: &Chess) -> String {
    let fen = Fen::from_position(position, EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// The square a player clicks (or an engine names) to make this move.
/// Castling is the king's g-/c-file destination rather than shakmaty's
/// king-takes-rook encoding.
fn ui_destination(m: &Move) -> Square {
    match m {
        Move::Castle { king, rook } => {
            let file = if rook.file() == File::H {
                File::G
            } else {
                File::C
            };
            Square::from_coords(file, king.rank())
        }
        other => other.to(),
    }
}
