//! Errors reported by the rules engine to its callers.

use std::path::PathBuf;

use crate::chess::core::Square;
use crate::chess::notation::MoveRequest;

/// Everything that can go wrong while playing, saving or loading a game.
///
/// [`ChessError::Syntax`] and [`ChessError::IllegalMove`] are user errors: the
/// caller should report them and ask for another move. Failed loads
/// ([`ChessError::CorruptSave`], [`ChessError::FileNotFound`],
/// [`ChessError::Io`]) never touch the game that is already in memory.
/// [`ChessError::InvariantViolation`] signals a defect: it can only happen if
/// the board was put together bypassing validation.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum ChessError {
    #[error("malformed move: {0}")]
    Syntax(String),
    #[error("illegal move {requested}: {reason}")]
    IllegalMove {
        requested: MoveRequest,
        reason: IllegalMoveReason,
    },
    #[error("corrupt save: {0}")]
    CorruptSave(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Explains why a well-formed move request was rejected.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMoveReason {
    #[error("there is no piece on {0}")]
    EmptySquare(Square),
    #[error("the piece on {0} belongs to the opponent")]
    OpponentPiece(Square),
    #[error("the piece can not move there")]
    Unreachable,
    #[error("the move would leave the king in check")]
    KingInCheck,
    #[error("the game is over")]
    GameOver,
}
