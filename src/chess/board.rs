//! [`Board`] is a square-centric ("mailbox") representation of the pieces on
//! the chessboard: each of the 64 squares holds at most one piece.
//!
//! The board knows nothing about the rules: it is the storage that
//! [`crate::chess::position::Position`] reads and updates.

use std::fmt::{self, Write};

use crate::chess::core::{File, Piece, PieceKind, Player, Rank, Square, BOARD_SIZE};
use crate::chess::error::ChessError;

/// Piece placement on the 8x8 board.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; BOARD_SIZE as usize],
}

impl Board {
    /// Standard chess starting placement.
    #[must_use]
    pub fn starting() -> Self {
        const BACKRANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        let mut board = Self::empty();
        for player in [Player::White, Player::Black] {
            for (file, kind) in File::ALL.into_iter().zip(BACKRANK) {
                board.set(
                    Square::new(file, Rank::backrank(player)),
                    Some(Piece::new(player, kind)),
                );
                board.set(
                    Square::new(file, Rank::pawns_starting(player)),
                    Some(Piece::new(player, PieceKind::Pawn)),
                );
            }
        }
        board
    }

    /// Board without any pieces.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            squares: [None; BOARD_SIZE as usize],
        }
    }

    /// Returns the piece occupying the square, if any.
    #[must_use]
    pub const fn at(&self, square: Square) -> Option<Piece> {
        self.squares[square as usize]
    }

    /// Puts the piece on the square (or clears it), replacing whatever was
    /// there.
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.index()] = piece;
    }

    /// Clears the square and returns the piece that was on it.
    pub(super) fn take(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index()].take()
    }

    /// Iterates over all occupied squares in index order (A1, B1, ..., H8).
    pub fn iter(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::ALL
            .into_iter()
            .filter_map(|square| self.at(square).map(|piece| (square, piece)))
    }

    /// Iterates over the squares occupied by pieces of the given player.
    pub fn pieces(&self, player: Player) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.iter().filter(move |(_, piece)| piece.owner == player)
    }

    /// Number of pieces exactly matching the given one.
    #[must_use]
    pub fn count(&self, piece: Piece) -> usize {
        self.squares.iter().filter(|p| **p == Some(piece)).count()
    }

    /// Locates the king of the given player.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::InvariantViolation`] if the player has no king.
    /// Validated positions always have exactly one.
    pub fn king_square(&self, player: Player) -> Result<Square, ChessError> {
        let king = Piece::new(player, PieceKind::King);
        Square::ALL
            .into_iter()
            .find(|square| self.at(*square) == Some(king))
            .ok_or_else(|| ChessError::InvariantViolation(format!("no {player:?} king on the board")))
    }
}

impl fmt::Display for Board {
    /// Prints board representation in FEN format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::ALL.into_iter().rev() {
            let mut empty_squares = 0;
            for file in File::ALL {
                if let Some(piece) = self.at(Square::new(file, rank)) {
                    if empty_squares != 0 {
                        write!(f, "{empty_squares}")?;
                        empty_squares = 0;
                    }
                    write!(f, "{piece}")?;
                } else {
                    empty_squares += 1;
                }
            }
            if empty_squares != 0 {
                write!(f, "{empty_squares}")?;
            }
            if rank != Rank::One {
                const RANK_SEPARATOR: char = '/';
                f.write_char(RANK_SEPARATOR)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    /// Dumps the board in a simple format ('.' for empty square, FEN algebraic
    /// symbol for piece) a-la Stockfish "debug" command in UCI mode.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::ALL.into_iter().rev() {
            for file in File::ALL {
                match self.at(Square::new(file, rank)) {
                    Some(piece) => write!(f, "{piece}"),
                    None => f.write_char('.'),
                }?;
                if file != File::H {
                    f.write_str(SQUARE_SEPARATOR)?;
                }
            }
            if rank != Rank::One {
                f.write_str(LINE_SEPARATOR)?;
            }
        }
        Ok(())
    }
}

const LINE_SEPARATOR: &str = "\n";
const SQUARE_SEPARATOR: &str = " ";

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starting_board() {
        let board = Board::starting();
        assert_eq!(
            format!("{:?}", board),
            "r n b q k b n r\n\
             p p p p p p p p\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             P P P P P P P P\n\
             R N B Q K B N R"
        );
        assert_eq!(
            board.to_string(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"
        );
        assert_eq!(board.iter().count(), 32);
        assert_eq!(board.pieces(Player::White).count(), 16);
        assert_eq!(board.count(Piece::new(Player::Black, PieceKind::Pawn)), 8);
        assert_eq!(board.king_square(Player::White).unwrap(), Square::E1);
        assert_eq!(board.king_square(Player::Black).unwrap(), Square::E8);
    }

    #[test]
    fn set_and_take() {
        let mut board = Board::empty();
        assert_eq!(board.to_string(), "8/8/8/8/8/8/8/8");
        let knight = Piece::new(Player::White, PieceKind::Knight);
        board.set(Square::F3, Some(knight));
        assert_eq!(board.at(Square::F3), Some(knight));
        assert_eq!(board.to_string(), "8/8/8/8/8/5N2/8/8");
        assert_eq!(board.take(Square::F3), Some(knight));
        assert_eq!(board.at(Square::F3), None);
        assert_eq!(board, Board::empty());
    }

    #[test]
    fn missing_king() {
        let board = Board::empty();
        assert!(matches!(
            board.king_square(Player::Black),
            Err(ChessError::InvariantViolation(_))
        ));
    }
}
