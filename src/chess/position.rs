//! Provides fully-specified [Chess Position] implementation: stores information
//! about the board and tracks the state of castling, 50-move rule counter,
//! etc.
//!
//! Moves mutate the position only through [`Position::apply_move`], which
//! accepts nothing but the legal moves produced by
//! [`crate::chess::movegen::legal_moves`].
//!
//! [Chess Position]: https://www.chessprogramming.org/Chess_Position

use std::fmt;
use std::num::NonZeroU16;

use anyhow::{bail, Context};

use crate::chess::board::Board;
use crate::chess::core::{
    CastleRights,
    CastlingSide,
    File,
    Move,
    MoveKind,
    Piece,
    PieceKind,
    Player,
    Rank,
    Square,
    BOARD_WIDTH,
};
use crate::chess::error::{ChessError, IllegalMoveReason};
use crate::chess::movegen;
use crate::chess::notation::MoveRequest;

/// State of the chess game: board, half-move counters and castling rights,
/// etc. It has 1:1 relationship with [Forsyth-Edwards Notation] (FEN).
///
/// [`Position::try_from()`] provides a convenient interface for creating a
/// [`Position`]. It will clean up the input (trim newlines and whitespace) and
/// attempt to parse in either FEN or a version of [Extended Position
/// Description] (EPD). The EPD format accepted here does not support
/// [Operations]: the EPD support exists for compatibility with databases which
/// provide trimmed FEN lines (all FEN parts except Halfmove Clock and Fullmove
/// Counter).
///
/// [Forsyth-Edwards Notation]: https://www.chessprogramming.org/Forsyth-Edwards_Notation
/// [Extended Position Description]: https://www.chessprogramming.org/Extended_Position_Description
/// [Operations]: https://www.chessprogramming.org/Extended_Position_Description#Operations
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
    board: Board,
    castling: CastleRights,
    side_to_move: Player,
    /// [Halfmove Clock][^ply] keeps track of the number of (half-)moves
    /// since the last capture or pawn move. Draw rules are not enforced, the
    /// counter is only maintained.
    ///
    /// [Halfmove Clock]: https://www.chessprogramming.org/Halfmove_Clock
    /// [^ply]: "Half-move" or ["ply"](https://www.chessprogramming.org/Ply) means a move of only
    ///     one side.
    halfmove_clock: u16,
    fullmove_counter: NonZeroU16,
    en_passant_square: Option<Square>,
}

impl Position {
    /// Creates the starting position of the standard chess variant.
    ///
    /// ```
    /// use kingside::chess::position::Position;
    ///
    /// let starting_position = Position::starting();
    /// assert_eq!(
    ///     &starting_position.to_string(),
    ///     "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    /// );
    /// ```
    #[must_use]
    pub fn starting() -> Self {
        Self {
            board: Board::starting(),
            castling: CastleRights::ALL,
            ..Self::empty()
        }
    }

    // Creates an empty board to be filled by parser.
    const fn empty() -> Self {
        Self {
            board: Board::empty(),
            castling: CastleRights::NONE,
            side_to_move: Player::White,
            halfmove_clock: 0,
            fullmove_counter: NonZeroU16::MIN,
            en_passant_square: None,
        }
    }

    /// Assembles a position from its parts and checks that it is valid.
    pub(super) fn from_parts(
        board: Board,
        side_to_move: Player,
        castling: CastleRights,
        en_passant_square: Option<Square>,
        halfmove_clock: u16,
        fullmove_counter: NonZeroU16,
    ) -> anyhow::Result<Self> {
        let position = Self {
            board,
            castling,
            side_to_move,
            halfmove_clock,
            fullmove_counter,
            en_passant_square,
        };
        position.validate()?;
        Ok(position)
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn castling(&self) -> CastleRights {
        self.castling
    }

    /// The square a pawn skipped over with a double push on the previous
    /// move.
    #[must_use]
    pub const fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    /// Starts at 1 and is incremented after each Black move.
    #[must_use]
    pub const fn fullmove_counter(&self) -> u16 {
        self.fullmove_counter.get()
    }

    /// Returns the piece the move would remove from the board. The pawn
    /// captured en passant does not stand on the destination square.
    #[must_use]
    pub fn captured_piece(&self, next_move: Move) -> Option<Piece> {
        match next_move.kind() {
            MoveKind::EnPassant => self.board.at(Square::new(
                next_move.to().file(),
                next_move.from().rank(),
            )),
            MoveKind::Capture => self.board.at(next_move.to()),
            _ => None,
        }
    }

    /// Plays the move and returns the resulting position. The position itself
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::IllegalMove`] if the move is not among the legal
    /// moves of the side to move.
    pub fn apply_move(&self, next_move: Move) -> Result<Self, ChessError> {
        if !movegen::legal_moves(self, self.side_to_move)?.contains(&next_move) {
            return Err(ChessError::IllegalMove {
                requested: MoveRequest::new(next_move.from(), next_move.to()),
                reason: IllegalMoveReason::Unreachable,
            });
        }
        let mut next = self.clone();
        let _ = next.make_move(next_move)?;
        Ok(next)
    }

    /// Applies the move without checking whether it is legal and returns the
    /// captured piece. The player owning the moving piece is considered to be
    /// the mover, which allows probing moves of the side not to move.
    pub(super) fn make_move(&mut self, next_move: Move) -> Result<Option<Piece>, ChessError> {
        let Some(piece) = self.board.take(next_move.from()) else {
            return Err(ChessError::InvariantViolation(format!(
                "no piece to move on {}",
                next_move.from()
            )));
        };
        let mover = piece.owner;
        let mut captured = self.board.take(next_move.to());
        match next_move.kind() {
            MoveKind::EnPassant => {
                captured = self.board.take(Square::new(
                    next_move.to().file(),
                    next_move.from().rank(),
                ));
            },
            MoveKind::Castle(side) => {
                let rank = Rank::backrank(mover);
                let (rook_from, rook_to) = match side {
                    CastlingSide::Short => (File::H, File::F),
                    CastlingSide::Long => (File::A, File::D),
                };
                let rook = self.board.take(Square::new(rook_from, rank));
                self.board.set(Square::new(rook_to, rank), rook);
            },
            MoveKind::Quiet | MoveKind::DoublePawnPush | MoveKind::Capture => (),
        }
        let placed = match next_move.promotion() {
            Some(promotion) => Piece::new(mover, promotion.into()),
            None => piece,
        };
        self.board.set(next_move.to(), Some(placed));

        if piece.kind == PieceKind::King {
            self.castling.remove(CastleRights::of(mover));
        }
        // Moving a rook away or capturing it on its original square.
        for square in [next_move.from(), next_move.to()] {
            self.castling.remove(corner_rights(square));
        }
        self.en_passant_square = match next_move.kind() {
            MoveKind::DoublePawnPush => next_move.from().shift(mover.push_direction()),
            _ => None,
        };
        if piece.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if mover == Player::Black {
            self.fullmove_counter = self.fullmove_counter.saturating_add(1);
        }
        self.side_to_move = mover.opponent();
        Ok(captured)
    }

    /// Checks whether the position could have been reached in a game: see
    /// [`Position::validate`].
    #[must_use]
    pub fn is_legal(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks the invariants every playable position upholds:
    ///
    /// - Each player has exactly one king, at most 8 pawns and at most 16
    ///   pieces.
    /// - There are no pawns on the backranks.
    /// - Castling rights are only present when the king and the rook are on
    ///   their original squares.
    /// - En passant square is on the correct rank, right behind the pawn that
    ///   was just pushed.
    /// - The player who just moved is not in check.
    ///
    /// # Errors
    ///
    /// Describes the first violated invariant.
    pub fn validate(&self) -> anyhow::Result<()> {
        for player in [Player::White, Player::Black] {
            let name = match player {
                Player::White => "white",
                Player::Black => "black",
            };
            let kings = self.board.count(Piece::new(player, PieceKind::King));
            if kings != 1 {
                bail!("expected 1 {name} king, got {kings}");
            }
            let pawns = self.board.count(Piece::new(player, PieceKind::Pawn));
            if pawns > 8 {
                bail!("expected <= 8 {name} pawns, got {pawns}");
            }
            let pieces = self.board.pieces(player).count();
            if pieces > 16 {
                bail!("expected <= 16 {name} pieces, got {pieces}");
            }
            let rank = Rank::backrank(player);
            for (side, rook_file) in [(CastlingSide::Short, File::H), (CastlingSide::Long, File::A)]
            {
                if self.castling.contains(CastleRights::side(player, side))
                    && (self.board.at(Square::new(File::E, rank))
                        != Some(Piece::new(player, PieceKind::King))
                        || self.board.at(Square::new(rook_file, rank))
                            != Some(Piece::new(player, PieceKind::Rook)))
                {
                    bail!("{name} can not castle {side:?}: king or rook has left its original square");
                }
            }
        }
        if self
            .board
            .iter()
            .any(|(square, piece)| {
                piece.kind == PieceKind::Pawn && matches!(square.rank(), Rank::One | Rank::Eight)
            })
        {
            bail!("pawns can not be placed on backranks");
        }
        if let Some(en_passant_square) = self.en_passant_square {
            let expected_rank = Rank::en_passant_target(self.side_to_move);
            if en_passant_square.rank() != expected_rank {
                bail!(
                    "expected en passant square to be on rank {expected_rank}, got {}",
                    en_passant_square.rank()
                );
            }
            // A pawn that was just pushed by our opponent should be in front of
            // en_passant_square.
            let they = self.side_to_move.opponent();
            let pushed_pawn = en_passant_square.shift(they.push_direction());
            if pushed_pawn.and_then(|square| self.board.at(square))
                != Some(Piece::new(they, PieceKind::Pawn))
            {
                bail!("en passant square is not beyond pushed pawn");
            }
            let original_square = en_passant_square.shift(they.push_direction().opposite());
            if self.board.at(en_passant_square).is_some()
                || original_square.and_then(|square| self.board.at(square)).is_some()
            {
                bail!("squares the pushed pawn passed through should be empty");
            }
        }
        if movegen::is_in_check(&self.board, self.side_to_move.opponent())? {
            bail!("the player who just moved can not be in check");
        }
        Ok(())
    }

    /// Parses board from Forsyth-Edwards Notation. It will also accept trimmed
    /// FEN (EPD with 4 parts).
    ///
    /// FEN ::=
    ///       Piece Placement
    ///   ' ' Side to move
    ///   ' ' Castling ability
    ///   ' ' En passant target square
    ///   ' ' Halfmove clock
    ///   ' ' Fullmove counter
    ///
    /// The last two parts (together) are optional and will default to "0 1".
    /// The parsed position is validated (see [`Position::validate`]).
    ///
    /// NOTE: This expects properly-formatted inputs: no extra symbols or
    /// additional whitespace. Use [`Position::try_from`] for cleaning up the
    /// input if it is coming from untrusted source and is likely to contain
    /// extra symbols.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed or describes an invalid
    /// position.
    pub fn from_fen(input: &str) -> anyhow::Result<Self> {
        let mut parts = input.split(' ');
        // Parse Piece Placement.
        let mut result = Self::empty();
        let pieces_placement = match parts.next() {
            Some(placement) => placement,
            None => bail!("incorrect FEN: missing pieces placement"),
        };
        let ranks = pieces_placement.split('/');
        let mut rank_id = BOARD_WIDTH;
        for rank_fen in ranks {
            if rank_id == 0 {
                bail!("incorrect FEN: expected 8 ranks, got {pieces_placement}");
            }
            rank_id -= 1;
            let rank = Rank::try_from(rank_id)?;
            let mut file: u8 = 0;
            for symbol in rank_fen.chars() {
                if matches!(symbol, '1'..='8') {
                    file += symbol as u8 - b'0';
                    if file > BOARD_WIDTH {
                        bail!("file exceeded {BOARD_WIDTH}");
                    }
                    continue;
                }
                let piece = Piece::try_from(symbol)?;
                if file >= BOARD_WIDTH {
                    bail!("file exceeded {BOARD_WIDTH}");
                }
                result
                    .board
                    .set(Square::new(File::try_from(file)?, rank), Some(piece));
                file += 1;
            }
            if file != BOARD_WIDTH {
                bail!(
                    "incorrect FEN: rank size should be exactly {BOARD_WIDTH}, got {rank_fen} of length {file}"
                );
            }
        }
        if rank_id != 0 {
            bail!("incorrect FEN: there should be 8 ranks, got {pieces_placement}");
        }
        result.side_to_move = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("incorrect FEN: missing side to move"),
        };
        result.castling = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("incorrect FEN: missing castling rights"),
        };
        result.en_passant_square = match parts.next() {
            Some("-") => None,
            Some(value) => Some(value.try_into()?),
            None => bail!("incorrect FEN: missing en passant square"),
        };
        let Some(halfmove_clock) = parts.next() else {
            // This is a correct EPD: exit early.
            result.validate()?;
            return Ok(result);
        };
        if !halfmove_clock.bytes().all(|c| c.is_ascii_digit()) {
            bail!("halfmove clock can not contain anything other than digits");
        }
        result.halfmove_clock = halfmove_clock.parse::<u16>().with_context(|| {
            format!("incorrect FEN: halfmove clock can not be parsed {halfmove_clock}")
        })?;
        result.fullmove_counter = match parts.next() {
            Some(value) => {
                if !value.bytes().all(|c| c.is_ascii_digit()) {
                    bail!("fullmove counter clock can not contain anything other than digits");
                }
                value.parse::<NonZeroU16>().with_context(|| {
                    format!("incorrect FEN: fullmove counter can not be parsed {value}")
                })?
            },
            None => bail!("incorrect FEN: missing fullmove counter"),
        };
        if parts.next().is_some() {
            bail!("trailing symbols are not allowed in FEN");
        }
        result.validate()?;
        Ok(result)
    }
}

/// Castling right lost when a piece leaves or lands on the given square.
const fn corner_rights(square: Square) -> CastleRights {
    match square {
        Square::A1 => CastleRights::WHITE_LONG,
        Square::H1 => CastleRights::WHITE_SHORT,
        Square::A8 => CastleRights::BLACK_LONG,
        Square::H8 => CastleRights::BLACK_SHORT,
        _ => CastleRights::NONE,
    }
}

impl TryFrom<&str> for Position {
    type Error = anyhow::Error;

    /// Trims the input and strips the optional `fen ` or `epd ` prefix before
    /// parsing it with [`Position::from_fen`].
    fn try_from(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        for prefix in ["fen ", "epd "] {
            if let Some(stripped) = input.strip_prefix(prefix) {
                return Self::from_fen(stripped);
            }
        }
        Self::from_fen(input)
    }
}

impl fmt::Display for Position {
    /// Prints board in Forsyth-Edwards Notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", &self.board)?;
        write!(f, "{} ", &self.side_to_move)?;
        write!(f, "{} ", &self.castling)?;
        match self.en_passant_square {
            Some(square) => write!(f, "{square} "),
            None => write!(f, "- "),
        }?;
        write!(f, "{} ", &self.halfmove_clock)?;
        write!(f, "{}", &self.fullmove_counter)?;
        Ok(())
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}", &self.board)?;
        writeln!(f, "Player to move: {:?}", &self.side_to_move)?;
        writeln!(f, "Fullmove counter: {:?}", &self.fullmove_counter)?;
        writeln!(f, "En Passant: {:?}", &self.en_passant_square)?;
        // bitflags' default fmt::Debug implementation is not very convenient:
        // dump FEN instead.
        writeln!(f, "Castling rights: {}", &self.castling)?;
        writeln!(f, "FEN: {self}")?;
        Ok(())
    }
}
