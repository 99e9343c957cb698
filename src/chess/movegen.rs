//! Move generation: [pseudo-legal] moves for each piece pattern, attack
//! detection and the legality filter on top of them.
//!
//! Legal moves are produced by playing every pseudo-legal move on a copy of
//! the position and dropping the ones that leave the mover's king attacked.
//! Pins, checks and en passant discoveries all fall out of this filter
//! without special cases.
//!
//! [pseudo-legal]: https://www.chessprogramming.org/Pseudo-Legal_Move

use crate::chess::board::Board;
use crate::chess::core::{
    CastleRights,
    CastlingSide,
    Direction,
    File,
    Move,
    MoveKind,
    MoveList,
    Piece,
    PieceKind,
    Player,
    Promotion,
    Rank,
    Square,
};
use crate::chess::error::ChessError;
use crate::chess::position::Position;

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Castling geometry per side: rook file, squares between the king and the
/// rook, and the squares the king walks through (the last one is where it
/// lands).
const CASTLING: [(CastlingSide, File, &[File], [File; 2]); 2] = [
    (CastlingSide::Short, File::H, &[File::F, File::G], [File::F, File::G]),
    (
        CastlingSide::Long,
        File::A,
        &[File::B, File::C, File::D],
        [File::D, File::C],
    ),
];

/// Generates moves that follow piece movement patterns and board occupancy
/// for pieces of the given player. These may leave the player's king in
/// check.
///
/// En passant is only generated for the player the target square belongs
/// to, i.e. the side to move.
#[must_use]
pub fn pseudo_legal_moves(position: &Position, player: Player) -> MoveList {
    let mut moves = MoveList::new();
    let board = position.board();
    for (from, piece) in board.pieces(player) {
        match piece.kind {
            PieceKind::Pawn => add_pawn_moves(position, player, from, &mut moves),
            PieceKind::Knight => {
                for (file_delta, rank_delta) in KNIGHT_OFFSETS {
                    if let Some(to) = from.offset(file_delta, rank_delta) {
                        add_step(board, player, from, to, &mut moves);
                    }
                }
            },
            PieceKind::Bishop => add_slides(board, player, from, &Direction::DIAGONAL, &mut moves),
            PieceKind::Rook => add_slides(board, player, from, &Direction::ORTHOGONAL, &mut moves),
            PieceKind::Queen => add_slides(board, player, from, &Direction::ALL, &mut moves),
            PieceKind::King => {
                for direction in Direction::ALL {
                    if let Some(to) = from.shift(direction) {
                        add_step(board, player, from, to, &mut moves);
                    }
                }
                add_castling_moves(position, player, &mut moves);
            },
        }
    }
    moves
}

fn add_step(board: &Board, player: Player, from: Square, to: Square, moves: &mut MoveList) {
    match board.at(to) {
        None => moves.push(Move::new(from, to, None, MoveKind::Quiet)),
        Some(piece) if piece.owner != player => {
            moves.push(Move::new(from, to, None, MoveKind::Capture));
        },
        Some(_) => (),
    }
}

fn add_slides(
    board: &Board,
    player: Player,
    from: Square,
    directions: &[Direction],
    moves: &mut MoveList,
) {
    for &direction in directions {
        let mut current = from;
        while let Some(to) = current.shift(direction) {
            match board.at(to) {
                None => moves.push(Move::new(from, to, None, MoveKind::Quiet)),
                Some(piece) => {
                    if piece.owner != player {
                        moves.push(Move::new(from, to, None, MoveKind::Capture));
                    }
                    break;
                },
            }
            current = to;
        }
    }
}

fn add_pawn_moves(position: &Position, player: Player, from: Square, moves: &mut MoveList) {
    let board = position.board();
    let forward = player.push_direction();
    if let Some(single) = from.shift(forward) {
        if board.at(single).is_none() {
            add_pawn_move(player, from, single, MoveKind::Quiet, moves);
            if from.rank() == Rank::pawns_starting(player) {
                if let Some(double) = single.shift(forward) {
                    if board.at(double).is_none() {
                        moves.push(Move::new(from, double, None, MoveKind::DoublePawnPush));
                    }
                }
            }
        }
    }
    let (_, rank_delta) = forward.delta();
    for file_delta in [-1, 1] {
        let Some(to) = from.offset(file_delta, rank_delta) else {
            continue;
        };
        match board.at(to) {
            Some(piece) if piece.owner != player => {
                add_pawn_move(player, from, to, MoveKind::Capture, moves);
            },
            None if position.en_passant_square() == Some(to)
                && to.rank() == Rank::en_passant_target(player) =>
            {
                moves.push(Move::new(from, to, None, MoveKind::EnPassant));
            },
            _ => (),
        }
    }
}

/// Pawns reaching the last rank are promoted to any of the four pieces.
fn add_pawn_move(player: Player, from: Square, to: Square, kind: MoveKind, moves: &mut MoveList) {
    if to.rank() == Rank::backrank(player.opponent()) {
        for promotion in Promotion::ALL {
            moves.push(Move::new(from, to, Some(promotion), kind));
        }
    } else {
        moves.push(Move::new(from, to, None, kind));
    }
}

fn add_castling_moves(position: &Position, player: Player, moves: &mut MoveList) {
    let board = position.board();
    let rank = Rank::backrank(player);
    let king_from = Square::new(File::E, rank);
    if board.at(king_from) != Some(Piece::new(player, PieceKind::King)) {
        return;
    }
    let opponent = player.opponent();
    if is_square_attacked(board, king_from, opponent) {
        return;
    }
    for (side, rook_file, between, walk) in CASTLING {
        if !position.castling().contains(CastleRights::side(player, side))
            || board.at(Square::new(rook_file, rank)) != Some(Piece::new(player, PieceKind::Rook))
        {
            continue;
        }
        if between
            .iter()
            .any(|file| board.at(Square::new(*file, rank)).is_some())
        {
            continue;
        }
        if walk
            .iter()
            .any(|file| is_square_attacked(board, Square::new(*file, rank), opponent))
        {
            continue;
        }
        moves.push(Move::new(
            king_from,
            Square::new(walk[1], rank),
            None,
            MoveKind::Castle(side),
        ));
    }
}

/// Returns true if any piece of `by` attacks the square, regardless of
/// whether moving there would expose its own king.
#[must_use]
pub fn is_square_attacked(board: &Board, square: Square, by: Player) -> bool {
    let is = |candidate: Option<Square>, kind: PieceKind| {
        candidate.and_then(|s| board.at(s)) == Some(Piece::new(by, kind))
    };
    // Pawns attack diagonally forward: look one rank behind the target.
    let (_, push) = by.push_direction().delta();
    if [-1, 1]
        .into_iter()
        .any(|file_delta| is(square.offset(file_delta, -push), PieceKind::Pawn))
    {
        return true;
    }
    if KNIGHT_OFFSETS
        .into_iter()
        .any(|(file_delta, rank_delta)| is(square.offset(file_delta, rank_delta), PieceKind::Knight))
    {
        return true;
    }
    if Direction::ALL
        .into_iter()
        .any(|direction| is(square.shift(direction), PieceKind::King))
    {
        return true;
    }
    let slider_attacks = |directions: [Direction; 4], kind: PieceKind| {
        directions.into_iter().any(|direction| {
            matches!(
                first_piece(board, square, direction),
                Some(piece) if piece.owner == by && (piece.kind == kind || piece.kind == PieceKind::Queen)
            )
        })
    };
    slider_attacks(Direction::ORTHOGONAL, PieceKind::Rook)
        || slider_attacks(Direction::DIAGONAL, PieceKind::Bishop)
}

/// The closest piece from the square (excluding it) in the given direction.
fn first_piece(board: &Board, square: Square, direction: Direction) -> Option<Piece> {
    let mut current = square;
    while let Some(next) = current.shift(direction) {
        if let Some(piece) = board.at(next) {
            return Some(piece);
        }
        current = next;
    }
    None
}

/// Returns true if the player's king is attacked by the opponent.
///
/// # Errors
///
/// Returns [`ChessError::InvariantViolation`] if the player has no king.
pub fn is_in_check(board: &Board, player: Player) -> Result<bool, ChessError> {
    Ok(is_square_attacked(
        board,
        board.king_square(player)?,
        player.opponent(),
    ))
}

/// Calculates a list of legal moves (i.e. the moves that do not leave our
/// king in check) for the given player. The player does not have to be the
/// side to move.
///
/// # Errors
///
/// Returns [`ChessError::InvariantViolation`] if the player has no king.
pub fn legal_moves(position: &Position, player: Player) -> Result<MoveList, ChessError> {
    let mut moves = MoveList::new();
    for candidate in pseudo_legal_moves(position, player) {
        let mut next = position.clone();
        let _ = next.make_move(candidate)?;
        if !is_in_check(next.board(), player)? {
            moves.push(candidate);
        }
    }
    Ok(moves)
}

/// The player is in check and has no legal moves.
///
/// # Errors
///
/// Returns [`ChessError::InvariantViolation`] if the player has no king.
pub fn is_checkmate(position: &Position, player: Player) -> Result<bool, ChessError> {
    Ok(is_in_check(position.board(), player)? && legal_moves(position, player)?.is_empty())
}

/// The player is not in check but has no legal moves.
///
/// # Errors
///
/// Returns [`ChessError::InvariantViolation`] if the player has no king.
pub fn is_stalemate(position: &Position, player: Player) -> Result<bool, ChessError> {
    Ok(!is_in_check(position.board(), player)? && legal_moves(position, player)?.is_empty())
}

/// [Perft] (**per**formance **t**esting) is a technique for checking
/// correctness of move generation by traversing the tree of possible positions
/// (nodes) and calculating all the leaf nodes at certain depth.
///
/// [Perft]: https://www.chessprogramming.org/Perft
///
/// # Errors
///
/// Propagates [`ChessError::InvariantViolation`] from the move generator.
pub fn perft(position: &Position, depth: u8) -> Result<u64, ChessError> {
    if depth == 0 {
        return Ok(1);
    }
    let moves = legal_moves(position, position.side_to_move())?;
    if depth == 1 {
        return Ok(moves.len() as u64);
    }
    let mut nodes = 0;
    for next_move in moves {
        let mut next = position.clone();
        let _ = next.make_move(next_move)?;
        nodes += perft(&next, depth - 1)?;
    }
    Ok(nodes)
}
