//! Binary save format for [`Game`].
//!
//! The layout is fixed-size (100 bytes) with all integers in big-endian:
//!
//! | Offset | Size | Contents |
//! | ------ | ---- | -------- |
//! | 0 | 4 | magic `KSAV` |
//! | 4 | 1 | format version (1) |
//! | 5 | 64 | squares A1..H8: 0 for empty, otherwise piece code (1 king, 2 queen, 3 rook, 4 bishop, 5 knight, 6 pawn) with bit 3 set for Black |
//! | 69 | 1 | side to move: 0 White, 1 Black |
//! | 70 | 1 | castling rights: bit 3 `K`, bit 2 `Q`, bit 1 `k`, bit 0 `q` |
//! | 71 | 1 | en passant square index, 255 for none |
//! | 72 | 2 | halfmove clock |
//! | 74 | 2 | fullmove counter (at least 1) |
//! | 76 | 12 | White's clock: seconds (8) and nanoseconds (4) |
//! | 88 | 12 | Black's clock: seconds (8) and nanoseconds (4) |
//!
//! Loading checks every field and validates the resulting position, so a
//! save either loads completely or is rejected with
//! [`ChessError::CorruptSave`].

use std::fs;
use std::io::{self, Read};
use std::num::NonZeroU16;
use std::path::Path;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use tracing::{info, warn};

use crate::chess::board::Board;
use crate::chess::core::{CastleRights, Piece, PieceKind, Player, Square, BOARD_SIZE};
use crate::chess::error::ChessError;
use crate::chess::game::{Clock, Game};
use crate::chess::position::Position;

const MAGIC: &[u8; 4] = b"KSAV";
const VERSION: u8 = 1;
/// Size of a serialized game in bytes.
pub const SAVE_SIZE: usize = 100;

const BOARD_OFFSET: usize = 5;
const STATE_OFFSET: usize = BOARD_OFFSET + BOARD_SIZE as usize;
const NO_EN_PASSANT: u8 = u8::MAX;
const BLACK_BIT: u8 = 0b1000;
const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Serializes the game.
#[must_use]
pub fn save(game: &Game) -> Vec<u8> {
    let position = game.position();
    let mut bytes = [0; SAVE_SIZE];
    bytes[..MAGIC.len()].copy_from_slice(MAGIC);
    bytes[MAGIC.len()] = VERSION;
    for square in Square::ALL {
        bytes[BOARD_OFFSET + square.index()] = position.board().at(square).map_or(0, encode_piece);
    }
    let state = &mut bytes[STATE_OFFSET..];
    state[0] = match position.side_to_move() {
        Player::White => 0,
        Player::Black => 1,
    };
    state[1] = position.castling().bits();
    state[2] = position
        .en_passant_square()
        .map_or(NO_EN_PASSANT, |square| square as u8);
    BigEndian::write_u16(&mut state[3..5], position.halfmove_clock());
    BigEndian::write_u16(&mut state[5..7], position.fullmove_counter());
    for (player, offset) in [(Player::White, 7), (Player::Black, 19)] {
        let elapsed = game.clock().elapsed(player);
        BigEndian::write_u64(&mut state[offset..offset + 8], elapsed.as_secs());
        BigEndian::write_u32(&mut state[offset + 8..offset + 12], elapsed.subsec_nanos());
    }
    bytes.to_vec()
}

/// Restores a game from bytes produced by [`save`]. The clock is stopped
/// until the next move.
///
/// # Errors
///
/// Returns [`ChessError::CorruptSave`] if the input is not a valid save.
pub fn load(bytes: &[u8]) -> Result<Game, ChessError> {
    decode(bytes).map_err(|e| {
        warn!(error = %e, "rejected save");
        ChessError::CorruptSave(format!("{e:#}"))
    })
}

fn decode(bytes: &[u8]) -> anyhow::Result<Game> {
    if bytes.len() != SAVE_SIZE {
        anyhow::bail!("expected {SAVE_SIZE} bytes, got {}", bytes.len());
    }
    let mut reader = bytes;
    let mut magic = [0; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        anyhow::bail!("not a saved game");
    }
    let version = reader.read_u8()?;
    if version != VERSION {
        anyhow::bail!("unsupported save version {version}");
    }
    let mut board = Board::empty();
    for square in Square::ALL {
        board.set(square, decode_piece(reader.read_u8()?, square)?);
    }
    let side_to_move = match reader.read_u8()? {
        0 => Player::White,
        1 => Player::Black,
        value => anyhow::bail!("side to move should be 0 or 1, got {value}"),
    };
    let castling_bits = reader.read_u8()?;
    let Some(castling) = CastleRights::from_bits(castling_bits) else {
        anyhow::bail!("unknown castling rights {castling_bits:#06b}");
    };
    let en_passant_square = match reader.read_u8()? {
        NO_EN_PASSANT => None,
        index => Some(Square::try_from(index)?),
    };
    let halfmove_clock = reader.read_u16::<BigEndian>()?;
    let Some(fullmove_counter) = NonZeroU16::new(reader.read_u16::<BigEndian>()?) else {
        anyhow::bail!("fullmove counter can not be 0");
    };
    let white = read_duration(&mut reader)?;
    let black = read_duration(&mut reader)?;
    let position = Position::from_parts(
        board,
        side_to_move,
        castling,
        en_passant_square,
        halfmove_clock,
        fullmove_counter,
    )?;
    Ok(Game::from_parts(position, Clock::with_elapsed(white, black)))
}

fn read_duration(reader: &mut &[u8]) -> anyhow::Result<Duration> {
    let secs = reader.read_u64::<BigEndian>()?;
    let nanos = reader.read_u32::<BigEndian>()?;
    if nanos >= NANOS_PER_SEC {
        anyhow::bail!("clock nanoseconds should be below {NANOS_PER_SEC}, got {nanos}");
    }
    Ok(Duration::new(secs, nanos))
}

const fn encode_piece(piece: Piece) -> u8 {
    let kind = piece.kind as u8;
    match piece.owner {
        Player::White => kind,
        Player::Black => kind | BLACK_BIT,
    }
}

fn decode_piece(code: u8, square: Square) -> anyhow::Result<Option<Piece>> {
    if code == 0 {
        return Ok(None);
    }
    let owner = if code & BLACK_BIT == 0 {
        Player::White
    } else {
        Player::Black
    };
    let kind_code = code & !BLACK_BIT;
    match PieceKind::ALL.into_iter().find(|kind| *kind as u8 == kind_code) {
        Some(kind) => Ok(Some(Piece::new(owner, kind))),
        None => anyhow::bail!("unknown piece code {code} on {square}"),
    }
}

/// Writes the game to the file, replacing its contents.
///
/// # Errors
///
/// Returns [`ChessError::Io`] if the file can not be written.
pub fn save_to_file(game: &Game, path: impl AsRef<Path>) -> Result<(), ChessError> {
    let path = path.as_ref();
    fs::write(path, save(game))?;
    info!(path = %path.display(), fen = %game.position(), "game saved");
    Ok(())
}

/// Reads a game saved with [`save_to_file`].
///
/// # Errors
///
/// Returns [`ChessError::FileNotFound`] if there is no such file,
/// [`ChessError::Io`] if it can not be read and [`ChessError::CorruptSave`]
/// if the contents are not a valid save.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Game, ChessError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ChessError::FileNotFound(path.to_path_buf()),
        _ => ChessError::Io(e),
    })?;
    let game = load(&bytes)?;
    info!(path = %path.display(), fen = %game.position(), "game loaded");
    Ok(game)
}

#[cfg(test)]
mod test {
    use std::time::Instant;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::notation::MoveRequest;

    #[test]
    fn starting_layout() {
        let bytes = save(&Game::new());
        assert_eq!(bytes.len(), SAVE_SIZE);
        assert_eq!(&bytes[..5], b"KSAV\x01");
        // White rook on A1, black king on E8.
        assert_eq!(bytes[BOARD_OFFSET], 3);
        assert_eq!(bytes[BOARD_OFFSET + Square::E8.index()], 1 | BLACK_BIT);
        assert_eq!(&bytes[STATE_OFFSET..STATE_OFFSET + 7], &[0, 0b1111, 255, 0, 0, 0, 1]);
    }

    #[test]
    fn round_trip() {
        let mut game = Game::from_position(
            Position::try_from("r3k2r/pp3ppp/8/2pP4/8/8/PP3PPP/R3K2R w Kq c6 4 17").unwrap(),
        );
        let _ = game.play("a2 a4").unwrap();
        assert_eq!(game.position().en_passant_square(), Some(Square::A3));
        let bytes = save(&game);
        let loaded = load(&bytes).unwrap();
        assert_eq!(loaded, game);
        assert_eq!(save(&loaded), bytes);
    }

    #[test]
    fn clocks_survive() {
        let game = Game::from_parts(
            Position::starting(),
            Clock::with_elapsed(Duration::new(61, 500), Duration::from_millis(1234)),
        );
        let loaded = load(&save(&game)).unwrap();
        assert_eq!(
            loaded.clock().elapsed(Player::White),
            Duration::new(61, 500)
        );
        assert_eq!(
            loaded.clock().elapsed(Player::Black),
            Duration::from_millis(1234)
        );
        assert!(!loaded.clock().is_running());
    }

    #[test]
    fn huge_clocks_keep_running() {
        let mut bytes = save(&Game::new());
        let black = STATE_OFFSET + 19;
        BigEndian::write_u64(&mut bytes[black..black + 8], u64::MAX);
        BigEndian::write_u32(&mut bytes[black + 8..black + 12], NANOS_PER_SEC - 1);
        let mut game = load(&bytes).unwrap();
        let start = Instant::now();
        let e2e4 = game
            .resolve(MoveRequest::new(Square::E2, Square::E4), None)
            .unwrap();
        let _ = game.apply_move_at(e2e4, start).unwrap();
        let e7e5 = game
            .resolve(MoveRequest::new(Square::E7, Square::E5), None)
            .unwrap();
        let _ = game
            .apply_move_at(e7e5, start + Duration::from_millis(2))
            .unwrap();
        assert_eq!(game.clock().elapsed(Player::Black), Duration::MAX);
        assert_eq!(load(&save(&game)).unwrap(), game);
    }

    fn corrupt(bytes: &[u8]) -> String {
        match load(bytes) {
            Err(ChessError::CorruptSave(message)) => message,
            other => panic!("expected corrupt save, got {other:?}"),
        }
    }

    #[test]
    fn rejects_corruption() {
        let valid = save(&Game::new());
        assert_eq!(corrupt(&valid[..50]), "expected 100 bytes, got 50");
        assert_eq!(corrupt(&[]), "expected 100 bytes, got 0");

        let mut bytes = valid.clone();
        bytes[0] = b'X';
        assert_eq!(corrupt(&bytes), "not a saved game");

        let mut bytes = valid.clone();
        bytes[4] = 2;
        assert_eq!(corrupt(&bytes), "unsupported save version 2");

        let mut bytes = valid.clone();
        bytes[BOARD_OFFSET + Square::D4.index()] = 7;
        assert_eq!(corrupt(&bytes), "unknown piece code 7 on d4");

        // Second white king.
        let mut bytes = valid.clone();
        bytes[BOARD_OFFSET + Square::D4.index()] = 1;
        assert_eq!(corrupt(&bytes), "expected 1 white king, got 2");

        let mut bytes = valid.clone();
        bytes[STATE_OFFSET] = 2;
        assert_eq!(corrupt(&bytes), "side to move should be 0 or 1, got 2");

        let mut bytes = valid.clone();
        bytes[STATE_OFFSET + 1] = 0b1_0000;
        assert_eq!(corrupt(&bytes), "unknown castling rights 0b10000");

        let mut bytes = valid.clone();
        bytes[STATE_OFFSET + 2] = 64;
        assert_eq!(
            corrupt(&bytes),
            "square index should be in 0..BOARD_SIZE, got 64"
        );

        let mut bytes = valid.clone();
        bytes[STATE_OFFSET + 6] = 0;
        assert_eq!(corrupt(&bytes), "fullmove counter can not be 0");

        let mut bytes = valid;
        BigEndian::write_u32(&mut bytes[STATE_OFFSET + 15..STATE_OFFSET + 19], NANOS_PER_SEC);
        assert!(corrupt(&bytes).starts_with("clock nanoseconds should be below"));
    }
}
