//! The game state machine: a [`Position`] plus per-side clocks, turn order
//! and terminal state detection.
//!
//! A [`Game`] is awaiting a move from the side to move until it reaches
//! checkmate or stalemate. Every move either fully applies or is rejected
//! with a reason and leaves the game untouched.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::chess::core::{Move, MoveList, Piece, Player, Promotion};
use crate::chess::error::{ChessError, IllegalMoveReason};
use crate::chess::movegen;
use crate::chess::notation::{self, MoveRequest};
use crate::chess::position::Position;

/// Outcome of the game so far, from the perspective of the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// The side to move has legal moves and is not in check.
    InProgress,
    /// The given player is in check and has to get out of it.
    Check(Player),
    /// The given player delivered checkmate and won.
    CheckmateBy(Player),
    /// The side to move has no legal moves but is not in check.
    Stalemate,
}

impl GameStatus {
    /// No more moves can be played.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::CheckmateBy(_) | Self::Stalemate)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in progress"),
            Self::Check(player) => write!(f, "{player:?} is in check"),
            Self::CheckmateBy(player) => write!(f, "checkmate, {player:?} wins"),
            Self::Stalemate => write!(f, "stalemate"),
        }
    }
}

/// Time spent thinking by each player.
///
/// The clock is charged at turn boundaries: [`Clock::tick`] adds the time
/// since the current turn started to the player who just moved. The start of
/// the current turn is not persisted, so the first tick after a game is
/// loaded only starts the turn. Clocks compare equal when their accumulated
/// durations match, regardless of the turn in progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
    white: Duration,
    black: Duration,
    turn_started: Option<Instant>,
}

impl Clock {
    /// A stopped clock with the given elapsed times.
    #[must_use]
    pub const fn with_elapsed(white: Duration, black: Duration) -> Self {
        Self {
            white,
            black,
            turn_started: None,
        }
    }

    /// Total time the player has spent on their moves.
    #[must_use]
    pub const fn elapsed(&self, player: Player) -> Duration {
        match player {
            Player::White => self.white,
            Player::Black => self.black,
        }
    }

    /// Starts measuring the current turn without charging anyone.
    pub fn start(&mut self, now: Instant) {
        self.turn_started = Some(now);
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.turn_started.is_some()
    }

    /// Charges the time since the turn started to `player` and starts the
    /// next turn at `now`.
    pub fn tick(&mut self, player: Player, now: Instant) {
        if let Some(started) = self.turn_started {
            let spent = now.saturating_duration_since(started);
            // Loaded clocks can be arbitrarily large.
            match player {
                Player::White => self.white = self.white.saturating_add(spent),
                Player::Black => self.black = self.black.saturating_add(spent),
            }
        }
        self.turn_started = Some(now);
    }
}

impl PartialEq for Clock {
    fn eq(&self, other: &Self) -> bool {
        self.white == other.white && self.black == other.black
    }
}

impl Eq for Clock {}

/// What happened after a move was applied. The caller decides how to present
/// captures and game endings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveReport {
    /// The move as resolved against the legal move list.
    pub played: Move,
    /// The piece removed from the board, if any.
    pub captured: Option<Piece>,
    /// Status of the game after the move.
    pub status: GameStatus,
}

/// A game of chess between two players sharing the terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    position: Position,
    clock: Clock,
}

impl Game {
    /// Starts a new game from the standard starting position. White's clock
    /// starts running immediately.
    #[must_use]
    pub fn new() -> Self {
        let mut game = Self::from_position(Position::starting());
        game.clock.start(Instant::now());
        game
    }

    /// Continues from an arbitrary position with both clocks at zero. The
    /// clock starts with the first move.
    #[must_use]
    pub fn from_position(position: Position) -> Self {
        Self {
            position,
            clock: Clock::default(),
        }
    }

    pub(super) const fn from_parts(position: Position, clock: Clock) -> Self {
        Self { position, clock }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn side_to_move(&self) -> Player {
        self.position.side_to_move()
    }

    /// Legal moves of the side to move.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::InvariantViolation`] if a king is missing.
    pub fn legal_moves(&self) -> Result<MoveList, ChessError> {
        movegen::legal_moves(&self.position, self.side_to_move())
    }

    /// Computes the status for the side to move.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::InvariantViolation`] if a king is missing.
    pub fn status(&self) -> Result<GameStatus, ChessError> {
        let player = self.side_to_move();
        let in_check = movegen::is_in_check(self.position.board(), player)?;
        let has_moves = !self.legal_moves()?.is_empty();
        Ok(match (in_check, has_moves) {
            (true, false) => GameStatus::CheckmateBy(player.opponent()),
            (false, false) => GameStatus::Stalemate,
            (true, true) => GameStatus::Check(player),
            (false, true) => GameStatus::InProgress,
        })
    }

    /// Parses a move in `"e2 e4"` format and plays it.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::Syntax`] for malformed input and
    /// [`ChessError::IllegalMove`] if the move can not be played.
    pub fn play(&mut self, text: &str) -> Result<MoveReport, ChessError> {
        let request = notation::parse(text)?;
        self.play_request(request, None)
    }

    /// Plays the requested move. Pawns reaching the last rank are promoted to
    /// the given piece, or to a queen when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::IllegalMove`] if the move can not be played.
    pub fn play_request(
        &mut self,
        request: MoveRequest,
        promotion: Option<Promotion>,
    ) -> Result<MoveReport, ChessError> {
        let next_move = self.resolve(request, promotion)?;
        self.apply_move(next_move)
    }

    /// Finds the legal move matching the request.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::IllegalMove`] explaining why no legal move
    /// matches.
    pub fn resolve(
        &self,
        request: MoveRequest,
        promotion: Option<Promotion>,
    ) -> Result<Move, ChessError> {
        let illegal = |reason| ChessError::IllegalMove {
            requested: request,
            reason,
        };
        if self.status()?.is_terminal() {
            return Err(illegal(IllegalMoveReason::GameOver));
        }
        let player = self.side_to_move();
        match self.position.board().at(request.from) {
            None => return Err(illegal(IllegalMoveReason::EmptySquare(request.from))),
            Some(piece) if piece.owner != player => {
                return Err(illegal(IllegalMoveReason::OpponentPiece(request.from)));
            },
            Some(_) => (),
        }
        let promotion = promotion.unwrap_or(Promotion::Queen);
        let matches = |m: &Move| {
            m.from() == request.from
                && m.to() == request.to
                && m.promotion().map_or(true, |p| p == promotion)
        };
        if let Some(found) = self.legal_moves()?.into_iter().find(matches) {
            return Ok(found);
        }
        if movegen::pseudo_legal_moves(&self.position, player)
            .iter()
            .any(matches)
        {
            Err(illegal(IllegalMoveReason::KingInCheck))
        } else {
            Err(illegal(IllegalMoveReason::Unreachable))
        }
    }

    /// Applies a move at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`Game::apply_move_at`].
    pub fn apply_move(&mut self, next_move: Move) -> Result<MoveReport, ChessError> {
        self.apply_move_at(next_move, Instant::now())
    }

    /// Applies a legal move, charges the time since the turn started to the
    /// mover and reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ChessError::IllegalMove`] if the game is over or the move is
    /// not legal. The game is not modified in that case.
    pub fn apply_move_at(
        &mut self,
        next_move: Move,
        now: Instant,
    ) -> Result<MoveReport, ChessError> {
        if self.status()?.is_terminal() {
            return Err(ChessError::IllegalMove {
                requested: MoveRequest::new(next_move.from(), next_move.to()),
                reason: IllegalMoveReason::GameOver,
            });
        }
        let mover = self.side_to_move();
        let captured = self.position.captured_piece(next_move);
        let next = self.position.apply_move(next_move)?;
        self.position = next;
        self.clock.tick(mover, now);
        let status = self.status()?;
        debug!(player = ?mover, played = %next_move, captured = ?captured, "move applied");
        if status.is_terminal() {
            info!(%status, fen = %self.position, "game over");
        }
        Ok(MoveReport {
            played: next_move,
            captured,
            status,
        })
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::core::{PieceKind, Square};

    #[test]
    fn new_game() {
        let game = Game::new();
        assert_eq!(game.position(), &Position::starting());
        assert_eq!(game.side_to_move(), Player::White);
        assert_eq!(game.status().unwrap(), GameStatus::InProgress);
        assert!(game.clock().is_running());
        assert_eq!(game.legal_moves().unwrap().len(), 20);
    }

    #[test]
    fn rejection_reasons() {
        let mut game = Game::new();
        let reason = |result: Result<MoveReport, ChessError>| match result {
            Err(ChessError::IllegalMove { reason, .. }) => reason,
            other => panic!("expected illegal move, got {other:?}"),
        };
        assert_eq!(
            reason(game.play("e3 e4")),
            IllegalMoveReason::EmptySquare(Square::E3)
        );
        assert_eq!(
            reason(game.play("e7 e5")),
            IllegalMoveReason::OpponentPiece(Square::E7)
        );
        assert_eq!(reason(game.play("e2 e5")), IllegalMoveReason::Unreachable);
        assert_eq!(game.position(), &Position::starting());

        let mut game = Game::from_position(
            Position::try_from("4k3/8/8/8/8/8/4r3/3K4 w - - 0 1").unwrap(),
        );
        // The king can not step next to the rook's line.
        assert_eq!(reason(game.play("d1 e1")), IllegalMoveReason::KingInCheck);
        assert!(game.play("d1 c1").is_ok());
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut game = Game::new();
        assert!(matches!(game.play("e2e4"), Err(ChessError::Syntax(_))));
        assert_eq!(game.position(), &Position::starting());
    }

    #[test]
    fn clock_ticks() {
        let start = Instant::now();
        let mut game = Game::from_position(Position::starting());
        game.clock.start(start);
        let _ = game.play("e2 e4").unwrap();
        let e7e5 = game.resolve(MoveRequest::new(Square::E7, Square::E5), None).unwrap();
        let white = game.clock().elapsed(Player::White);
        let _ = game
            .apply_move_at(e7e5, start + white + Duration::from_secs(3))
            .unwrap();
        assert_eq!(game.clock().elapsed(Player::Black), Duration::from_secs(3));
        assert_eq!(game.clock().elapsed(Player::White), white);
    }

    #[test]
    fn stopped_clock_starts_on_first_tick() {
        let mut clock = Clock::with_elapsed(Duration::from_secs(5), Duration::from_secs(7));
        let now = Instant::now();
        clock.tick(Player::White, now);
        assert_eq!(clock.elapsed(Player::White), Duration::from_secs(5));
        clock.tick(Player::Black, now + Duration::from_millis(1500));
        assert_eq!(clock.elapsed(Player::Black), Duration::from_millis(8500));
        assert_eq!(
            clock,
            Clock::with_elapsed(Duration::from_secs(5), Duration::from_millis(8500))
        );
    }

    #[test]
    fn clock_saturates() {
        let mut clock = Clock::with_elapsed(Duration::ZERO, Duration::MAX);
        let now = Instant::now();
        clock.start(now);
        clock.tick(Player::Black, now + Duration::from_millis(2));
        assert_eq!(clock.elapsed(Player::Black), Duration::MAX);
        assert_eq!(clock.elapsed(Player::White), Duration::ZERO);
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let position = Position::try_from("8/1P5k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let mut game = Game::from_position(position.clone());
        let report = game.play("b7 b8").unwrap();
        assert_eq!(report.played.promotion(), Some(Promotion::Queen));
        assert_eq!(
            game.position().board().at(Square::B8),
            Some(Piece::new(Player::White, PieceKind::Queen))
        );

        let mut game = Game::from_position(position);
        let report = game
            .play_request(
                MoveRequest::new(Square::B7, Square::B8),
                Some(Promotion::Knight),
            )
            .unwrap();
        assert_eq!(report.played.to_string(), "b7b8n");
    }

    #[test]
    fn no_moves_after_checkmate() {
        let mut game = Game::new();
        for text in ["f2 f3", "e7 e5", "g2 g4"] {
            assert_eq!(game.play(text).unwrap().status, GameStatus::InProgress);
        }
        let report = game.play("d8 h4").unwrap();
        assert_eq!(report.status, GameStatus::CheckmateBy(Player::Black));
        assert!(matches!(
            game.play("a2 a3"),
            Err(ChessError::IllegalMove {
                reason: IllegalMoveReason::GameOver,
                ..
            })
        ));
    }

    #[test]
    fn status_display() {
        assert_eq!(GameStatus::Check(Player::White).to_string(), "White is in check");
        assert_eq!(
            GameStatus::CheckmateBy(Player::Black).to_string(),
            "checkmate, Black wins"
        );
    }
}
