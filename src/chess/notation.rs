//! Parser for the two-square move text typed by players: `"e2 e4"`.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use itertools::Itertools;

use crate::chess::core::Square;
use crate::chess::error::ChessError;

/// Source and destination squares of a move a player asked for. Whether the
/// move is legal is decided by [`crate::chess::game::Game`].
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
}

impl MoveRequest {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(from: Square, to: Square) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for MoveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.from, self.to)
    }
}

impl FromStr for MoveRequest {
    type Err = ChessError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse(text)
    }
}

/// Parses `<file><rank> <file><rank>`, e.g. `"e2 e4"`. Files are
/// case-insensitive, squares are separated by any amount of whitespace and
/// surrounding whitespace is ignored.
///
/// ```
/// use kingside::chess::core::Square;
/// use kingside::chess::notation::{parse, MoveRequest};
///
/// assert_eq!(
///     parse("E2 e4").unwrap(),
///     MoveRequest::new(Square::E2, Square::E4)
/// );
/// assert!(parse("e9 e4").is_err());
/// assert!(parse("e2e4").is_err());
/// ```
///
/// # Errors
///
/// Returns [`ChessError::Syntax`] for any other shape of input.
pub fn parse(text: &str) -> Result<MoveRequest, ChessError> {
    parse_squares(text)
        .map(|(from, to)| MoveRequest::new(from, to))
        .map_err(|e| ChessError::Syntax(format!("{:?}: {e}", text.trim())))
}

fn parse_squares(text: &str) -> anyhow::Result<(Square, Square)> {
    let Some((from, to)) = text.split_whitespace().collect_tuple() else {
        bail!("expected two squares separated by a space, e.g. \"e2 e4\"");
    };
    Ok((parse_square(from)?, parse_square(to)?))
}

fn parse_square(token: &str) -> anyhow::Result<Square> {
    Square::try_from(token.to_ascii_lowercase().as_str())
}
