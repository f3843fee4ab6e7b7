use super::{Color, Move, Outcome};
use derive_more::{Display, Error, From};
use proptest::prelude::*;
use proptest::sample::{Selector, SelectorStrategy};
use proptest::strategy::Map;
use shakmaty as sm;
use std::fmt::{self, Debug, Formatter};
use std::ops::Range;
use std::str::FromStr;

/// The current position on the chess board.
///
/// This type guarantees that it only holds valid positions.
#[derive(Default, Clone, Eq, PartialEq)]
pub struct Position(sm::Chess);

impl Debug for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Position({self})")
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let fen = sm::fen::Fen::from_position(self.0.clone(), sm::EnPassantMode::Legal);
        fmt::Display::fmt(&fen, f)
    }
}

impl Arbitrary for Position {
    type Parameters = ();
    type Strategy = Map<(Range<usize>, SelectorStrategy), fn((usize, Selector)) -> Position>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (0..128, any::<Selector>()).prop_map(|(moves, selector)| {
            let mut chess = sm::Chess::default();

            for _ in 0..moves {
                match selector.try_select(sm::Position::legal_moves(&chess)) {
                    None => break,
                    Some(m) => sm::Position::play_unchecked(&mut chess, &m),
                }
            }

            Position(chess)
        })
    }
}

impl Position {
    /// The side to move.
    pub fn turn(&self) -> Color {
        sm::Position::turn(&self.0).into()
    }

    /// Whether this position is a [checkmate].
    ///
    /// [checkmate]: https://www.chessprogramming.org/Checkmate
    pub fn is_checkmate(&self) -> bool {
        sm::Position::is_checkmate(&self.0)
    }

    /// Whether this position is a [stalemate].
    ///
    /// [stalemate]: https://www.chessprogramming.org/Stalemate
    pub fn is_stalemate(&self) -> bool {
        sm::Position::is_stalemate(&self.0)
    }

    /// Whether this position has [insufficient material].
    ///
    /// [insufficient material]: https://www.chessprogramming.org/Material#InsufficientMaterial
    pub fn is_material_insufficient(&self) -> bool {
        sm::Position::is_insufficient_material(&self.0)
    }

    /// The [`Outcome`] of the game in case this position is terminal.
    ///
    /// Draws that depend on the game history, such as repetitions and the
    /// 50-move rule, are not detectable from a standalone position and are
    /// classified as non-terminal.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.is_checkmate() {
            Some(Outcome::Checkmate(!self.turn()))
        } else if self.is_stalemate() {
            Some(Outcome::Stalemate)
        } else if self.is_material_insufficient() {
            Some(Outcome::DrawByInsufficientMaterial)
        } else {
            None
        }
    }

    /// Whether a [`Move`] is legal in this position.
    pub fn is_legal(&self, m: &Move) -> bool {
        sm::uci::Uci::from(m.clone()).to_move(&self.0).is_ok()
    }
}

/// The reason why parsing the FEN string failed.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error, From)]
pub enum ParsePositionError {
    InvalidFen(InvalidFen),
    IllegalPosition(IllegalPosition),
}

/// The reason why the string is not valid FEN.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
pub enum InvalidFen {
    #[display(fmt = "syntax error at the piece placement field")]
    InvalidPlacement,
    #[display(fmt = "syntax error at the side to move field")]
    InvalidTurn,
    #[display(fmt = "syntax error at the castling rights field")]
    InvalidCastlingRights,
    #[display(fmt = "syntax error at the en passant square field")]
    InvalidEnPassantSquare,
    #[display(fmt = "syntax error at the halfmove clock field")]
    InvalidHalfmoveClock,
    #[display(fmt = "syntax error at the fullmove counter field")]
    InvalidFullmoves,
    #[display(fmt = "unspecified syntax error")]
    InvalidSyntax,
}

#[doc(hidden)]
impl From<sm::fen::ParseFenError> for InvalidFen {
    fn from(e: sm::fen::ParseFenError) -> Self {
        use InvalidFen::*;
        match e {
            sm::fen::ParseFenError::InvalidBoard => InvalidPlacement,
            sm::fen::ParseFenError::InvalidTurn => InvalidTurn,
            sm::fen::ParseFenError::InvalidCastling => InvalidCastlingRights,
            sm::fen::ParseFenError::InvalidEpSquare => InvalidEnPassantSquare,
            sm::fen::ParseFenError::InvalidHalfmoveClock => InvalidHalfmoveClock,
            sm::fen::ParseFenError::InvalidFullmoves => InvalidFullmoves,
            _ => InvalidSyntax,
        }
    }
}

/// The reason why the position represented by the FEN string is illegal.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
pub enum IllegalPosition {
    #[display(fmt = "at least one side has no king")]
    MissingKing,
    #[display(fmt = "at least one side has multiple kings")]
    TooManyKings,
    #[display(fmt = "there are pawns on the back-rank")]
    PawnsOnBackRank,
    #[display(fmt = "the player in check is not to move")]
    OppositeCheck,
    #[display(fmt = "invalid en passant square; wrong rank, occupied, or missing pushed pawn")]
    InvalidEnPassantSquare,
    #[display(fmt = "invalid castling rights")]
    InvalidCastlingRights,
    #[display(fmt = "no sequence of legal moves can reach this position")]
    Other,
}

#[doc(hidden)]
impl From<sm::PositionError<sm::Chess>> for IllegalPosition {
    fn from(e: sm::PositionError<sm::Chess>) -> Self {
        let kinds = e.kinds();

        if kinds.contains(sm::PositionErrorKinds::MISSING_KING) {
            IllegalPosition::MissingKing
        } else if kinds.contains(sm::PositionErrorKinds::TOO_MANY_KINGS) {
            IllegalPosition::TooManyKings
        } else if kinds.contains(sm::PositionErrorKinds::PAWNS_ON_BACKRANK) {
            IllegalPosition::PawnsOnBackRank
        } else if kinds.contains(sm::PositionErrorKinds::OPPOSITE_CHECK) {
            IllegalPosition::OppositeCheck
        } else if kinds.contains(sm::PositionErrorKinds::INVALID_EP_SQUARE) {
            IllegalPosition::InvalidEnPassantSquare
        } else if kinds.contains(sm::PositionErrorKinds::INVALID_CASTLING_RIGHTS) {
            IllegalPosition::InvalidCastlingRights
        } else {
            IllegalPosition::Other
        }
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fen: sm::fen::Fen = s.parse().map_err(InvalidFen::from)?;
        let chess: sm::Chess = sm::Setup::from(fen)
            .position(sm::CastlingMode::Standard)
            .map_err(IllegalPosition::from)?;

        Ok(Position(chess))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const SCHOLARS_MATE: &str = "r1bqkb1r/pppp1Qpp/2n2n2/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4";
    const STALEMATE: &str = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";
    const BARE_KINGS: &str = "K7/8/k7/8/8/8/8/8 w - - 0 1";

    #[proptest]
    fn parsing_printed_position_is_an_identity(pos: Position) {
        assert_eq!(pos.to_string().parse(), Ok(pos));
    }

    #[proptest]
    fn terminal_classification_is_stable_across_reencoding(pos: Position) {
        let reparsed: Position = pos.to_string().parse()?;
        assert_eq!(reparsed.outcome(), pos.outcome());
    }

    #[test]
    fn parsing_the_empty_string_fails() {
        assert!(matches!(
            "".parse::<Position>(),
            Err(ParsePositionError::InvalidFen(_))
        ));
    }

    #[test]
    fn parsing_fails_for_structurally_illegal_boards() {
        assert!(matches!(
            "8/8/8/8/8/8/8/8 w - - 0 1".parse::<Position>(),
            Err(ParsePositionError::IllegalPosition(_))
        ));
    }

    #[test]
    fn the_default_position_is_the_starting_position() {
        assert_eq!(Position::default().to_string(), STARTPOS);
    }

    #[test]
    fn checkmate_is_detected_and_attributed_to_the_mating_side() {
        let pos: Position = SCHOLARS_MATE.parse().unwrap();
        assert_eq!(pos.outcome(), Some(Outcome::Checkmate(Color::White)));
    }

    #[test]
    fn stalemate_is_detected() {
        let pos: Position = STALEMATE.parse().unwrap();
        assert_eq!(pos.outcome(), Some(Outcome::Stalemate));
    }

    #[test]
    fn bare_kings_are_a_draw_by_insufficient_material() {
        let pos: Position = BARE_KINGS.parse().unwrap();
        assert_eq!(pos.outcome(), Some(Outcome::DrawByInsufficientMaterial));
    }

    #[test]
    fn move_legality_is_judged_against_the_position() {
        let pos = Position::default();
        assert!(pos.is_legal(&"e2e4".parse().unwrap()));
        assert!(!pos.is_legal(&"e2e5".parse().unwrap()));
        assert!(!pos.is_legal(&"e7e5".parse().unwrap()));
    }

    #[proptest]
    fn no_move_is_legal_in_a_checkmate_position(m: Move) {
        let pos: Position = SCHOLARS_MATE.parse()?;
        assert!(!pos.is_legal(&m));
    }
}
