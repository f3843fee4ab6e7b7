use derive_more::{Display, Error};
use proptest::prelude::*;
use shakmaty as sm;
use std::str::FromStr;

/// A chess move in pure coordinate notation.
///
/// A [`Move`] is only meaningful relative to some [`Position`][super::Position];
/// whether it is legal can only be judged against the position it was produced
/// for.
#[derive(Debug, Display, Clone, Eq, PartialEq, Hash)]
#[display(fmt = "{}", _0)]
pub struct Move(sm::uci::Uci);

#[doc(hidden)]
impl From<sm::uci::Uci> for Move {
    fn from(m: sm::uci::Uci) -> Self {
        Move(m)
    }
}

#[doc(hidden)]
impl From<Move> for sm::uci::Uci {
    fn from(m: Move) -> Self {
        m.0
    }
}

impl Arbitrary for Move {
    type Parameters = ();
    type Strategy = BoxedStrategy<Move>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        const PROMOTIONS: [sm::Role; 4] = [
            sm::Role::Knight,
            sm::Role::Bishop,
            sm::Role::Rook,
            sm::Role::Queen,
        ];

        (0..64u32, 0..64u32, proptest::option::of(0..4usize))
            .prop_map(|(from, to, p)| {
                Move(sm::uci::Uci::Normal {
                    from: sm::Square::new(from),
                    to: sm::Square::new(to),
                    promotion: p.map(|i| PROMOTIONS[i]),
                })
            })
            .boxed()
    }
}

/// The reason why the string does not encode a coordinate move.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
#[display(fmt = "failed to parse move")]
pub struct ParseMoveError;

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<sm::uci::Uci>() {
            Ok(m) => Ok(Move(m)),
            Err(_) => Err(ParseMoveError),
        }
    }
}
