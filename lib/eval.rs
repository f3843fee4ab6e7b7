use derive_more::Display;
use serde::Serialize;
use test_strategy::Arbitrary;

/// An evaluation in [centipawns], clamped to `±10000`.
///
/// The bounds double as the mate sentinels; positive favors the white player.
///
/// [centipawns]: https://www.chessprogramming.org/Centipawns
#[derive(
    Debug, Display, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Arbitrary, Serialize,
)]
pub struct Score(#[strategy(Score::MIN..=Score::MAX)] i16);

impl Score {
    const MIN: i16 = -10000;
    const MAX: i16 = 10000;

    /// Constructs [`Score`] from the raw centipawn value.
    ///
    /// # Panics
    ///
    /// Panics if `i` is outside of the bounds.
    pub fn new(i: i16) -> Self {
        assert!((Self::MIN..=Self::MAX).contains(&i));
        Score(i)
    }

    /// Returns the lower bound.
    pub fn lower() -> Self {
        Score(Self::MIN)
    }

    /// Returns the upper bound.
    pub fn upper() -> Self {
        Score(Self::MAX)
    }

    /// Constructs [`Score`] from a raw centipawn value through saturation.
    pub fn saturate(i: i64) -> Self {
        Score(i.clamp(Self::MIN as i64, Self::MAX as i64) as i16)
    }

    /// Returns the raw centipawn value.
    pub fn get(&self) -> i16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn saturation_preserves_values_within_bounds(s: Score) {
        assert_eq!(Score::saturate(s.get() as i64), s);
    }

    #[proptest]
    fn saturation_clamps_values_outside_bounds(#[strategy(10001i64..)] i: i64) {
        assert_eq!(Score::saturate(i), Score::upper());
        assert_eq!(Score::saturate(-i), Score::lower());
    }

    #[proptest]
    fn score_serializes_as_a_plain_number(s: Score) {
        assert_eq!(
            serde_json::to_value(s)?,
            serde_json::Value::from(s.get())
        );
    }
}
