//! Elo rating arithmetic.

pub const K_FACTOR: f64 = 32.0;

/// Result of a game from White's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl Outcome {
    /// Actual score for white and black.
    fn scores(self) -> (f64, f64) {
        match self {
            Outcome::WhiteWins => (1.0, 0.0),
            Outcome::BlackWins => (0.0, 1.0),
            Outcome::Draw => (0.5, 0.5),
        }
    }
}

/// Probability-like expected score of a player rated `own` against `other`.
pub fn expected_score(own: i32, other: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf((other - own) as f64 / 400.0))
}

fn new_rating(old: i32, actual: f64, expected: f64) -> i32 {
    (old as f64 + K_FACTOR * (actual - expected)).round() as i32
}

/// Rating changes `(white_delta, black_delta)` for a finished game.
pub fn rate(white_elo: i32, black_elo: i32, outcome: Outcome) -> (i32, i32) {
    let (white_actual, black_actual) = outcome.scores();
    let white_new = new_rating(white_elo, white_actual, expected_score(white_elo, black_elo));
    let black_new = new_rating(black_elo, black_actual, expected_score(black_elo, white_elo));
    (white_new - white_elo, black_new - black_elo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_ratings() {
        assert_eq!(rate(1200, 1200, Outcome::WhiteWins), (16, -16));
        assert_eq!(rate(1200, 1200, Outcome::BlackWins), (-16, 16));
        assert_eq!(rate(1200, 1200, Outcome::Draw), (0, 0));
    }

    #[test]
    fn test_upset_pays_more() {
        let (white, black) = rate(1000, 1400, Outcome::WhiteWins);
        assert_eq!(white, 29);
        assert_eq!(black, -29);
        assert!(rate(1400, 1000, Outcome::WhiteWins).0 < white);
    }

    #[test]
    fn test_expected_score_symmetry() {
        let e = expected_score(1500, 1300);
        assert!((e + expected_score(1300, 1500) - 1.0).abs() < 1e-12);
        assert!(e > 0.5);
    }

    proptest! {
        #[test]
        fn elo_deltas_are_zero_sum(
            white in 100i32..3000,
            black in 100i32..3000,
            outcome in prop_oneof![
                Just(Outcome::WhiteWins),
                Just(Outcome::BlackWins),
                Just(Outcome::Draw),
            ],
        ) {
            let (dw, db) = rate(white, black, outcome);
            prop_assert!((dw + db).abs() <= 1);
        }
    }
}
