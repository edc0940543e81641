use std::cmp::Ordering;
use std::fmt;
use cozy_chess::Color;
use serde::{Deserialize, Serialize};

/// Engine score relative to the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    /// Moves to mate; negative when the side to move is getting mated.
    Mate(i32),
}

impl Score {
    /// Same score seen from white's side of the board.
    pub fn for_white(self, side_to_move: Color) -> Score {
        if side_to_move == Color::White { return self; }
        match self {
            Score::Centipawns(cp) => Score::Centipawns(cp.saturating_neg()),
            Score::Mate(n) => Score::Mate(n.saturating_neg()),
        }
    }

    pub fn is_mate(self) -> bool { matches!(self, Score::Mate(_)) }

    /// Fill of an evaluation bar for the side the score is relative to, in [0, 1].
    pub fn bar_fraction(self) -> f32 {
        match self {
            Score::Mate(n) if n > 0 => 1.0,
            Score::Mate(_) => 0.0,
            Score::Centipawns(cp) => {
                let x = cp.clamp(-2000, 2000) as f32;
                1.0 / (1.0 + (-0.004 * x).exp())
            }
        }
    }

    fn rank_key(self) -> (i32, i32) {
        match self {
            Score::Mate(n) if n > 0 => (2, n.saturating_neg()),
            Score::Mate(n) => (0, n.saturating_neg()),
            Score::Centipawns(cp) => (1, cp),
        }
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering { self.rank_key().cmp(&other.rank_key()) }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Centipawns(cp) => {
                let sign = if cp < 0 { '-' } else { '+' };
                let abs = cp.unsigned_abs();
                write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
            }
            Score::Mate(n) => write!(f, "#{}", n),
        }
    }
}

/// One of the engine's candidate lines for a position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLine {
    /// 1-based multipv rank.
    pub rank: u32,
    pub score: Score,
    pub depth: u32,
    pub moves: Vec<String>,
    #[serde(default)]
    pub san: Vec<String>,
}

impl CandidateLine {
    pub fn first_move(&self) -> Option<&str> { self.moves.first().map(|s| s.as_str()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(Score::Centipawns(35).to_string(), "+0.35");
        assert_eq!(Score::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(Score::Centipawns(-5).to_string(), "-0.05");
        assert_eq!(Score::Mate(3).to_string(), "#3");
        assert_eq!(Score::Mate(-2).to_string(), "#-2");
    }

    #[test]
    fn ordering_puts_mates_at_the_ends() {
        let mut v = vec![Score::Centipawns(50), Score::Mate(-1), Score::Mate(5), Score::Mate(2), Score::Centipawns(-300)];
        v.sort();
        assert_eq!(v, vec![Score::Mate(-1), Score::Centipawns(-300), Score::Centipawns(50), Score::Mate(5), Score::Mate(2)]);
    }

    #[test]
    fn white_perspective_flips_for_black() {
        assert_eq!(Score::Centipawns(40).for_white(Color::Black), Score::Centipawns(-40));
        assert_eq!(Score::Mate(2).for_white(Color::Black), Score::Mate(-2));
        assert_eq!(Score::Mate(2).for_white(Color::White), Score::Mate(2));
    }

    #[test]
    fn extreme_engine_values_do_not_overflow() {
        assert_eq!(Score::Centipawns(i32::MIN).for_white(Color::Black), Score::Centipawns(i32::MAX));
        assert_eq!(Score::Mate(i32::MIN).for_white(Color::Black), Score::Mate(i32::MAX));
        assert!(Score::Mate(i32::MIN) < Score::Centipawns(i32::MIN));
        assert_eq!(Score::Centipawns(i32::MIN).to_string(), "-21474836.48");
    }

    #[test]
    fn bar_is_centered_and_saturates() {
        assert!((Score::Centipawns(0).bar_fraction() - 0.5).abs() < 1e-6);
        assert!(Score::Centipawns(300).bar_fraction() > 0.7);
        assert_eq!(Score::Mate(4).bar_fraction(), 1.0);
        assert_eq!(Score::Mate(-4).bar_fraction(), 0.0);
    }
}
