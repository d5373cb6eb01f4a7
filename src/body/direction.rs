//! The twelve headings a being can take, each with its own movement gene.

use serde::{Deserialize, Serialize};

/// Compass of a being relative to its own forward and right axes.
///
/// Each direction is named by three letters out of Forward, Back, Left and
/// Right; its heading is the normalised letter count.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Direction {
    Fff,
    Ffr,
    Frr,
    Rrr,
    Brr,
    Bbr,
    Bbb,
    Bbl,
    Bll,
    Lll,
    Fll,
    Ffl,
}

impl Direction {
    pub const ALL: [Direction; 12] = [
        Direction::Fff,
        Direction::Ffr,
        Direction::Frr,
        Direction::Rrr,
        Direction::Brr,
        Direction::Bbr,
        Direction::Bbb,
        Direction::Bbl,
        Direction::Bll,
        Direction::Lll,
        Direction::Fll,
        Direction::Ffl,
    ];

    /// Three-letter code, as used in gene names.
    pub fn code(self) -> &'static str {
        match self {
            Direction::Fff => "FFF",
            Direction::Ffr => "FFR",
            Direction::Frr => "FRR",
            Direction::Rrr => "RRR",
            Direction::Brr => "BRR",
            Direction::Bbr => "BBR",
            Direction::Bbb => "BBB",
            Direction::Bbl => "BBL",
            Direction::Bll => "BLL",
            Direction::Lll => "LLL",
            Direction::Fll => "FLL",
            Direction::Ffl => "FFL",
        }
    }

    pub fn from_code(code: &str) -> Option<Direction> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    /// Unit heading as (forwardness, rightness).
    pub fn heading(self) -> (f64, f64) {
        let (forward, right) = self.code().chars().fold((0i32, 0i32), |(f, r), c| match c {
            'F' => (f + 1, r),
            'B' => (f - 1, r),
            'R' => (f, r + 1),
            'L' => (f, r - 1),
            _ => (f, r),
        });
        let size = f64::from(forward).hypot(f64::from(right));
        (f64::from(forward) / size, f64::from(right) / size)
    }

    /// Cosine between this heading and an arbitrary one.
    pub fn dot(self, forwardness: f64, rightness: f64) -> f64 {
        let size = forwardness.hypot(rightness);
        if size == 0.0 {
            return 0.0;
        }
        let (f, r) = self.heading();
        f * forwardness / size + r * rightness / size
    }

    /// Direction best aligned with the heading, if any has a positive dot.
    pub fn closest(forwardness: f64, rightness: f64) -> Option<Direction> {
        let mut best = 0.0;
        let mut closest = None;
        for direction in Self::ALL {
            let dot = direction.dot(forwardness, rightness);
            if dot > best {
                best = dot;
                closest = Some(direction);
            }
        }
        closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_are_unit() {
        for direction in Direction::ALL {
            let (f, r) = direction.heading();
            assert!((f.hypot(r) - 1.0).abs() < 1e-12, "{direction:?}");
        }
        assert_eq!(Direction::Fff.heading(), (1.0, 0.0));
        assert_eq!(Direction::Lll.heading(), (0.0, -1.0));
    }

    #[test]
    fn test_closest() {
        assert_eq!(Direction::closest(1.0, 0.0), Some(Direction::Fff));
        assert_eq!(Direction::closest(-1.0, 0.05), Some(Direction::Bbb));
        assert_eq!(Direction::closest(1.0, 1.0), Some(Direction::Ffr));
        assert_eq!(Direction::closest(0.0, 0.0), None);
    }

    #[test]
    fn test_codes_round_trip() {
        for direction in Direction::ALL {
            assert_eq!(Direction::from_code(direction.code()), Some(direction));
        }
        assert_eq!(Direction::from_code("XYZ"), None);
    }
}
