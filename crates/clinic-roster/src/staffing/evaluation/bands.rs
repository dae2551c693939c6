/// Lowest weekly score still counting as adequate performance.
pub const ADEQUATE_MIN: i64 = 50;

/// Weekly-score band, mapped to an excellence point delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Outstanding,
    Excellent,
    Great,
    Good,
    Fair,
    Adequate,
    Inadequate,
}

impl ScoreBand {
    pub fn for_score(score: i64) -> Self {
        match score {
            s if s >= 400 => ScoreBand::Outstanding,
            s if s >= 350 => ScoreBand::Excellent,
            s if s >= 300 => ScoreBand::Great,
            s if s >= 200 => ScoreBand::Good,
            s if s >= 100 => ScoreBand::Fair,
            s if s >= ADEQUATE_MIN => ScoreBand::Adequate,
            _ => ScoreBand::Inadequate,
        }
    }

    pub const fn point_delta(self) -> u8 {
        match self {
            ScoreBand::Outstanding => 5,
            ScoreBand::Excellent => 4,
            ScoreBand::Great => 3,
            ScoreBand::Good => 2,
            ScoreBand::Fair => 1,
            ScoreBand::Adequate | ScoreBand::Inadequate => 0,
        }
    }

    /// Adequate performance includes the zero-point band at 50..=99.
    pub const fn is_adequate(self) -> bool {
        !matches!(self, ScoreBand::Inadequate)
    }
}

/// Advance the streak counters for one cycle. Any adequate band increments
/// the minimum streak; two consecutive adequate cycles forgive the whole
/// accumulated bad streak. An inadequate cycle increments the bad streak.
pub fn apply_streaks(band: ScoreBand, bad_streak: u32, minimum_streak: u32) -> (u32, u32) {
    if band.is_adequate() {
        let minimum = minimum_streak + 1;
        if minimum >= 2 {
            (0, 0)
        } else {
            (bad_streak, minimum)
        }
    } else {
        (bad_streak + 1, minimum_streak)
    }
}
