use shared::LevelProgress;

/// The XP curve: level 1 starts at 0 XP and reaching level `L` (L >= 2)
/// costs `step * L` more XP than reaching `L - 1`. With the default step of
/// 100 the thresholds are 0, 200, 500, 900, 1400, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCurve {
    step: i64,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            step: Self::DEFAULT_STEP,
        }
    }
}

impl LevelCurve {
    pub const DEFAULT_STEP: i64 = 100;
    pub const MAX_STEP: i64 = 1_000_000;
    /// Highest reachable level. Together with `MAX_STEP` this keeps every
    /// threshold well inside `i64`.
    pub const MAX_LEVEL: i32 = 1_000_000;

    /// Returns `None` unless `step` is in `1..=MAX_STEP`.
    pub fn new(step: i64) -> Option<Self> {
        (1..=Self::MAX_STEP)
            .contains(&step)
            .then_some(Self { step })
    }

    /// Cumulative XP required to reach `level`. Levels past the cap cost the
    /// same as the level just above it.
    pub fn threshold(&self, level: i32) -> i64 {
        if level <= 1 {
            return 0;
        }
        let l = level.min(Self::MAX_LEVEL + 1) as i64;
        // step * (2 + 3 + ... + L)
        self.step * (l * (l + 1) / 2 - 1)
    }

    /// Maps cumulative XP to a level. Negative totals are treated as 0, and
    /// a total of exactly `threshold(L)` is level `L`.
    pub fn level_for(&self, total_xp: i64) -> LevelProgress {
        let total = total_xp.max(0);

        // Invert threshold(L) <= total for a starting point, then settle
        // on the exact level to absorb floating point error.
        let estimate =
            (((8.0 * (total as f64 / self.step as f64 + 1.0) + 1.0).sqrt() - 1.0) / 2.0).floor();
        let mut level = (estimate as i64).clamp(1, Self::MAX_LEVEL as i64) as i32;
        while level > 1 && self.threshold(level) > total {
            level -= 1;
        }
        while level < Self::MAX_LEVEL && self.threshold(level + 1) <= total {
            level += 1;
        }

        let xp_for_current_level = self.threshold(level);
        let xp_for_next_level = self.threshold(level + 1);

        LevelProgress {
            level,
            xp_for_current_level,
            xp_for_next_level,
            xp_into_level: total - xp_for_current_level,
            xp_to_next_level: (xp_for_next_level - total).max(0),
        }
    }
}
