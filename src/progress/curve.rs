//! Leveling curve
//!
//! XP required to go from level L to L+1 follows a geometric progression
//! `floor(base * growth^(L-1))`. Level and in-level remainder are always
//! re-derived from `total_xp`, so applying one large gain and applying the
//! same XP as many small gains land on the same level.

/// Safety cap on level derivation. The geometric requirement makes levels
/// this high unreachable with u64 totals anyway.
const MAX_LEVEL: u32 = 500;

/// Geometric leveling curve. The constants are configurable rather than
/// baked in; production data may tune them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCurve {
    base_xp: u32,
    growth: f64,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            base_xp: 100,
            growth: 1.2,
        }
    }
}

impl LevelCurve {
    /// Build a curve. `base_xp` must be at least 1 and `growth` above 1.0;
    /// out-of-range values fall back to the defaults.
    pub fn new(base_xp: u32, growth: f64) -> Self {
        if base_xp == 0 || !growth.is_finite() || growth <= 1.0 {
            return Self::default();
        }
        Self { base_xp, growth }
    }

    /// XP required to advance from `level` to `level + 1`.
    pub fn required_for_level(&self, level: u32) -> u64 {
        let level = level.clamp(1, MAX_LEVEL);
        (self.base_xp as f64 * self.growth.powi(level as i32 - 1)).floor() as u64
    }

    /// Derive `(current_level, xp_towards_next)` from a lifetime XP total,
    /// cascading through as many level boundaries as the total covers.
    pub fn locate(&self, total_xp: u64) -> (u32, u64) {
        let mut level = 1u32;
        let mut remainder = total_xp;
        while level < MAX_LEVEL {
            let needed = self.required_for_level(level);
            if remainder < needed {
                break;
            }
            remainder -= needed;
            level += 1;
        }
        (level, remainder)
    }

    /// Progress towards the next level as a percentage in [0, 100].
    pub fn progress_percent(&self, level: u32, xp_towards_next: u64) -> f64 {
        let needed = self.required_for_level(level);
        if needed == 0 {
            return 100.0;
        }
        (xp_towards_next as f64 / needed as f64 * 100.0).clamp(0.0, 100.0)
    }
}
