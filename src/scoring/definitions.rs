//! XP rules table
//!
//! Defines base XP tiers, difficulty multipliers, and every bonus the
//! scorer can award.

/// Quiz difficulty, ordered by competition tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Amc8,
    Amc10,
    Amc12,
    Aime,
}

impl Difficulty {
    /// XP multiplier applied to the base award.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Amc8 => 1.0,
            Self::Amc10 => 1.5,
            Self::Amc12 => 2.0,
            Self::Aime => 3.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amc8 => "amc8",
            Self::Amc10 => "amc10",
            Self::Amc12 => "amc12",
            Self::Aime => "aime",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "amc8" => Some(Self::Amc8),
            "amc10" => Some(Self::Amc10),
            "amc12" => Some(Self::Amc12),
            "aime" => Some(Self::Aime),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Amc8 => "AMC 8",
            Self::Amc10 => "AMC 10",
            Self::Amc12 => "AMC 12",
            Self::Aime => "AIME",
        }
    }
}

/// Base XP by score percentage.
pub fn base_xp_for_percent(percent: f64) -> u64 {
    if percent >= 100.0 {
        50
    } else if percent >= 90.0 {
        40
    } else if percent >= 80.0 {
        30
    } else if percent >= 70.0 {
        20
    } else if percent >= 60.0 {
        10
    } else {
        5
    }
}

/// Time bonus tiers: `(max ratio of time spent to limit, XP, label)`.
/// Mutually exclusive; the first tier the ratio fits wins.
pub static TIME_BONUSES: &[(f64, u64, &str)] = &[
    (0.5, 20, "Lightning Fast"),
    (0.7, 15, "Very Quick"),
    (0.85, 10, "Quick Completion"),
];

/// Streak milestone tiers: `(min streak days, XP, label)`, highest first.
/// A single scoring call awards only the highest tier reached.
pub static STREAK_MILESTONES: &[(u32, u64, &str)] = &[
    (30, 200, "Dedication Master"),
    (7, 50, "Week Warrior"),
    (3, 15, "Consistency Streak"),
];

/// Achievement bonuses, all independently additive.
pub struct AchievementXp;

impl AchievementXp {
    /// First-ever perfect score
    pub const FIRST_PERFECT_SCORE: u64 = 25;

    /// New personal best percentage
    pub const PERSONAL_BEST: u64 = 25;

    /// Improvement of at least [`Self::IMPROVEMENT_MARGIN`] points over the
    /// last attempt
    pub const BIG_IMPROVEMENT: u64 = 30;
    pub const IMPROVEMENT_MARGIN: f64 = 20.0;

    /// Quiz taken as a full mock contest
    pub const MOCK_CONTEST: u64 = 75;
}

/// Daily activity bonuses.
pub struct DailyXp;

impl DailyXp {
    /// First quiz of the local day
    pub const FIRST_QUIZ_TODAY: u64 = 10;

    /// Practicing on a weekend
    pub const WEEKEND_PRACTICE: u64 = 10;

    /// Fifth (or later) quiz of the day
    pub const QUIZ_MARATHON: u64 = 30;
    pub const MARATHON_QUIZZES: u32 = 5;

    /// Three or more distinct topics practiced today
    pub const KNOWLEDGE_EXPLORER: u64 = 20;
    pub const EXPLORER_TOPICS: u32 = 3;
}

/// Study-habit bonuses, additive and independent.
pub struct StudyXp;

impl StudyXp {
    pub const SOLUTION_REVIEW: u64 = 15;
    pub const MISTAKE_ANALYSIS: u64 = 20;
    pub const CONCEPT_STUDY: u64 = 10;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_xp_tiers() {
        assert_eq!(base_xp_for_percent(100.0), 50);
        assert_eq!(base_xp_for_percent(99.9), 40);
        assert_eq!(base_xp_for_percent(90.0), 40);
        assert_eq!(base_xp_for_percent(80.0), 30);
        assert_eq!(base_xp_for_percent(70.0), 20);
        assert_eq!(base_xp_for_percent(60.0), 10);
        assert_eq!(base_xp_for_percent(59.9), 5);
        assert_eq!(base_xp_for_percent(0.0), 5);
    }

    #[test]
    fn test_difficulty_multipliers() {
        assert_eq!(Difficulty::Amc8.multiplier(), 1.0);
        assert_eq!(Difficulty::Amc10.multiplier(), 1.5);
        assert_eq!(Difficulty::Amc12.multiplier(), 2.0);
        assert_eq!(Difficulty::Aime.multiplier(), 3.0);
    }

    #[test]
    fn test_difficulty_round_trip() {
        for d in [
            Difficulty::Amc8,
            Difficulty::Amc10,
            Difficulty::Amc12,
            Difficulty::Aime,
        ] {
            assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
        }
        assert_eq!(Difficulty::from_str("amc99"), None);
    }

    #[test]
    fn test_streak_milestones_sorted_highest_first() {
        let mins: Vec<u32> = STREAK_MILESTONES.iter().map(|(m, _, _)| *m).collect();
        let mut sorted = mins.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(mins, sorted);
    }
}
