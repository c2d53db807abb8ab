//! Quiz scoring rules
//!
//! Static XP rules table plus the pure scoring function. Nothing in here
//! touches a clock or a store; day-dependent facts (weekend, quizzes taken
//! today) arrive pre-computed in [`UserStats`] so the same inputs always
//! produce the same award.

mod calculator;
mod definitions;

pub use calculator::{QuizResult, QuizXpAward, UserStats, XpBonus, calculate_quiz_xp};
pub use definitions::{
    AchievementXp, DailyXp, Difficulty, STREAK_MILESTONES, StudyXp, TIME_BONUSES,
    base_xp_for_percent,
};
