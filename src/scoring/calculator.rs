//! Pure quiz scoring
//!
//! `calculate_quiz_xp` folds the rules table over one quiz result and the
//! user's day/history stats, producing the total XP plus a human-readable
//! breakdown of every contribution in the order it was computed.

use super::definitions::{
    AchievementXp, DailyXp, Difficulty, STREAK_MILESTONES, StudyXp, TIME_BONUSES,
    base_xp_for_percent,
};

/// One finished quiz.
#[derive(Debug, Clone)]
pub struct QuizResult {
    pub score: u32,
    pub max_score: u32,
    pub difficulty: Difficulty,
    pub time_spent_secs: u32,
    pub time_limit_secs: u32,
    /// Taken under full mock-contest conditions
    pub mock_contest: bool,
    pub reviewed_solutions: bool,
    pub analyzed_mistakes: bool,
    pub studied_concepts: bool,
}

impl QuizResult {
    pub fn score_percent(&self) -> f64 {
        if self.max_score == 0 {
            return 0.0;
        }
        self.score as f64 / self.max_score as f64 * 100.0
    }
}

/// The user's history and today's activity, as known before this quiz.
///
/// `quizzes_today` counts quizzes finished earlier today (so zero means this
/// is the first); `topics_today` counts distinct topics including this
/// quiz's topic.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub has_perfect_score: bool,
    pub best_percent: Option<f64>,
    pub last_percent: Option<f64>,
    pub quizzes_today: u32,
    pub topics_today: u32,
    pub streak_days: u32,
    pub is_weekend: bool,
}

/// One named bonus contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpBonus {
    pub label: String,
    pub amount: u64,
}

/// Full scoring output, including the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizXpAward {
    /// Base XP before the difficulty multiplier
    pub base_xp: u64,
    pub multiplier: f64,
    pub bonuses: Vec<XpBonus>,
    pub total_xp: u64,
    pub breakdown: Vec<String>,
}

/// Score one quiz. Pure and deterministic: identical inputs always yield an
/// identical award.
pub fn calculate_quiz_xp(result: &QuizResult, stats: &UserStats) -> QuizXpAward {
    let mut bonuses = Vec::new();
    let mut breakdown = Vec::new();

    let percent = result.score_percent();
    let base_xp = base_xp_for_percent(percent);
    breakdown.push(format!("Base XP: {base_xp} ({percent:.0}% score)"));

    let multiplier = result.difficulty.multiplier();
    let multiplied = (base_xp as f64 * multiplier).floor() as u64;
    breakdown.push(format!(
        "{} multiplier x{multiplier:.1}: {multiplied}",
        result.difficulty.label()
    ));

    let mut push_bonus = |label: &str, amount: u64, breakdown: &mut Vec<String>| {
        breakdown.push(format!("{label}: +{amount}"));
        bonuses.push(XpBonus {
            label: label.to_string(),
            amount,
        });
    };

    // Time bonus: first tier the ratio fits, or none.
    if result.time_limit_secs > 0 {
        let ratio = result.time_spent_secs as f64 / result.time_limit_secs as f64;
        if let Some((_, xp, label)) = TIME_BONUSES.iter().find(|(max, _, _)| ratio <= *max) {
            push_bonus(label, *xp, &mut breakdown);
        }
    }

    // Achievement bonuses, all independently additive.
    if percent >= 100.0 && !stats.has_perfect_score {
        push_bonus(
            "First Perfect Score",
            AchievementXp::FIRST_PERFECT_SCORE,
            &mut breakdown,
        );
    }
    if stats.best_percent.is_some_and(|best| percent > best) {
        push_bonus("Personal Best", AchievementXp::PERSONAL_BEST, &mut breakdown);
    }
    if stats
        .last_percent
        .is_some_and(|last| percent - last >= AchievementXp::IMPROVEMENT_MARGIN)
    {
        push_bonus(
            "Big Improvement",
            AchievementXp::BIG_IMPROVEMENT,
            &mut breakdown,
        );
    }
    if result.mock_contest {
        push_bonus("Mock Contest", AchievementXp::MOCK_CONTEST, &mut breakdown);
    }

    // Daily and streak bonuses.
    if stats.quizzes_today == 0 {
        push_bonus(
            "First Quiz of the Day",
            DailyXp::FIRST_QUIZ_TODAY,
            &mut breakdown,
        );
    }
    if stats.is_weekend {
        push_bonus(
            "Weekend Practice",
            DailyXp::WEEKEND_PRACTICE,
            &mut breakdown,
        );
    }
    // Single highest streak tier reached, never stacked.
    if let Some((_, xp, label)) = STREAK_MILESTONES
        .iter()
        .find(|(min_days, _, _)| stats.streak_days >= *min_days)
    {
        push_bonus(label, *xp, &mut breakdown);
    }
    if stats.quizzes_today + 1 >= DailyXp::MARATHON_QUIZZES {
        push_bonus("Quiz Marathon", DailyXp::QUIZ_MARATHON, &mut breakdown);
    }
    if stats.topics_today >= DailyXp::EXPLORER_TOPICS {
        push_bonus(
            "Knowledge Explorer",
            DailyXp::KNOWLEDGE_EXPLORER,
            &mut breakdown,
        );
    }

    // Study bonuses, independent flags.
    if result.reviewed_solutions {
        push_bonus("Solution Review", StudyXp::SOLUTION_REVIEW, &mut breakdown);
    }
    if result.analyzed_mistakes {
        push_bonus("Mistake Analysis", StudyXp::MISTAKE_ANALYSIS, &mut breakdown);
    }
    if result.studied_concepts {
        push_bonus("Concept Study", StudyXp::CONCEPT_STUDY, &mut breakdown);
    }

    let total_xp = multiplied + bonuses.iter().map(|b| b.amount).sum::<u64>();
    breakdown.push(format!("Total: {total_xp} XP"));

    QuizXpAward {
        base_xp,
        multiplier,
        bonuses,
        total_xp,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_result() -> QuizResult {
        QuizResult {
            score: 10,
            max_score: 20,
            difficulty: Difficulty::Amc8,
            time_spent_secs: 1200,
            time_limit_secs: 1200,
            mock_contest: false,
            reviewed_solutions: false,
            analyzed_mistakes: false,
            studied_concepts: false,
        }
    }

    fn no_flags_stats() -> UserStats {
        UserStats {
            has_perfect_score: true, // perfect already earned, no first-perfect bonus
            best_percent: Some(100.0),
            last_percent: None,
            quizzes_today: 1, // not the first quiz of the day
            topics_today: 1,
            streak_days: 0,
            is_weekend: false,
        }
    }

    #[test]
    fn test_perfect_amc10_lightning_fast_totals_95() {
        // 20/20 on AMC 10 in 500s of 1200s: base 50 * 1.5 = 75, +20 time.
        let result = QuizResult {
            score: 20,
            max_score: 20,
            difficulty: Difficulty::Amc10,
            time_spent_secs: 500,
            time_limit_secs: 1200,
            ..plain_result()
        };
        let award = calculate_quiz_xp(&result, &no_flags_stats());
        assert_eq!(award.base_xp, 50);
        assert_eq!(award.multiplier, 1.5);
        assert_eq!(award.total_xp, 95);
        assert_eq!(award.bonuses.len(), 1);
        assert_eq!(award.bonuses[0].label, "Lightning Fast");
    }

    #[test]
    fn test_multiplied_base_is_floored() {
        // 5% on AMC 10: base 5 * 1.5 = 7.5, floored to 7.
        let result = QuizResult {
            score: 1,
            max_score: 20,
            difficulty: Difficulty::Amc10,
            time_spent_secs: 1200,
            time_limit_secs: 1200,
            ..plain_result()
        };
        let award = calculate_quiz_xp(&result, &no_flags_stats());
        assert_eq!(award.total_xp, 7);
    }

    #[test]
    fn test_time_bonus_tiers_are_exclusive() {
        let stats = no_flags_stats();
        for (spent, expected_label) in [
            (600, Some("Lightning Fast")),   // ratio 0.5
            (840, Some("Very Quick")),       // ratio 0.7
            (1020, Some("Quick Completion")), // ratio 0.85
            (1100, None),
        ] {
            let result = QuizResult {
                time_spent_secs: spent,
                time_limit_secs: 1200,
                ..plain_result()
            };
            let award = calculate_quiz_xp(&result, &stats);
            let labels: Vec<&str> = award.bonuses.iter().map(|b| b.label.as_str()).collect();
            match expected_label {
                Some(label) => assert_eq!(labels, vec![label]),
                None => assert!(labels.is_empty()),
            }
        }
    }

    #[test]
    fn test_streak_tier_exclusivity_at_thirty_days() {
        let stats = UserStats {
            streak_days: 30,
            ..no_flags_stats()
        };
        let result = QuizResult {
            time_spent_secs: 1200,
            ..plain_result()
        };
        let award = calculate_quiz_xp(&result, &stats);
        let streak_bonuses: Vec<&XpBonus> = award
            .bonuses
            .iter()
            .filter(|b| {
                STREAK_MILESTONES
                    .iter()
                    .any(|(_, _, label)| *label == b.label)
            })
            .collect();
        assert_eq!(streak_bonuses.len(), 1);
        assert_eq!(streak_bonuses[0].label, "Dedication Master");
        assert_eq!(streak_bonuses[0].amount, 200);
    }

    #[test]
    fn test_achievement_bonuses_stack() {
        let result = QuizResult {
            score: 20,
            max_score: 20,
            mock_contest: true,
            ..plain_result()
        };
        let stats = UserStats {
            has_perfect_score: false,
            best_percent: Some(80.0),
            last_percent: Some(60.0),
            ..no_flags_stats()
        };
        let award = calculate_quiz_xp(&result, &stats);
        let labels: Vec<&str> = award.bonuses.iter().map(|b| b.label.as_str()).collect();
        assert!(labels.contains(&"First Perfect Score"));
        assert!(labels.contains(&"Personal Best"));
        assert!(labels.contains(&"Big Improvement"));
        assert!(labels.contains(&"Mock Contest"));
    }

    #[test]
    fn test_marathon_and_explorer_thresholds() {
        let stats = UserStats {
            quizzes_today: 4, // this is the fifth quiz
            topics_today: 3,
            ..no_flags_stats()
        };
        let award = calculate_quiz_xp(&plain_result(), &stats);
        let labels: Vec<&str> = award.bonuses.iter().map(|b| b.label.as_str()).collect();
        assert!(labels.contains(&"Quiz Marathon"));
        assert!(labels.contains(&"Knowledge Explorer"));
    }

    #[test]
    fn test_study_bonuses_are_independent() {
        let result = QuizResult {
            reviewed_solutions: true,
            analyzed_mistakes: true,
            studied_concepts: true,
            ..plain_result()
        };
        let baseline = calculate_quiz_xp(&plain_result(), &no_flags_stats());
        let studied = calculate_quiz_xp(&result, &no_flags_stats());
        assert_eq!(studied.total_xp, baseline.total_xp + 15 + 20 + 10);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let result = QuizResult {
            score: 17,
            max_score: 20,
            difficulty: Difficulty::Amc12,
            time_spent_secs: 700,
            mock_contest: true,
            ..plain_result()
        };
        let stats = UserStats {
            streak_days: 8,
            is_weekend: true,
            quizzes_today: 0,
            ..no_flags_stats()
        };
        let a = calculate_quiz_xp(&result, &stats);
        let b = calculate_quiz_xp(&result, &stats);
        assert_eq!(a, b);
        assert_eq!(a.breakdown, b.breakdown);
    }

    #[test]
    fn test_breakdown_records_every_contribution() {
        let result = QuizResult {
            score: 20,
            max_score: 20,
            time_spent_secs: 500,
            ..plain_result()
        };
        let stats = UserStats {
            quizzes_today: 0,
            ..no_flags_stats()
        };
        let award = calculate_quiz_xp(&result, &stats);
        // Base line + multiplier line + one line per bonus + total line.
        assert_eq!(award.breakdown.len(), 2 + award.bonuses.len() + 1);
        assert!(award.breakdown.last().unwrap().starts_with("Total:"));
    }

    #[test]
    fn test_zero_time_limit_awards_no_time_bonus() {
        let result = QuizResult {
            time_limit_secs: 0,
            time_spent_secs: 0,
            ..plain_result()
        };
        let award = calculate_quiz_xp(&result, &no_flags_stats());
        assert!(award.bonuses.is_empty());
    }
}
