//! Progress data model
//!
//! `XpProgress` maps one-to-one onto the remote progress row; the other
//! types are transient state that only ever touches the local snapshot store.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user's persistent progress record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpProgress {
    pub current_level: u32,
    pub total_xp: u64,
    /// XP accumulated since the last level-up. Always below the requirement
    /// for the next level except inside a not-yet-reconciled pending window.
    pub xp_towards_next: u64,
    pub streak_days: u32,
    /// Resets at the local-day boundary.
    pub daily_xp_earned: u64,
    pub last_xp_earned: Option<DateTime<Utc>>,
}

impl Default for XpProgress {
    fn default() -> Self {
        Self {
            current_level: 1,
            total_xp: 0,
            xp_towards_next: 0,
            streak_days: 0,
            daily_xp_earned: 0,
            last_xp_earned: None,
        }
    }
}

impl XpProgress {
    /// Local calendar day of the last recorded XP activity.
    pub fn last_activity_day(&self) -> Option<NaiveDate> {
        self.last_xp_earned
            .map(|t| t.with_timezone(&Local).date_naive())
    }
}

/// An XP gain applied in memory but not yet confirmed saved remotely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingGain {
    pub id: Uuid,
    pub amount: u64,
    /// Free-form tag, e.g. `"daily_login"` or `"Geometry Problem (Level 3)"`.
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl PendingGain {
    pub fn new(amount: u64, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            source: source.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Locally persisted rescue state written when a session may terminate with
/// unsaved XP. `progress` already includes every gain in `pending_gains`;
/// recovery must install the gains via
/// [`super::XpProgressManager::set_pending_gains`], never re-apply them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencySnapshot {
    pub progress: XpProgress,
    pub pending_gains: Vec<PendingGain>,
    pub saved_at: DateTime<Utc>,
}

impl EmergencySnapshot {
    pub fn pending_total(&self) -> u64 {
        self.pending_gains.iter().map(|g| g.amount).sum()
    }
}

/// A level boundary crossed by a single XP award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
}
