//! Practice session - the consumer surface over the progress engine
//!
//! One `PracticeSession` is live per signed-in user. It wires emergency
//! recovery into construction, owns the background auto-save task, and
//! exposes a pull-based snapshot for UIs that poll instead of subscribing.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SaveSettings;
use crate::progress::{LevelCurve, LevelUp, ProgressError, XpProgress, XpProgressManager};
use crate::scoring::{QuizResult, QuizXpAward, UserStats, calculate_quiz_xp};
use crate::store::{RemoteProgressStore, SnapshotStore};

/// XP-earning actions with a fixed award, funneled through the session.
#[derive(Debug, Clone)]
pub enum XpAction {
    /// Signing in, at most once per local day.
    DailyLogin,
    /// Solving a single practice problem.
    ProblemSolved { topic: String, level: u8 },
}

impl XpAction {
    pub fn source_tag(&self) -> String {
        match self {
            Self::DailyLogin => "daily_login".to_string(),
            Self::ProblemSolved { topic, level } => format!("{topic} Problem (Level {level})"),
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Self::DailyLogin => 10,
            // Problems scale linearly with their difficulty level.
            Self::ProblemSolved { level, .. } => 10 + 5 * level.saturating_sub(1) as u64,
        }
    }
}

/// Point-in-time view for UI polling.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub progress: Option<XpProgress>,
    pub unsaved_xp: u64,
    /// Percentage towards the next level, [0, 100].
    pub level_progress: f64,
    pub online: bool,
}

pub struct PracticeSession {
    manager: Arc<XpProgressManager>,
    save: SaveSettings,
    autosave: Option<JoinHandle<()>>,
}

impl PracticeSession {
    /// Start a session for `user_id`: reconcile any emergency snapshot left
    /// by an interrupted session (installing its pending gains without
    /// re-applying them), otherwise load the remote record, then spawn the
    /// auto-save task.
    pub async fn start(
        user_id: &str,
        remote: Arc<dyn RemoteProgressStore>,
        snapshots: Arc<dyn SnapshotStore>,
        curve: LevelCurve,
        save: SaveSettings,
    ) -> Result<Self, ProgressError> {
        if user_id.trim().is_empty() {
            return Err(ProgressError::Auth);
        }

        let recovered = XpProgressManager::recover_emergency_data(snapshots.as_ref(), user_id)
            .unwrap_or_else(|e| {
                warn!(error = %e, "emergency recovery failed, starting clean");
                None
            });

        let manager = match recovered {
            Some(snapshot) => {
                info!(
                    pending_xp = snapshot.pending_total(),
                    "recovered interrupted session"
                );
                let manager = XpProgressManager::with_recovered(
                    user_id,
                    remote,
                    snapshots,
                    curve,
                    snapshot.progress,
                );
                manager.set_pending_gains(snapshot.pending_gains);
                let manager = Arc::new(manager);
                // Make the rescue durable right away when the network allows.
                // Recovery already consumed the local snapshot, so a failed
                // flush must put it back or the XP exists only in memory.
                if let Err(e) = manager.save_pending_xp().await {
                    warn!(error = %e, "recovered XP not flushed yet, keeping local rescue");
                    manager.emergency_local_save();
                }
                manager
            }
            None => {
                let manager =
                    Arc::new(XpProgressManager::new(user_id, remote, snapshots, curve));
                manager.load_progress().await?;
                manager
            }
        };

        let autosave = Self::spawn_autosave(manager.clone(), &save);
        Ok(Self {
            manager,
            save,
            autosave: Some(autosave),
        })
    }

    fn spawn_autosave(manager: Arc<XpProgressManager>, save: &SaveSettings) -> JoinHandle<()> {
        let threshold = save.auto_save_threshold;
        let interval = Duration::from_secs(save.auto_save_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if manager.is_online() && manager.get_pending_xp() >= threshold {
                    if let Err(e) = manager.save_pending_xp().await {
                        debug!(error = %e, "auto-save failed, keeping XP pending");
                    }
                }
            }
        })
    }

    pub fn manager(&self) -> &Arc<XpProgressManager> {
        &self.manager
    }

    /// Award a fixed-amount action. The daily login bonus is granted at
    /// most once per local day and keeps the streak counter current.
    pub fn award_action(&self, action: XpAction) -> Result<Option<LevelUp>, ProgressError> {
        if let XpAction::DailyLogin = action {
            let already_today = self
                .manager
                .get_current_progress()
                .and_then(|p| p.last_activity_day())
                .is_some_and(|d| d == chrono::Local::now().date_naive());
            self.manager.update_streak(true)?;
            if already_today {
                return Ok(None);
            }
        }
        let result = self.manager.add_xp(action.amount(), &action.source_tag())?;
        self.maybe_autosave();
        Ok(result)
    }

    /// Award an arbitrary amount under a free-form source tag.
    pub fn award_raw(&self, amount: u64, source: &str) -> Result<Option<LevelUp>, ProgressError> {
        let result = self.manager.add_xp(amount, source)?;
        self.maybe_autosave();
        Ok(result)
    }

    /// Score a finished quiz and apply the award in one step.
    pub fn award_quiz(
        &self,
        topic: &str,
        result: &QuizResult,
        stats: &UserStats,
    ) -> Result<(QuizXpAward, Option<LevelUp>), ProgressError> {
        let award = calculate_quiz_xp(result, stats);
        let source = format!("{topic} Quiz ({})", result.difficulty.label());
        let level_up = self.manager.add_xp(award.total_xp, &source)?;
        self.maybe_autosave();
        Ok((award, level_up))
    }

    /// Kick off a background flush once enough XP is pending. Errors are
    /// retried by the periodic task.
    fn maybe_autosave(&self) {
        if self.manager.is_online()
            && self.manager.get_pending_xp() >= self.save.auto_save_threshold
        {
            let manager = self.manager.clone();
            tokio::spawn(async move {
                if let Err(e) = manager.save_pending_xp().await {
                    debug!(error = %e, "threshold save failed, keeping XP pending");
                }
            });
        }
    }

    /// Pull-based refresh: the UI re-reads this on a timer and after every
    /// mutating call.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            progress: self.manager.get_current_progress(),
            unsaved_xp: self.manager.get_pending_xp(),
            level_progress: self.manager.get_level_progress(),
            online: self.manager.is_online(),
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.manager.has_unsaved_changes()
    }

    pub async fn force_save(&self) -> Result<(), ProgressError> {
        self.manager.force_save().await
    }

    /// Connectivity change from the host environment. Going online flushes
    /// any XP that piled up while offline.
    pub fn set_online(&self, online: bool) {
        self.manager.set_online_status(online);
        if online && self.manager.has_unsaved_changes() {
            let manager = self.manager.clone();
            tokio::spawn(async move {
                if let Err(e) = manager.save_pending_xp().await {
                    debug!(error = %e, "reconnect save failed, keeping XP pending");
                }
            });
        }
    }

    /// Synchronous rescue write; safe to call from teardown paths.
    pub fn emergency_local_save(&self) {
        self.manager.emergency_local_save();
    }

    /// Flush and tear down. The save is best-effort: sign-out proceeds even
    /// if it fails, with the XP preserved locally.
    pub async fn sign_out(mut self) {
        self.shutdown();
        self.manager.prepare_for_sign_out().await;
    }

    /// Stop the background auto-save task.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.autosave.take() {
            handle.abort();
        }
    }
}

impl Drop for PracticeSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
