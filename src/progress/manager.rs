//! XP progress manager - core progression and durability logic
//!
//! Single authoritative in-memory holder of one user's progress. Gains are
//! applied optimistically and buffered as pending gains; flushes to the
//! remote store are serialized so overlapping save requests can never write
//! overlapping buffers. A synchronous emergency snapshot path covers abrupt
//! session ends.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::{Local, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::curve::LevelCurve;
use super::model::{EmergencySnapshot, LevelUp, PendingGain, XpProgress};
use crate::store::{RemoteProgressStore, SnapshotStore, StoreError};

/// Typed failures surfaced to the session layer.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("no signed-in user for progress operations")]
    Auth,

    #[error("progress not loaded yet")]
    NotLoaded,

    /// Remote save/load failed. The pending buffer is untouched and the
    /// operation may be retried later.
    #[error("remote persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

struct ManagerState {
    progress: Option<XpProgress>,
    pending: Vec<PendingGain>,
    /// Local day the streak was last brought up to date, so repeated
    /// same-day updates cannot extend it twice.
    streak_counted_on: Option<chrono::NaiveDate>,
}

/// One instance is live per authenticated user session; switching users
/// tears the old one down and constructs a new one.
pub struct XpProgressManager {
    user_id: String,
    curve: LevelCurve,
    remote: Arc<dyn RemoteProgressStore>,
    snapshots: Arc<dyn SnapshotStore>,
    state: Mutex<ManagerState>,
    /// Serializes flushes. A save queued behind an in-flight one re-reads
    /// the buffer afterwards and usually finds it empty.
    save_lock: tokio::sync::Mutex<()>,
    online: AtomicBool,
}

impl XpProgressManager {
    /// New manager with no state; call [`Self::load_progress`] before
    /// awarding XP.
    pub fn new(
        user_id: impl Into<String>,
        remote: Arc<dyn RemoteProgressStore>,
        snapshots: Arc<dyn SnapshotStore>,
        curve: LevelCurve,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            curve,
            remote,
            snapshots,
            state: Mutex::new(ManagerState {
                progress: None,
                pending: Vec::new(),
                streak_counted_on: None,
            }),
            save_lock: tokio::sync::Mutex::new(()),
            online: AtomicBool::new(true),
        }
    }

    /// Emergency-recovery constructor: adopt rescued progress as current
    /// state. The rescued pending gains, if any, must be installed with
    /// [`Self::set_pending_gains`] - `progress` already includes them.
    pub fn with_recovered(
        user_id: impl Into<String>,
        remote: Arc<dyn RemoteProgressStore>,
        snapshots: Arc<dyn SnapshotStore>,
        curve: LevelCurve,
        progress: XpProgress,
    ) -> Self {
        let manager = Self::new(user_id, remote, snapshots, curve);
        manager.lock_state().progress = Some(progress);
        manager
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ManagerState> {
        self.state.lock().expect("progress state lock poisoned")
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Fetch the remote record, or start from the level-1 default when none
    /// exists (the row is created by the first upsert). Level and remainder
    /// are re-derived from `total_xp` so a drifted row self-heals. Idempotent
    /// once loaded.
    pub async fn load_progress(&self) -> Result<XpProgress, ProgressError> {
        if let Some(progress) = self.lock_state().progress.clone() {
            return Ok(progress);
        }

        let mut progress = self.remote.fetch(&self.user_id).await?.unwrap_or_default();
        let (level, into) = self.curve.locate(progress.total_xp);
        progress.current_level = level;
        progress.xp_towards_next = into;

        let mut state = self.lock_state();
        // A concurrent load may have won; keep whatever landed first.
        if state.progress.is_none() {
            state.progress = Some(progress);
        }
        Ok(state.progress.clone().expect("progress just set"))
    }

    /// Apply an XP gain: update totals, re-derive the level (cascading
    /// through as many boundaries as the amount covers), roll the daily
    /// counter at the local-day boundary, and enqueue a pending gain for the
    /// next flush. Returns the crossed level boundary, if any.
    ///
    /// This is the single mutation entry point; every XP-earning action
    /// funnels through it. It never awaits, so rapid successive calls cannot
    /// interleave mid-update.
    pub fn add_xp(&self, amount: u64, source: &str) -> Result<Option<LevelUp>, ProgressError> {
        let mut state = self.lock_state();
        let progress = state.progress.as_mut().ok_or(ProgressError::NotLoaded)?;

        if amount == 0 {
            return Ok(None);
        }

        let now = Utc::now();
        let today = now.with_timezone(&Local).date_naive();
        if progress.last_activity_day() != Some(today) {
            progress.daily_xp_earned = 0;
        }

        let old_level = progress.current_level;
        progress.total_xp += amount;
        let (level, into) = self.curve.locate(progress.total_xp);
        progress.current_level = level;
        progress.xp_towards_next = into;
        progress.daily_xp_earned += amount;
        progress.last_xp_earned = Some(now);

        state.pending.push(PendingGain::new(amount, source));
        debug!(amount, source, level, "xp applied");

        if level > old_level {
            Ok(Some(LevelUp {
                old_level,
                new_level: level,
            }))
        } else {
            Ok(None)
        }
    }

    /// Read-only snapshot of the current progress, `None` until loaded.
    pub fn get_current_progress(&self) -> Option<XpProgress> {
        self.lock_state().progress.clone()
    }

    /// Percentage of the way to the next level, in [0, 100].
    pub fn get_level_progress(&self) -> f64 {
        let state = self.lock_state();
        match &state.progress {
            Some(p) => self
                .curve
                .progress_percent(p.current_level, p.xp_towards_next),
            None => 0.0,
        }
    }

    /// Sum of unflushed pending gains.
    pub fn get_pending_xp(&self) -> u64 {
        self.lock_state().pending.iter().map(|g| g.amount).sum()
    }

    pub fn pending_gains(&self) -> Vec<PendingGain> {
        self.lock_state().pending.clone()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.get_pending_xp() > 0
    }

    /// Bring the streak counter up to date for today. No-op when today is
    /// already counted, +1 when the last activity was exactly yesterday,
    /// otherwise a reset (to 1 if the user is active today, else 0).
    pub fn update_streak(&self, active_today: bool) -> Result<u32, ProgressError> {
        let mut state = self.lock_state();
        let today = Local::now().date_naive();
        if state.streak_counted_on == Some(today) {
            let progress = state.progress.as_ref().ok_or(ProgressError::NotLoaded)?;
            return Ok(progress.streak_days);
        }

        let progress = state.progress.as_mut().ok_or(ProgressError::NotLoaded)?;
        match progress.last_activity_day() {
            Some(day) if day == today => {}
            Some(day) if (today - day).num_days() == 1 => progress.streak_days += 1,
            _ => progress.streak_days = if active_today { 1 } else { 0 },
        }
        let streak = progress.streak_days;
        state.streak_counted_on = Some(today);
        Ok(streak)
    }

    /// Replace the pending buffer without touching `total_xp`. Recovery
    /// only: the rescued progress already includes these gains, so applying
    /// them through [`Self::add_xp`] would double-count.
    pub fn set_pending_gains(&self, gains: Vec<PendingGain>) {
        self.lock_state().pending = gains;
    }

    /// Flush the pending buffer to the remote store. On success exactly the
    /// flushed gains are removed (gains applied while the save was in
    /// flight stay pending); on failure the buffer is untouched and the
    /// call may simply be repeated.
    pub async fn save_pending_xp(&self) -> Result<(), ProgressError> {
        self.flush(true).await
    }

    /// Save regardless of whether any XP is pending, so streak updates and
    /// the like reach the remote store too. Used for explicit user- or
    /// lifecycle-triggered saves; completes before the caller proceeds.
    pub async fn force_save(&self) -> Result<(), ProgressError> {
        self.flush(false).await
    }

    async fn flush(&self, skip_if_clean: bool) -> Result<(), ProgressError> {
        let _guard = self.save_lock.lock().await;

        let (progress, flushed): (XpProgress, Vec<Uuid>) = {
            let state = self.lock_state();
            if skip_if_clean && state.pending.is_empty() {
                return Ok(());
            }
            let progress = state.progress.clone().ok_or(ProgressError::NotLoaded)?;
            (progress, state.pending.iter().map(|g| g.id).collect())
        };

        self.remote.upsert(&self.user_id, &progress).await?;

        let remaining = {
            let mut state = self.lock_state();
            state.pending.retain(|g| !flushed.contains(&g.id));
            state.pending.len()
        };
        debug!(flushed = flushed.len(), remaining, "pending xp saved");

        // Everything durable remotely: the rescue snapshot is stale now.
        if remaining == 0 {
            if let Err(e) = self.snapshots.clear(&self.user_id) {
                warn!(error = %e, "failed to clear emergency snapshot");
            }
        }
        Ok(())
    }

    /// Best-effort flush before sign-out. Never propagates an error - the
    /// caller signs out regardless - but falls back to an emergency
    /// snapshot so nothing is lost.
    pub async fn prepare_for_sign_out(&self) {
        if let Err(e) = self.force_save().await {
            warn!(error = %e, "sign-out save failed, writing emergency snapshot");
            self.emergency_local_save();
        }
    }

    /// Synchronous local rescue write for teardown paths where nothing can
    /// be awaited. Skips cleanly when there is nothing unsaved; swallows
    /// write errors (there is no one left to handle them).
    pub fn emergency_local_save(&self) {
        let snapshot = {
            let state = self.lock_state();
            let Some(progress) = state.progress.clone() else {
                return;
            };
            if state.pending.is_empty() {
                return;
            }
            EmergencySnapshot {
                progress,
                pending_gains: state.pending.clone(),
                saved_at: Utc::now(),
            }
        };

        match self.snapshots.write(&self.user_id, &snapshot) {
            Ok(()) => debug!(
                pending = snapshot.pending_gains.len(),
                "emergency snapshot written"
            ),
            Err(e) => warn!(error = %e, "emergency snapshot write failed"),
        }
    }

    /// Check the local store for a rescue snapshot belonging to `user_id`;
    /// returns and clears it if present. Pair with [`Self::with_recovered`]
    /// and [`Self::set_pending_gains`].
    pub fn recover_emergency_data(
        snapshots: &dyn SnapshotStore,
        user_id: &str,
    ) -> Result<Option<EmergencySnapshot>> {
        let Some(snapshot) = snapshots.read(user_id)? else {
            return Ok(None);
        };
        snapshots.clear(user_id)?;
        Ok(Some(snapshot))
    }

    /// Connectivity hint from the consumer. Does not trigger a save by
    /// itself; the session decides when to flush on reconnect.
    pub fn set_online_status(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
