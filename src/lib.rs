//! prepxp - XP progression engine for competition-math practice
//!
//! prepxp tracks one user's experience points, level, and daily streak while
//! they practice competition problems. Earned XP is applied to in-memory
//! state immediately and buffered as pending gains until it can be flushed
//! to the remote progress store, so a flaky network never blocks practice
//! and never silently loses XP.
//!
//! ## Durability model
//!
//! 1. **Optimistic apply**: every gain updates the in-memory progress right
//!    away and is queued as a pending gain.
//! 2. **Flush**: pending gains are saved remotely in the background, on
//!    explicit request, or before sign-out.
//! 3. **Emergency snapshot**: if the session ends abruptly, a synchronous
//!    local snapshot (progress + pending gains) survives and is reconciled
//!    on the next session start without double-counting.

pub mod auth;
pub mod config;
pub mod progress;
pub mod scoring;
pub mod session;
pub mod store;

pub use progress::{LevelCurve, LevelUp, PendingGain, XpProgress, XpProgressManager};
pub use scoring::{QuizResult, QuizXpAward, UserStats, calculate_quiz_xp};
