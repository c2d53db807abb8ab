//! XP progression core
//!
//! The manager is the single authoritative holder of one user's progress.
//! All mutation funnels through [`XpProgressManager::add_xp`]; persistence
//! goes through the stores in [`crate::store`].

mod curve;
mod manager;
mod model;

pub use curve::LevelCurve;
pub use manager::{ProgressError, XpProgressManager};
pub use model::{EmergencySnapshot, LevelUp, PendingGain, XpProgress};
