//! `prepxp status` - show current level, XP, and streak

use std::path::Path;

use anyhow::Result;

use prepxp::store::SnapshotStore;

use super::Env;

pub async fn status_command(config_override: Option<&Path>) -> Result<()> {
    let env = Env::load(config_override)?;
    let manager = env.manager();
    let progress = manager.load_progress().await?;

    let needed = env.curve.required_for_level(progress.current_level);
    println!("User:          {}", env.config.auth.user_id);
    println!("Level:         {}", progress.current_level);
    println!(
        "XP:            {} total, {}/{} towards level {} ({:.0}%)",
        progress.total_xp,
        progress.xp_towards_next,
        needed,
        progress.current_level + 1,
        manager.get_level_progress()
    );
    println!("Streak:        {} days", progress.streak_days);
    println!("Earned today:  {} XP", progress.daily_xp_earned);

    if let Some(snapshot) = env.snapshots.read(&env.config.auth.user_id)? {
        println!(
            "Rescue:        {} unsaved XP from an interrupted session (run `prepxp recover`)",
            snapshot.pending_total()
        );
    }
    Ok(())
}
