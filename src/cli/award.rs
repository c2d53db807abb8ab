//! `prepxp award` - apply an XP gain and save it remotely

use std::path::Path;

use anyhow::{Context, Result};

use super::Env;

pub async fn award_command(config_override: Option<&Path>, amount: u64, source: &str) -> Result<()> {
    let env = Env::load(config_override)?;
    let manager = env.manager();
    manager.load_progress().await?;

    let level_up = manager.add_xp(amount, source)?;
    manager.force_save().await?;

    let progress = manager
        .get_current_progress()
        .context("progress missing after save")?;
    println!("Awarded {amount} XP ({source})");
    if let Some(up) = level_up {
        println!("Level up! {} -> {}", up.old_level, up.new_level);
    }
    println!(
        "Now level {} with {} total XP",
        progress.current_level, progress.total_xp
    );
    Ok(())
}
