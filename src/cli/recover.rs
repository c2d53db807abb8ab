//! `prepxp recover` - flush a rescued emergency snapshot

use std::path::Path;

use anyhow::Result;

use prepxp::progress::XpProgressManager;

use super::Env;

pub async fn recover_command(config_override: Option<&Path>) -> Result<()> {
    let env = Env::load(config_override)?;
    let user_id = env.config.auth.user_id.clone();

    let Some(snapshot) =
        XpProgressManager::recover_emergency_data(env.snapshots.as_ref(), &user_id)?
    else {
        println!("No emergency snapshot found for {user_id}");
        return Ok(());
    };

    let rescued_xp = snapshot.pending_total();
    let manager = XpProgressManager::with_recovered(
        user_id.as_str(),
        env.remote.clone(),
        env.snapshots.clone(),
        env.curve,
        snapshot.progress,
    );
    // The rescued progress already includes these gains; install, don't re-apply.
    manager.set_pending_gains(snapshot.pending_gains);

    match manager.force_save().await {
        Ok(()) => println!("Recovered and saved {rescued_xp} XP"),
        Err(e) => {
            // Keep the rescue around for another attempt.
            manager.emergency_local_save();
            anyhow::bail!("Recovery save failed ({e}); snapshot kept for retry");
        }
    }
    Ok(())
}
