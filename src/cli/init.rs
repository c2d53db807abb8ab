//! `prepxp init` - write a default configuration file

use anyhow::{Result, bail};

use prepxp::config::Config;

pub fn init_command(force: bool) -> Result<()> {
    let path = Config::global_config_path();
    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to(&path)?;
    println!("Wrote default config to {}", path.display());
    println!("Fill in [remote] and [auth] before using `status`, `award`, or `recover`.");
    Ok(())
}
