//! CLI command implementations

pub mod award;
pub mod init;
pub mod recover;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use prepxp::auth::{EdgeFunctionTokenSource, TokenManager};
use prepxp::config::Config;
use prepxp::progress::{LevelCurve, XpProgressManager};
use prepxp::store::{RestProgressStore, SqliteSnapshotStore};

/// Everything a command needs to talk to the engine.
pub(crate) struct Env {
    pub config: Config,
    pub remote: Arc<RestProgressStore>,
    pub snapshots: Arc<SqliteSnapshotStore>,
    pub curve: LevelCurve,
}

impl Env {
    pub fn load(config_override: Option<&Path>) -> Result<Self> {
        let config = match config_override {
            Some(path) => Config::from_file(path)?,
            None => Config::load().context(
                "No configuration found. Run `prepxp init` and fill in ~/.prepxp/config.toml",
            )?,
        };

        if config.auth.user_id.trim().is_empty() {
            bail!("auth.user_id is not set in the config file");
        }
        if config.remote.base_url.trim().is_empty() {
            bail!("remote.base_url is not set in the config file");
        }

        let tokens = Arc::new(TokenManager::new(
            Arc::new(EdgeFunctionTokenSource::new(
                config.auth.token_url.as_str(),
                config.remote.api_key.as_str(),
            )),
            config.auth.identity_token.as_str(),
        ));
        let remote = Arc::new(RestProgressStore::new(
            config.remote.base_url.as_str(),
            config.remote.api_key.as_str(),
            tokens,
        ));
        let snapshots = Arc::new(SqliteSnapshotStore::open_default()?);
        let curve = config.leveling.curve();

        Ok(Self {
            config,
            remote,
            snapshots,
            curve,
        })
    }

    pub fn manager(&self) -> XpProgressManager {
        XpProgressManager::new(
            self.config.auth.user_id.as_str(),
            self.remote.clone(),
            self.snapshots.clone(),
            self.curve,
        )
    }
}
