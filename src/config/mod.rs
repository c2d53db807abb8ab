//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::progress::LevelCurve;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote progress store endpoint
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Authentication settings
    #[serde(default)]
    pub auth: AuthSettings,

    /// Leveling curve constants
    #[serde(default)]
    pub leveling: LevelingSettings,

    /// Save scheduling settings
    #[serde(default)]
    pub save: SaveSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteSettings {
    /// Base URL of the REST row store, e.g. `https://abc.supabase.co`
    #[serde(default)]
    pub base_url: String,

    /// Project API key sent with every request
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthSettings {
    /// Id of the signed-in user; keys the progress row and local snapshots
    #[serde(default)]
    pub user_id: String,

    /// Token-exchange edge function URL
    #[serde(default)]
    pub token_url: String,

    /// Pre-authenticated identity token handed to the exchange endpoint
    #[serde(default)]
    pub identity_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelingSettings {
    /// XP required to go from level 1 to level 2
    #[serde(default = "default_base_xp")]
    pub base_xp: u32,

    /// Geometric growth factor per level
    #[serde(default = "default_growth")]
    pub growth: f64,
}

fn default_base_xp() -> u32 {
    100
}

fn default_growth() -> f64 {
    1.2
}

impl Default for LevelingSettings {
    fn default() -> Self {
        Self {
            base_xp: default_base_xp(),
            growth: default_growth(),
        }
    }
}

impl LevelingSettings {
    pub fn curve(&self) -> LevelCurve {
        LevelCurve::new(self.base_xp, self.growth)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSettings {
    /// Pending XP at which the session auto-saves
    #[serde(default = "default_auto_save_threshold")]
    pub auto_save_threshold: u64,

    /// Seconds between background auto-save checks
    #[serde(default = "default_auto_save_interval_secs")]
    pub auto_save_interval_secs: u64,
}

fn default_auto_save_threshold() -> u64 {
    50
}

fn default_auto_save_interval_secs() -> u64 {
    30
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            auto_save_threshold: default_auto_save_threshold(),
            auto_save_interval_secs: default_auto_save_interval_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the global config path (`~/.prepxp/config.toml`)
    pub fn load() -> Result<Self> {
        Self::from_file(&Self::global_config_path())
    }

    /// Write this config to a file, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Global configuration directory (`~/.prepxp`)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".prepxp")
    }

    /// Global configuration file path (`~/.prepxp/config.toml`)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.leveling.base_xp == 0 {
            bail!("leveling.base_xp must be at least 1");
        }
        if !self.leveling.growth.is_finite() || self.leveling.growth <= 1.0 {
            bail!("leveling.growth must be greater than 1.0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.leveling.base_xp, 100);
        assert!((config.leveling.growth - 1.2).abs() < f64::EPSILON);
        assert_eq!(config.save.auto_save_threshold, 50);
        config.validate().unwrap();
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.remote.base_url = "https://example.supabase.co".into();
        config.auth.user_id = "u1".into();
        config.save_to(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.remote.base_url, "https://example.supabase.co");
        assert_eq!(loaded.auth.user_id, "u1");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[remote]\nbase_url = \"https://x.supabase.co\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.remote.base_url, "https://x.supabase.co");
        assert_eq!(config.leveling.base_xp, 100);
    }

    #[test]
    fn test_rejects_flat_growth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[leveling]\ngrowth = 1.0\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
