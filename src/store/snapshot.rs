//! SQLite-backed emergency snapshot store
//!
//! Manages the `~/.prepxp/snapshots.db` database. Writes are synchronous and
//! keyed by user id, so a snapshot taken during session teardown is durable
//! the moment the call returns.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::SnapshotStore;
use crate::config::Config;
use crate::progress::EmergencySnapshot;

/// Database wrapper, cheap to clone and share across the session.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSnapshotStore {
    /// Open or create the snapshot database at the default location
    /// (`~/.prepxp/snapshots.db`).
    pub fn open_default() -> Result<Self> {
        let db_path = Config::global_config_dir().join("snapshots.db");
        Self::open(&db_path)
    }

    /// Open or create the snapshot database at a specific path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create snapshot dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open snapshot db: {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Snapshot DB lock poisoned")
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA_SQL)?;
        Ok(())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn read(&self, user_id: &str) -> Result<Option<EmergencySnapshot>> {
        let conn = self.conn();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM emergency_snapshots WHERE user_id = ?1",
                [user_id],
                |r| r.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match payload {
            Some(json) => {
                let snapshot: EmergencySnapshot = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt emergency snapshot for user {user_id}"))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn write(&self, user_id: &str, snapshot: &EmergencySnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let saved_at = snapshot.saved_at.timestamp_millis();
        self.conn().execute(
            "INSERT OR REPLACE INTO emergency_snapshots (user_id, payload, saved_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![user_id, payload, saved_at],
        )?;
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<()> {
        self.conn().execute(
            "DELETE FROM emergency_snapshots WHERE user_id = ?1",
            [user_id],
        )?;
        Ok(())
    }
}

const SCHEMA_SQL: &str = r#"
-- One rescue snapshot per user; overwritten on every emergency save
CREATE TABLE IF NOT EXISTS emergency_snapshots (
    user_id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    saved_at INTEGER NOT NULL
);
"#;
