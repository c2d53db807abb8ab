//! Persistence boundary
//!
//! Two stores back the progress manager: the remote row store holding the
//! durable progress record, and a local snapshot store that keeps emergency
//! rescue state across abrupt session ends. The remote store is async and
//! fallible-but-retryable; the snapshot store is synchronous because it must
//! be usable from teardown paths where nothing can be awaited.

mod remote;
mod snapshot;

pub use remote::RestProgressStore;
pub use snapshot::SqliteSnapshotStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::progress::{EmergencySnapshot, XpProgress};

/// Remote save/load failure. Every variant is retryable from the caller's
/// point of view: the pending buffer is kept and the save can be re-issued.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("auth token unavailable: {0}")]
    Token(String),
}

/// The remote progress record, one row per user, upsert semantics.
#[async_trait]
pub trait RemoteProgressStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<XpProgress>, StoreError>;

    /// Update-if-exists else insert. Any failure leaves the caller free to
    /// retry with the same payload.
    async fn upsert(&self, user_id: &str, progress: &XpProgress) -> Result<(), StoreError>;
}

/// Local durable key-value store for emergency snapshots, keyed by user id.
/// All operations are synchronous.
pub trait SnapshotStore: Send + Sync {
    fn read(&self, user_id: &str) -> Result<Option<EmergencySnapshot>>;
    fn write(&self, user_id: &str, snapshot: &EmergencySnapshot) -> Result<()>;
    fn clear(&self, user_id: &str) -> Result<()>;
}
