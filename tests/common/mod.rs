//! Shared test doubles for the persistence boundary.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use prepxp::progress::{EmergencySnapshot, XpProgress};
use prepxp::store::{RemoteProgressStore, SnapshotStore, StoreError};

/// In-memory remote row store with switchable failure and optional latency.
#[derive(Default)]
pub struct FakeRemote {
    rows: Mutex<HashMap<String, XpProgress>>,
    pub upserts: AtomicUsize,
    pub fail: AtomicBool,
    pub delay_ms: u64,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self, user_id: &str) -> Option<XpProgress> {
        self.rows.lock().unwrap().get(user_id).cloned()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteProgressStore for FakeRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<XpProgress>, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Network("connection refused".into()));
        }
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn upsert(&self, user_id: &str, progress: &XpProgress) -> Result<(), StoreError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Network("connection refused".into()));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .insert(user_id.to_string(), progress.clone());
        Ok(())
    }
}

/// In-memory emergency snapshot store.
#[derive(Default)]
pub struct FakeSnapshots {
    map: Mutex<HashMap<String, EmergencySnapshot>>,
}

impl FakeSnapshots {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for FakeSnapshots {
    fn read(&self, user_id: &str) -> Result<Option<EmergencySnapshot>> {
        Ok(self.map.lock().unwrap().get(user_id).cloned())
    }

    fn write(&self, user_id: &str, snapshot: &EmergencySnapshot) -> Result<()> {
        self.map
            .lock()
            .unwrap()
            .insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }

    fn clear(&self, user_id: &str) -> Result<()> {
        self.map.lock().unwrap().remove(user_id);
        Ok(())
    }
}
