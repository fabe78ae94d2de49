//! crates/appointment_core/src/activity.rs
//!
//! The append-only activity log behind the admin dashboard.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::adapters::next_id;
use crate::domain::{ActivityEntry, ActivityInput};
use crate::error::CoreResult;
use crate::ports::{keys, BlobStore, Clock, PortResult};
use crate::records::{self, ActivityRecord};
use crate::snapshot::Snapshot;

/// Records administrative actions under the `adminActivities` key.
pub struct ActivityLog {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Appends one entry and persists the whole log.
    ///
    /// The timestamp never goes backwards relative to the previous entry, even
    /// if the clock does. On a storage failure the stored log is unchanged.
    pub async fn append(&self, input: ActivityInput) -> CoreResult<ActivityEntry> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await?;
        let last = entries.last();
        let now = self.clock.now();
        let timestamp = match last {
            Some(prev) if prev.timestamp > now => prev.timestamp,
            _ => now,
        };
        let id = next_id(now, entries.iter().map(|e| e.id).max());

        let entry = ActivityEntry {
            id,
            kind: input.kind,
            action: input.action,
            details: input.details,
            timestamp,
        };
        entries.push(entry.clone());

        let records: Vec<ActivityRecord> = entries.iter().map(ActivityRecord::from_domain).collect();
        let bytes = records::encode(keys::ACTIVITIES, &records)?;
        self.store
            .set(keys::ACTIVITIES, bytes)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to persist activity log"))?;

        debug!(id = entry.id, kind = %entry.kind, action = %entry.action, "Activity recorded");
        Ok(entry)
    }

    /// All entries in insertion order.
    pub async fn list(&self) -> CoreResult<Snapshot<ActivityEntry>> {
        Ok(Snapshot::new(self.load().await?))
    }

    /// The newest `limit` entries, newest first.
    pub async fn recent(&self, limit: usize) -> CoreResult<Snapshot<ActivityEntry>> {
        let entries = self.load().await?;
        let newest_first = entries.into_iter().rev().take(limit).collect();
        Ok(Snapshot::new(newest_first))
    }

    async fn load(&self) -> PortResult<Vec<ActivityEntry>> {
        let records: Vec<ActivityRecord> =
            records::load_list(self.store.as_ref(), keys::ACTIVITIES).await?;
        records
            .into_iter()
            .map(|r| r.to_domain(keys::ACTIVITIES))
            .collect()
    }
}
