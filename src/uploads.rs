use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use api::response::FileRecord;

use crate::metrics;

/// One webhook delivery: the files that arrived together, keyed by whichever
/// correlation identifiers the callback carried.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub sid: Option<String>,
    pub resource_id: Option<String>,
    pub files: Vec<FileRecord>,
    pub received_at: DateTime<Utc>,
}

/// Correlation store between provider-pushed deliveries and the sessions
/// that requested them. Two indices share the same batch value; lookups are
/// idempotent and re-delivery for a key overwrites, never merges.
///
/// Batches outlive their session entry deliberately: a stop response may
/// reference a batch before the session record is cleared, and a poller may
/// need it well after. The retention sweep bounds growth.
#[derive(Clone)]
pub struct UploadStore {
    by_sid: Arc<RwLock<HashMap<String, Arc<UploadBatch>>>>,
    by_resource: Arc<RwLock<HashMap<String, Arc<UploadBatch>>>>,
    retention: Duration,
}

impl UploadStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            by_sid: Arc::new(RwLock::new(HashMap::new())),
            by_resource: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    pub fn put(&self, batch: UploadBatch) {
        let batch = Arc::new(batch);
        if let Some(sid) = &batch.sid {
            self.by_sid
                .write()
                .unwrap()
                .insert(sid.clone(), batch.clone());
        }
        if let Some(resource_id) = &batch.resource_id {
            self.by_resource
                .write()
                .unwrap()
                .insert(resource_id.clone(), batch.clone());
        }
        self.update_gauge();
    }

    /// `None` means no delivery arrived yet; a batch with an empty file list
    /// means the provider delivered with zero files.
    pub fn get_by_sid(&self, sid: &str) -> Option<Arc<UploadBatch>> {
        self.by_sid.read().unwrap().get(sid).cloned()
    }

    pub fn get_by_resource(&self, resource_id: &str) -> Option<Arc<UploadBatch>> {
        self.by_resource.read().unwrap().get(resource_id).cloned()
    }

    pub fn remove_by_sid(&self, sid: &str) {
        let removed = self.by_sid.write().unwrap().remove(sid);
        if let Some(batch) = removed {
            if let Some(resource_id) = &batch.resource_id {
                self.by_resource.write().unwrap().remove(resource_id);
            }
        }
        self.update_gauge();
    }

    /// Drops every batch received before `cutoff` from both indices.
    /// Returns how many distinct batches went away.
    pub fn evict_expired(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        {
            let mut by_sid = self.by_sid.write().unwrap();
            by_sid.retain(|_, batch| {
                let keep = batch.received_at >= cutoff;
                if !keep {
                    removed += 1;
                }
                keep
            });
        }
        {
            let mut by_resource = self.by_resource.write().unwrap();
            by_resource.retain(|_, batch| {
                let keep = batch.received_at >= cutoff;
                if !keep && batch.sid.is_none() {
                    removed += 1;
                }
                keep
            });
        }
        self.update_gauge();
        removed
    }

    /// Background retention sweep; the only time the store evicts on its own.
    pub async fn retention_tick(self) {
        let retention = chrono::Duration::seconds(self.retention.as_secs() as i64);
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let removed = self.evict_expired(Utc::now() - retention);
            if removed > 0 {
                info!(removed, "expired upload batches evicted");
            }
        }
    }

    fn update_gauge(&self) {
        let sids = self.by_sid.read().unwrap().len();
        let resource_only = self
            .by_resource
            .read()
            .unwrap()
            .values()
            .filter(|batch| batch.sid.is_none())
            .count();
        metrics::BATCHES.set((sids + resource_only) as f64);
    }
}
