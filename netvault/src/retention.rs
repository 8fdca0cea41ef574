//! Per-device retention.
//!
//! Pruning only kicks in once a device has more than `threshold` records,
//! and then cuts it back to the `keep` newest. Devices at or below the
//! threshold are left alone.

use log::info;

use crate::error::StoreError;
use crate::inventory::DeviceId;
use crate::store::{BackupRecord, RecordId, RecordStore};

/// Retention settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Records to keep once pruning triggers.
    pub keep: usize,

    /// Record count above which pruning triggers.
    pub threshold: usize,

    /// Report what would be deleted without deleting anything.
    pub dry_run: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep: 3,
            threshold: 15,
            dry_run: false,
        }
    }
}

impl RetentionPolicy {
    pub fn new(keep: usize, threshold: usize) -> Self {
        Self {
            keep,
            threshold,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Records to delete, given a device's records ordered newest first.
    pub fn plan(&self, newest_first: &[BackupRecord]) -> Vec<RecordId> {
        if newest_first.len() <= self.threshold {
            return Vec::new();
        }
        newest_first.iter().skip(self.keep).map(|r| r.id).collect()
    }
}

/// Totals of a fleet-wide retention run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Devices whose record count exceeded the threshold.
    pub devices_pruned: usize,

    /// Records deleted (or that would be, under dry run).
    pub deleted: usize,

    pub dry_run: bool,
}

/// Apply `policy` to one device's records, returning the deletion count.
///
/// Under dry run the count is what would have been deleted.
pub async fn prune<S: RecordStore>(
    store: &mut S,
    device: DeviceId,
    policy: &RetentionPolicy,
) -> Result<usize, StoreError> {
    let records = store.records(device);
    let doomed = policy.plan(&records);
    if doomed.is_empty() {
        return Ok(0);
    }

    info!(
        "device {}: {} backups found, keeping {}",
        device,
        records.len(),
        policy.keep
    );

    if policy.dry_run {
        info!("DRY RUN: would delete {} backups", doomed.len());
        return Ok(doomed.len());
    }

    let deleted = store.delete(&doomed).await?;
    info!("deleted {} backups for device {}", deleted, device);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BackupStatus, CollectionMode, JsonStore, NewRecord};

    async fn store_with(device: DeviceId, count: usize, store: &mut JsonStore) -> Vec<RecordId> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let record = store
                .insert(
                    NewRecord::new(device, BackupStatus::BackupEnabled, CollectionMode::Auto)
                        .with_config(format!("hostname r{device}\n! v{i}")),
                )
                .await
                .unwrap();
            ids.push(record.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_prunes_down_to_keep() {
        let mut store = JsonStore::in_memory();
        let ids = store_with(1, 20, &mut store).await;

        let deleted = prune(&mut store, 1, &RetentionPolicy::new(3, 15)).await.unwrap();
        assert_eq!(deleted, 17);

        let remaining: Vec<_> = store.records(1).into_iter().map(|r| r.id).collect();
        assert_eq!(remaining, vec![ids[19], ids[18], ids[17]]);
    }

    #[tokio::test]
    async fn test_below_threshold_untouched() {
        let mut store = JsonStore::in_memory();
        store_with(1, 10, &mut store).await;

        let deleted = prune(&mut store, 1, &RetentionPolicy::default()).await.unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(store.records(1).len(), 10);
    }

    #[tokio::test]
    async fn test_exactly_at_threshold_untouched() {
        let mut store = JsonStore::in_memory();
        store_with(1, 15, &mut store).await;
        assert_eq!(prune(&mut store, 1, &RetentionPolicy::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_delete() {
        let mut store = JsonStore::in_memory();
        store_with(1, 20, &mut store).await;

        let policy = RetentionPolicy::default().with_dry_run(true);
        assert_eq!(prune(&mut store, 1, &policy).await.unwrap(), 17);
        assert_eq!(store.records(1).len(), 20);
    }

    #[tokio::test]
    async fn test_other_devices_unaffected() {
        let mut store = JsonStore::in_memory();
        store_with(1, 20, &mut store).await;
        store_with(2, 20, &mut store).await;

        prune(&mut store, 1, &RetentionPolicy::default()).await.unwrap();
        assert_eq!(store.records(1).len(), 3);
        assert_eq!(store.records(2).len(), 20);
    }
}
