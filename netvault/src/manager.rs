//! Backup lifecycle: manual collection, enable/disable, scheduled runs.
//!
//! All writes to one device's history go through a per-device lock, so a
//! scheduled run, a manual capture and a retention pass for the same
//! device never interleave. Different devices proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::capture::ConfigCapturer;
use crate::diff::{self, DiffLine};
use crate::error::{DiffError, Error, Result, StoreError};
use crate::inventory::{Device, DeviceId};
use crate::retention::{self, RetentionPolicy, RetentionReport};
use crate::store::{
    BackupRecord, BackupStatus, CollectionMode, DeviceBackupStatus, NewRecord, RecordId,
    RecordStore,
};

/// `last_status` of a successful capture.
pub const STATUS_SUCCESS: &str = "Success";

/// `last_status` of a record upgraded in place to automatic collection.
pub const STATUS_AUTO_ENABLED: &str = "Auto backup enabled";

/// Why a scheduled run left a device alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither primary nor out-of-band address.
    NoAddress,
    /// The device has never been backed up.
    NoRecords,
    /// Latest record is disabled or failed.
    NotEnabled(BackupStatus),
}

/// Result of a scheduled run on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledOutcome {
    /// Configuration changed; a new record was written.
    Saved(BackupRecord),
    /// Configuration identical to the latest record; nothing written.
    Unchanged,
    /// Capture failed; a `Failed` record was written.
    Failed(BackupRecord),
    /// Device not eligible; nothing attempted.
    Skipped(SkipReason),
}

/// Result of enabling automatic collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnableOutcome {
    /// Latest record upgraded in place; no capture happened.
    Upgraded(BackupRecord),
    /// A fresh capture was stored as the enabled record.
    Captured(BackupRecord),
    /// The fresh capture failed; the enabled record carries the reason.
    CaptureFailed { record: BackupRecord, reason: String },
}

/// Per-device async locks, created on first use.
#[derive(Debug, Default)]
struct DeviceLocks {
    locks: StdMutex<HashMap<DeviceId, Arc<Mutex<()>>>>,
}

impl DeviceLocks {
    async fn lock(&self, device: DeviceId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(device).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Coordinates captures and the record store.
pub struct BackupManager<S, C> {
    store: Mutex<S>,
    capturer: C,
    locks: DeviceLocks,
}

impl<S, C> BackupManager<S, C>
where
    S: RecordStore,
    C: ConfigCapturer,
{
    pub fn new(store: S, capturer: C) -> Self {
        Self {
            store: Mutex::new(store),
            capturer,
            locks: DeviceLocks::default(),
        }
    }

    pub fn capturer(&self) -> &C {
        &self.capturer
    }

    /// Consume the manager and return its store.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    /// Operator-triggered one-off capture.
    ///
    /// A failed capture is recorded as `Failed:<reason>` and also returned
    /// as [`Error::CaptureFailed`].
    pub async fn collect_manual(&self, device: &Device) -> Result<BackupRecord> {
        require_address(device)?;
        let _guard = self.locks.lock(device.id).await;

        match self.capturer.capture(device).await {
            Ok(config) => {
                let record = self
                    .insert(
                        NewRecord::new(device.id, BackupStatus::Collected, CollectionMode::Manual)
                            .with_config(config)
                            .with_last_status(STATUS_SUCCESS),
                    )
                    .await?;
                info!("{}: backup collected (MANUAL)", device.name);
                Ok(record)
            }
            Err(e) => {
                let reason = e.reason();
                self.insert(
                    NewRecord::new(
                        device.id,
                        BackupStatus::Failed(reason.clone()),
                        CollectionMode::Manual,
                    )
                    .with_last_status(reason.clone()),
                )
                .await?;
                error!("{}: backup error: {}", device.name, reason);
                Err(Error::CaptureFailed {
                    device: device.name.clone(),
                    reason,
                })
            }
        }
    }

    /// Put a device under automatic collection.
    ///
    /// If the latest record is `Collected` or `BackupEnabled` it is upgraded
    /// in place. Otherwise a fresh capture is stored as `BackupEnabled`,
    /// even when it fails, so later scheduled runs retry the device.
    pub async fn enable(&self, device: &Device) -> Result<EnableOutcome> {
        require_address(device)?;
        let _guard = self.locks.lock(device.id).await;

        let latest = self.store.lock().await.latest(device.id);
        if let Some(mut record) = latest.filter(|r| r.status.is_collectable()) {
            record.status = BackupStatus::BackupEnabled;
            record.last_status = STATUS_AUTO_ENABLED.to_string();
            record.collection_mode = CollectionMode::Auto;
            record.last_checked = Utc::now();
            self.store.lock().await.update(&record).await?;
            info!("{}: automatic backup enabled on record {}", device.name, record.id);
            return Ok(EnableOutcome::Upgraded(record));
        }

        let enabled = NewRecord::new(device.id, BackupStatus::BackupEnabled, CollectionMode::Auto);
        match self.capturer.capture(device).await {
            Ok(config) => {
                let record = self
                    .insert(enabled.with_config(config).with_last_status(STATUS_SUCCESS))
                    .await?;
                info!("{}: automatic backup enabled with fresh capture", device.name);
                Ok(EnableOutcome::Captured(record))
            }
            Err(e) => {
                let reason = e.reason();
                let record = self.insert(enabled.with_last_status(reason.clone())).await?;
                error!("{}: backup error: {}", device.name, reason);
                Ok(EnableOutcome::CaptureFailed { record, reason })
            }
        }
    }

    /// Opt a device out of automatic collection by writing a tombstone.
    pub async fn disable(&self, device: &Device, actor: &str) -> Result<BackupRecord> {
        let _guard = self.locks.lock(device.id).await;
        let record = self
            .insert(
                NewRecord::new(device.id, BackupStatus::BackupDisabled, CollectionMode::Manual)
                    .with_last_status(format!("Disabled by user {actor}")),
            )
            .await?;
        info!("{}: automatic backup disabled by {}", device.name, actor);
        Ok(record)
    }

    /// Scheduled automatic run for one device.
    ///
    /// Capture errors never escape: they become a `Failed` record. Only
    /// store errors are returned.
    pub async fn collect_scheduled(&self, device: &Device) -> Result<ScheduledOutcome> {
        if device.address().is_none() {
            return Ok(ScheduledOutcome::Skipped(SkipReason::NoAddress));
        }
        let _guard = self.locks.lock(device.id).await;

        let Some(latest) = self.store.lock().await.latest(device.id) else {
            return Ok(ScheduledOutcome::Skipped(SkipReason::NoRecords));
        };
        if !latest.status.is_collectable() {
            debug!("{}: skipped, latest status is {}", device.name, latest.status);
            return Ok(ScheduledOutcome::Skipped(SkipReason::NotEnabled(latest.status)));
        }

        match self.capturer.capture(device).await {
            Ok(config) if config == latest.config => {
                debug!("{}: configuration unchanged", device.name);
                Ok(ScheduledOutcome::Unchanged)
            }
            Ok(config) => {
                let record = self
                    .insert(
                        NewRecord::new(device.id, BackupStatus::BackupEnabled, CollectionMode::Auto)
                            .with_config(config)
                            .with_last_status(STATUS_SUCCESS),
                    )
                    .await?;
                info!("{}: backup saved (AUTO)", device.name);
                Ok(ScheduledOutcome::Saved(record))
            }
            Err(e) => {
                let reason = e.reason();
                let record = self
                    .insert(
                        NewRecord::new(
                            device.id,
                            BackupStatus::Failed(reason.clone()),
                            CollectionMode::Auto,
                        )
                        .with_last_status(reason.clone()),
                    )
                    .await?;
                error!("{}: backup error: {}", device.name, reason);
                Ok(ScheduledOutcome::Failed(record))
            }
        }
    }

    /// Operator bulk delete of selected records of one device.
    ///
    /// Every id must belong to `device`; nothing is deleted otherwise.
    pub async fn delete_records(&self, device: DeviceId, ids: &[RecordId]) -> Result<usize> {
        let _guard = self.locks.lock(device).await;
        let mut store = self.store.lock().await;

        for &id in ids {
            match store.get(id) {
                Some(record) if record.device_id == device => {}
                _ => return Err(StoreError::RecordNotFound(id).into()),
            }
        }

        let deleted = store.delete(ids).await?;
        info!("deleted {} backup(s) of device {}", deleted, device);
        Ok(deleted)
    }

    /// Apply the retention policy to one device.
    pub async fn prune_device(&self, device: DeviceId, policy: &RetentionPolicy) -> Result<usize> {
        let _guard = self.locks.lock(device).await;
        let mut store = self.store.lock().await;
        Ok(retention::prune(&mut *store, device, policy).await?)
    }

    /// Apply the retention policy to every device with records.
    pub async fn prune_all(&self, policy: &RetentionPolicy) -> Result<RetentionReport> {
        let devices = self.store.lock().await.device_ids();
        let mut report = RetentionReport {
            dry_run: policy.dry_run,
            ..RetentionReport::default()
        };

        for device in devices {
            let deleted = self.prune_device(device, policy).await?;
            if deleted > 0 {
                report.devices_pruned += 1;
                report.deleted += deleted;
            }
        }

        info!(
            "TOTAL {}: {} backups",
            if policy.dry_run { "WOULD DELETE" } else { "DELETED" },
            report.deleted
        );
        Ok(report)
    }

    /// Line-paired comparison of exactly two records.
    pub async fn diff(&self, ids: &[RecordId]) -> Result<Vec<DiffLine>> {
        let [left, right] = ids else {
            return Err(DiffError::SelectionCount(ids.len()).into());
        };

        let store = self.store.lock().await;
        let left = store.get(*left).ok_or(StoreError::RecordNotFound(*left))?;
        let right = store.get(*right).ok_or(StoreError::RecordNotFound(*right))?;
        Ok(diff::diff(&left.config, &right.config))
    }

    /// Records of a device, newest first.
    pub async fn records(&self, device: DeviceId) -> Vec<BackupRecord> {
        self.store.lock().await.records(device)
    }

    /// Newest record of a device.
    pub async fn latest(&self, device: DeviceId) -> Option<BackupRecord> {
        self.store.lock().await.latest(device)
    }

    /// One record by id.
    pub async fn record(&self, id: RecordId) -> Result<BackupRecord> {
        self.store
            .lock()
            .await
            .get(id)
            .ok_or_else(|| StoreError::RecordNotFound(id).into())
    }

    /// Device-level backup label.
    pub async fn device_status(&self, device: DeviceId) -> DeviceBackupStatus {
        self.store.lock().await.device_status(device)
    }

    async fn insert(&self, record: NewRecord) -> Result<BackupRecord> {
        Ok(self.store.lock().await.insert(record).await?)
    }
}

fn require_address(device: &Device) -> Result<()> {
    match device.address() {
        Some(_) => Ok(()),
        None => Err(Error::NoAddressConfigured {
            device: device.name.clone(),
        }),
    }
}
