//! Versioned backup record store.
//!
//! Records for a device are append-mostly: every capture, enable or
//! disable creates a new record, and "current state" always means the
//! newest record. The one in-place edit is upgrading a device's latest
//! record to automatic collection.
//!
//! Every write recomputes the device-level [`DeviceBackupStatus`] from the
//! newest remaining record, synchronously, in the write path.

mod json;
mod record;

pub use json::JsonStore;
pub use record::{
    BackupRecord, BackupStatus, CollectionMode, DeviceBackupStatus, NewRecord, RecordId,
    project_status,
};

use std::future::Future;

use crate::error::StoreError;
use crate::inventory::DeviceId;

/// Persistence contract for backup records.
///
/// Writes are async and durable: a write that returns `Err` leaves the
/// store as it was before the call.
pub trait RecordStore: Send {
    /// Insert a new record, assigning its id and timestamps.
    fn insert(
        &mut self,
        record: NewRecord,
    ) -> impl Future<Output = Result<BackupRecord, StoreError>> + Send;

    /// Overwrite an existing record's mutable fields.
    fn update(
        &mut self,
        record: &BackupRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete records by id, returning how many were removed.
    fn delete(
        &mut self,
        ids: &[RecordId],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Fetch one record.
    fn get(&self, id: RecordId) -> Option<BackupRecord>;

    /// All records of a device, newest first.
    fn records(&self, device: DeviceId) -> Vec<BackupRecord>;

    /// Devices that have at least one record.
    fn device_ids(&self) -> Vec<DeviceId>;

    /// Device-level label projected from the newest record.
    fn device_status(&self, device: DeviceId) -> DeviceBackupStatus;

    /// The newest record of a device.
    fn latest(&self, device: DeviceId) -> Option<BackupRecord> {
        self.records(device).into_iter().next()
    }
}
