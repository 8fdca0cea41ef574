//! Backup records and their lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inventory::DeviceId;

/// Record identifier, unique across all devices.
pub type RecordId = u64;

/// Lifecycle status of a backup record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupStatus {
    /// One-off manual capture.
    Collected,
    /// Device is under automatic recurring collection.
    BackupEnabled,
    /// Automatic collection explicitly turned off.
    BackupDisabled,
    /// Capture attempt failed.
    Failed(String),
}

impl BackupStatus {
    /// Whether a scheduled run may collect a device whose latest record has this status.
    pub fn is_collectable(&self) -> bool {
        matches!(self, BackupStatus::Collected | BackupStatus::BackupEnabled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BackupStatus::Failed(_))
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupStatus::Collected => f.write_str("Collected"),
            BackupStatus::BackupEnabled => f.write_str("Backup Enabled"),
            BackupStatus::BackupDisabled => f.write_str("Backup Disabled"),
            BackupStatus::Failed(reason) => write!(f, "Failed: {reason}"),
        }
    }
}

/// How a record came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionMode {
    Manual,
    Auto,
}

impl fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionMode::Manual => f.write_str("MANUAL"),
            CollectionMode::Auto => f.write_str("AUTO"),
        }
    }
}

/// One stored configuration version of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: RecordId,
    pub device_id: DeviceId,
    /// Normalized configuration text; empty for tombstones and failures.
    pub config: String,
    pub created: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
    /// Outcome message of the operation that produced the record.
    pub last_status: String,
    pub status: BackupStatus,
    pub collection_mode: CollectionMode,
}

/// Fields of a record about to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub device_id: DeviceId,
    pub config: String,
    pub last_status: String,
    pub status: BackupStatus,
    pub collection_mode: CollectionMode,
}

impl NewRecord {
    pub fn new(device_id: DeviceId, status: BackupStatus, collection_mode: CollectionMode) -> Self {
        Self {
            device_id,
            config: String::new(),
            last_status: String::new(),
            status,
            collection_mode,
        }
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    pub fn with_last_status(mut self, last_status: impl Into<String>) -> Self {
        self.last_status = last_status.into();
        self
    }
}

/// Device-level backup label derived from the most recent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceBackupStatus {
    AutoEnabled,
    Manual,
    Disabled,
}

impl fmt::Display for DeviceBackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceBackupStatus::AutoEnabled => f.write_str("Auto Enabled"),
            DeviceBackupStatus::Manual => f.write_str("Manual"),
            DeviceBackupStatus::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Project the device-level label from its most recent record.
pub fn project_status(latest: Option<&BackupRecord>) -> DeviceBackupStatus {
    match latest.map(|r| &r.status) {
        Some(BackupStatus::BackupEnabled) => DeviceBackupStatus::AutoEnabled,
        Some(BackupStatus::Collected) => DeviceBackupStatus::Manual,
        _ => DeviceBackupStatus::Disabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: BackupStatus) -> BackupRecord {
        BackupRecord {
            id: 1,
            device_id: 7,
            config: String::new(),
            created: Utc::now(),
            last_checked: Utc::now(),
            last_status: String::new(),
            status,
            collection_mode: CollectionMode::Manual,
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(BackupStatus::BackupEnabled.to_string(), "Backup Enabled");
        assert_eq!(
            BackupStatus::Failed("Connection timed out".into()).to_string(),
            "Failed: Connection timed out"
        );
    }

    #[test]
    fn test_collectable_statuses() {
        assert!(BackupStatus::Collected.is_collectable());
        assert!(BackupStatus::BackupEnabled.is_collectable());
        assert!(!BackupStatus::BackupDisabled.is_collectable());
        assert!(!BackupStatus::Failed("x".into()).is_collectable());
    }

    #[test]
    fn test_project_status() {
        assert_eq!(project_status(None), DeviceBackupStatus::Disabled);
        assert_eq!(
            project_status(Some(&record(BackupStatus::BackupEnabled))),
            DeviceBackupStatus::AutoEnabled
        );
        assert_eq!(
            project_status(Some(&record(BackupStatus::Collected))),
            DeviceBackupStatus::Manual
        );
        assert_eq!(
            project_status(Some(&record(BackupStatus::Failed("x".into())))),
            DeviceBackupStatus::Disabled
        );
    }
}
