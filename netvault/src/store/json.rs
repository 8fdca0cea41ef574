//! JSON-file record store.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::RecordStore;
use super::record::{
    BackupRecord, DeviceBackupStatus, NewRecord, RecordId, project_status,
};
use crate::error::StoreError;
use crate::inventory::DeviceId;

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: RecordId,
    records: Vec<BackupRecord>,
}

/// Record store kept in memory and mirrored to a JSON file.
///
/// The file is rewritten after every mutation: the document goes to a temp
/// file that is fsynced and then renamed over the old one. A mutation whose
/// write fails is rolled back in memory, so memory never runs ahead of disk.
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    next_id: RecordId,
    records: Vec<BackupRecord>,
    statuses: HashMap<DeviceId, DeviceBackupStatus>,
}

impl JsonStore {
    /// Open (or create on first write) a store backed by `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            serde_json::from_str::<Snapshot>(&content)?
        } else {
            Snapshot::default()
        };

        info!(
            "opened backup store {} ({} records)",
            path.display(),
            snapshot.records.len()
        );

        let mut store = Self {
            path: Some(path),
            next_id: snapshot.next_id.max(1),
            records: snapshot.records,
            statuses: HashMap::new(),
        };
        store.refresh_all_statuses();
        Ok(store)
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            next_id: 1,
            records: Vec::new(),
            statuses: HashMap::new(),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sorted_newest_first(mut records: Vec<BackupRecord>) -> Vec<BackupRecord> {
        records.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        records
    }

    fn refresh_status(&mut self, device: DeviceId) {
        let latest = self.latest(device);
        let status = project_status(latest.as_ref());
        if self.statuses.insert(device, status) != Some(status) {
            debug!("backup status of device {} is now {}", device, status);
        }
    }

    fn refresh_all_statuses(&mut self) {
        for device in self.device_ids() {
            self.refresh_status(device);
        }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot = SnapshotRef {
            next_id: self.next_id,
            records: &self.records,
        };
        let content = serde_json::to_vec_pretty(&snapshot)?;
        write_atomically(path, &content).await
    }
}

/// Write `content` to a fsynced temp file next to `path`, then rename it over `path`.
async fn write_atomically(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");

    let written = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(content).await?;
        file.flush().await?;
        file.sync_all().await?;
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            debug!("removing {}: {}", tmp.display(), cleanup);
        }
        return Err(e.into());
    }

    // Persist the rename itself
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Ok(dir) = fs::File::open(parent).await {
                if let Err(e) = dir.sync_all().await {
                    warn!("syncing {}: {}", parent.display(), e);
                }
            }
        }
    }

    Ok(())
}

/// Borrowed twin of `Snapshot` for writing without cloning.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    next_id: RecordId,
    records: &'a [BackupRecord],
}

impl RecordStore for JsonStore {
    async fn insert(&mut self, record: NewRecord) -> Result<BackupRecord, StoreError> {
        let now = Utc::now();
        let record = BackupRecord {
            id: self.next_id,
            device_id: record.device_id,
            config: record.config,
            created: now,
            last_checked: now,
            last_status: record.last_status,
            status: record.status,
            collection_mode: record.collection_mode,
        };

        self.next_id += 1;
        self.records.push(record.clone());
        if let Err(e) = self.persist().await {
            self.records.pop();
            self.next_id -= 1;
            return Err(e);
        }

        self.refresh_status(record.device_id);
        Ok(record)
    }

    async fn update(&mut self, record: &BackupRecord) -> Result<(), StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == record.id && r.device_id == record.device_id)
            .ok_or(StoreError::RecordNotFound(record.id))?;

        let previous = self.records[index].clone();
        let existing = &mut self.records[index];
        existing.config = record.config.clone();
        existing.last_checked = record.last_checked;
        existing.last_status = record.last_status.clone();
        existing.status = record.status.clone();
        existing.collection_mode = record.collection_mode;

        if let Err(e) = self.persist().await {
            self.records[index] = previous;
            return Err(e);
        }

        self.refresh_status(record.device_id);
        Ok(())
    }

    async fn delete(&mut self, ids: &[RecordId]) -> Result<usize, StoreError> {
        let ids: HashSet<RecordId> = ids.iter().copied().collect();
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| ids.contains(&r.id));
        self.records = kept;

        if removed.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.persist().await {
            self.records.extend(removed);
            return Err(e);
        }

        let touched: BTreeSet<DeviceId> = removed.iter().map(|r| r.device_id).collect();
        for device in touched {
            self.refresh_status(device);
        }
        Ok(removed.len())
    }

    fn get(&self, id: RecordId) -> Option<BackupRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    fn records(&self, device: DeviceId) -> Vec<BackupRecord> {
        Self::sorted_newest_first(
            self.records
                .iter()
                .filter(|r| r.device_id == device)
                .cloned()
                .collect(),
        )
    }

    fn device_ids(&self) -> Vec<DeviceId> {
        self.records
            .iter()
            .map(|r| r.device_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn device_status(&self, device: DeviceId) -> DeviceBackupStatus {
        self.statuses
            .get(&device)
            .copied()
            .unwrap_or(DeviceBackupStatus::Disabled)
    }
}
