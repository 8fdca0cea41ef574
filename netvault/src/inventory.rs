//! Device directory.
//!
//! The backup engine only reads devices: their address, manufacturer and
//! operational status. [`DeviceDirectory`] is that contract; [`Inventory`]
//! implements it over a JSON file.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Device identifier as used by the directory.
pub type DeviceId = u64;

/// Operational status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Offline,
    Planned,
    Decommissioning,
    #[serde(other)]
    Other,
}

/// A network device as seen by the backup engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(default)]
    pub primary_ip: Option<String>,
    #[serde(default)]
    pub oob_ip: Option<String>,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub status: DeviceStatus,
}

impl Device {
    pub fn new(id: DeviceId, name: impl Into<String>, manufacturer: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            primary_ip: None,
            oob_ip: None,
            manufacturer: manufacturer.into(),
            status: DeviceStatus::Active,
        }
    }

    /// Set the primary address.
    pub fn with_primary_ip(mut self, ip: impl Into<String>) -> Self {
        self.primary_ip = Some(ip.into());
        self
    }

    /// Set the out-of-band address.
    pub fn with_oob_ip(mut self, ip: impl Into<String>) -> Self {
        self.oob_ip = Some(ip.into());
        self
    }

    /// Set the operational status.
    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// Reachable address: primary first, then out-of-band.
    ///
    /// Addresses in CIDR notation resolve to their host part.
    pub fn address(&self) -> Option<&str> {
        [self.primary_ip.as_deref(), self.oob_ip.as_deref()]
            .into_iter()
            .flatten()
            .map(|ip| ip.split('/').next().unwrap_or(ip).trim())
            .find(|ip| !ip.is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }
}

/// Read-only source of devices.
pub trait DeviceDirectory: Send + Sync {
    /// Every known device.
    fn devices(&self) -> Vec<Device>;

    /// Look up a device by id.
    fn device(&self, id: DeviceId) -> Option<Device>;

    /// Devices eligible for scheduled collection.
    fn active_devices(&self) -> Vec<Device> {
        self.devices().into_iter().filter(Device::is_active).collect()
    }

    /// Look up a device by numeric id or by name.
    fn find(&self, key: &str) -> Option<Device> {
        if let Ok(id) = key.parse::<DeviceId>() {
            if let Some(device) = self.device(id) {
                return Some(device);
            }
        }
        self.devices().into_iter().find(|d| d.name == key)
    }
}

/// In-memory device directory, optionally loaded from a JSON array.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: IndexMap<DeviceId, Device>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load devices from a JSON file containing an array of devices.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse devices from a JSON array.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let devices: Vec<Device> = serde_json::from_str(content)?;
        Ok(devices.into_iter().collect())
    }

    /// Add or replace a device.
    pub fn insert(&mut self, device: Device) {
        self.devices.insert(device.id, device);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<Device> for Inventory {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        Self {
            devices: iter.into_iter().map(|d| (d.id, d)).collect(),
        }
    }
}

impl DeviceDirectory for Inventory {
    fn devices(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }

    fn device(&self, id: DeviceId) -> Option<Device> {
        self.devices.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_prefers_primary() {
        let device = Device::new(1, "r1", "Cisco")
            .with_primary_ip("10.0.0.1/24")
            .with_oob_ip("192.168.0.1/24");
        assert_eq!(device.address(), Some("10.0.0.1"));
    }

    #[test]
    fn test_address_falls_back_to_oob() {
        let device = Device::new(1, "r1", "Cisco").with_oob_ip("192.168.0.1");
        assert_eq!(device.address(), Some("192.168.0.1"));
        assert_eq!(Device::new(2, "r2", "Cisco").address(), None);
    }

    #[test]
    fn test_load_from_json() {
        let inventory = Inventory::from_json(
            r#"[
                {"id": 1, "name": "core-sw1", "primary_ip": "10.0.0.1/24",
                 "manufacturer": "Cisco Systems", "status": "active"},
                {"id": 2, "name": "hw-agg", "oob_ip": "10.1.0.2",
                 "manufacturer": "Huawei", "status": "offline"},
                {"id": 3, "name": "lab", "manufacturer": "Depo", "status": "inventory"}
            ]"#,
        )
        .unwrap();

        assert_eq!(inventory.len(), 3);
        assert_eq!(inventory.device(3).unwrap().status, DeviceStatus::Other);

        let active: Vec<_> = inventory.active_devices().into_iter().map(|d| d.id).collect();
        assert_eq!(active, vec![1]);

        assert_eq!(inventory.find("hw-agg").unwrap().id, 2);
        assert_eq!(inventory.find("1").unwrap().name, "core-sw1");
        assert!(inventory.find("missing").is_none());
    }
}
