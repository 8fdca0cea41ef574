//! # Netvault
//!
//! Multi-vendor network device configuration backup over interactive SSH.
//!
//! Netvault logs into switches and routers, disables paging, dumps the
//! running configuration, cleans vendor noise out of it and keeps a
//! versioned history per device with change-only deduplication.
//!
//! ## Features
//!
//! - Async SSH sessions via russh with prompt-aware command completion
//! - Vendor profiles for Huawei, Mellanox, Depo and Cisco-style devices
//! - Manual, enabled and disabled backup lifecycle per device
//! - Scheduled fleet collection with bounded concurrency
//! - Count-based retention and side-by-side diffs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netvault::{BackupManager, Credentials, Device, JsonStore, SshCapturer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netvault::Error> {
//!     let capturer = SshCapturer::new(Credentials::new("backup", "secret"));
//!     let store = JsonStore::open("backups.json").await?;
//!     let manager = BackupManager::new(store, capturer);
//!
//!     let device = Device::new(1, "core-sw1", "Cisco").with_primary_ip("10.0.0.1");
//!     let record = manager.collect_manual(&device).await?;
//!     println!("{}", record.config);
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod channel;
pub mod collector;
pub mod config;
pub mod diff;
pub mod error;
pub mod inventory;
pub mod manager;
pub mod normalize;
pub mod platform;
pub mod retention;
pub mod session;
pub mod store;
pub mod transport;

// Re-export main types for convenience
pub use capture::{ConfigCapturer, SshCapturer};
pub use collector::{FleetCollector, FleetReport};
pub use config::Credentials;
pub use diff::{DiffLine, DiffLineTag};
pub use error::{Error, Result};
pub use inventory::{Device, DeviceDirectory, DeviceId, Inventory};
pub use manager::{BackupManager, EnableOutcome, ScheduledOutcome, SkipReason};
pub use platform::{Vendor, VendorProfile};
pub use retention::{RetentionPolicy, RetentionReport};
pub use session::{Response, Session, SessionConfig};
pub use store::{
    BackupRecord, BackupStatus, CollectionMode, DeviceBackupStatus, JsonStore, RecordId,
    RecordStore,
};
pub use transport::{HostKeyVerification, SshConfig};
