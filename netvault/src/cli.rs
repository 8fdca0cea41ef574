//! Command-line interface for netvault.
//!
//! Each subcommand maps onto one backup lifecycle operation against the
//! JSON inventory and record store.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::warn;

use netvault::config::{PASSWORD_ENV, USER_ENV};
use netvault::error::ConfigError;
use netvault::{
    BackupManager, BackupRecord, Credentials, Device, DeviceDirectory, DiffLine, EnableOutcome,
    Error, FleetCollector, HostKeyVerification, Inventory, JsonStore, RecordId, Result,
    RetentionPolicy, SessionConfig, SshCapturer,
};

/// netvault - network device configuration backup
#[derive(Parser, Debug)]
#[command(name = "netvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Device inventory (JSON array of devices)
    #[arg(long, global = true, value_name = "PATH", env = "NETVAULT_INVENTORY", default_value = "inventory.json")]
    pub inventory: PathBuf,

    /// Backup record store
    #[arg(long, global = true, value_name = "PATH", env = "NETVAULT_STORE", default_value = "backups.json")]
    pub store: PathBuf,

    /// Device login name
    #[arg(long, global = true, env = USER_ENV)]
    pub user: Option<String>,

    /// Device login password
    #[arg(long, global = true, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    /// SSH host key checking
    #[arg(long, global = true, value_enum, default_value_t = HostKeyVerification::AcceptNew)]
    pub host_key_check: HostKeyVerification,

    /// SSH connect and login timeout
    #[arg(long, global = true, value_name = "SECS", default_value_t = 15)]
    pub connect_timeout: u64,

    /// Timeout for pager and privilege commands
    #[arg(long, global = true, value_name = "SECS", default_value_t = 30)]
    pub command_timeout: u64,

    /// Timeout for the configuration dump
    #[arg(long, global = true, value_name = "SECS", default_value_t = 120)]
    pub dump_timeout: u64,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Collect every device under automatic backup
    CollectScheduled {
        /// Devices collected at once
        #[arg(long, default_value_t = netvault::collector::DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Prune old backups of devices with too many records
    Cleanup {
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,

        /// Records kept per device once pruning triggers
        #[arg(long, default_value_t = 3)]
        keep: usize,

        /// Record count above which a device is pruned
        #[arg(long, default_value_t = 15)]
        threshold: usize,
    },

    /// Capture a device's configuration once
    Collect {
        /// Device id or name
        device: String,
    },

    /// Put a device under automatic backup
    Enable {
        /// Device id or name
        device: String,
    },

    /// Take a device out of automatic backup
    Disable {
        /// Device id or name
        device: String,

        /// Who is disabling it
        #[arg(long, env = "USER", default_value = "operator")]
        actor: String,
    },

    /// List a device's backups, newest first
    List {
        /// Device id or name
        device: String,
    },

    /// Print one backup's configuration
    Show {
        record: RecordId,
    },

    /// Delete selected backups of a device
    Delete {
        /// Device id or name
        device: String,

        records: Vec<RecordId>,
    },

    /// Compare two backups side by side
    Diff {
        records: Vec<RecordId>,
    },
}

impl Command {
    fn needs_credentials(&self) -> bool {
        matches!(
            self,
            Command::CollectScheduled { .. } | Command::Collect { .. } | Command::Enable { .. }
        )
    }
}

impl Cli {
    /// Device credentials; both halves must be present.
    pub fn credentials(&self) -> std::result::Result<Credentials, ConfigError> {
        let user = self.user.as_deref().ok_or(ConfigError::MissingEnv(USER_ENV))?;
        let password = self
            .password
            .as_deref()
            .ok_or(ConfigError::MissingEnv(PASSWORD_ENV))?;
        Ok(Credentials::new(user, password))
    }

    /// Session timing from the timeout flags.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            command_timeout: Duration::from_secs(self.command_timeout),
            dump_timeout: Duration::from_secs(self.dump_timeout),
            ..SessionConfig::default()
        }
    }
}

/// Execute the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let credentials = if cli.command.needs_credentials() {
        cli.credentials()?
    } else {
        Credentials::new(cli.user.clone().unwrap_or_default(), "")
    };

    let inventory = if cli.inventory.exists() || cli.command.needs_credentials() {
        Inventory::load(&cli.inventory)?
    } else {
        Inventory::new()
    };
    let store = JsonStore::open(&cli.store).await?;
    let capturer = SshCapturer::new(credentials)
        .host_key_verification(cli.host_key_check)
        .connect_timeout(Duration::from_secs(cli.connect_timeout))
        .session_config(cli.session_config());
    let manager = BackupManager::new(store, capturer);

    match cli.command {
        Command::CollectScheduled { concurrency } => {
            let report = FleetCollector::new()
                .with_concurrency(concurrency)
                .run(&manager, &inventory)
                .await;
            println!(
                "{} saved, {} unchanged, {} failed, {} skipped",
                report.saved, report.unchanged, report.failed, report.skipped
            );
            for (device, e) in &report.errors {
                println!("{device}: {e}");
            }
        }

        Command::Cleanup {
            dry_run,
            keep,
            threshold,
        } => {
            let policy = RetentionPolicy::new(keep, threshold).with_dry_run(dry_run);
            let report = manager.prune_all(&policy).await?;
            if report.dry_run {
                println!("TOTAL WOULD DELETE: {} backups", report.deleted);
            } else {
                println!("TOTAL DELETED: {} backups", report.deleted);
            }
        }

        Command::Collect { device } => {
            let device = find_device(&inventory, &device)?;
            let record = manager.collect_manual(&device).await?;
            println!("{}: backup {} collected", device.name, record.id);
        }

        Command::Enable { device } => {
            let device = find_device(&inventory, &device)?;
            match manager.enable(&device).await? {
                EnableOutcome::Upgraded(record) | EnableOutcome::Captured(record) => {
                    println!("{}: automatic backup enabled (record {})", device.name, record.id);
                }
                EnableOutcome::CaptureFailed { record, reason } => {
                    println!("{}: automatic backup enabled (record {})", device.name, record.id);
                    return Err(Error::CaptureFailed {
                        device: device.name,
                        reason,
                    });
                }
            }
        }

        Command::Disable { device, actor } => {
            let device = find_device(&inventory, &device)?;
            manager.disable(&device, &actor).await?;
            println!("{}: automatic backup disabled", device.name);
        }

        Command::List { device } => {
            let id = device_id(&inventory, &device)?;
            println!("backup status: {}", manager.device_status(id).await);
            for record in manager.records(id).await {
                println!("{}", list_row(&record));
            }
        }

        Command::Show { record } => {
            let record = manager.record(record).await?;
            println!("{}", record.config);
        }

        Command::Delete { device, records } => {
            if records.is_empty() {
                warn!("no backups selected for deletion");
                return Ok(());
            }
            let id = device_id(&inventory, &device)?;
            let deleted = manager.delete_records(id, &records).await?;
            println!("deleted {deleted} backup(s)");
        }

        Command::Diff { records } => {
            for line in manager.diff(&records).await? {
                println!("{}", diff_row(&line));
            }
        }
    }

    Ok(())
}

fn find_device(inventory: &Inventory, key: &str) -> Result<Device> {
    inventory
        .find(key)
        .ok_or_else(|| Error::DeviceNotFound(key.to_string()))
}

/// Device id for record-only commands; a bare numeric id works without an inventory entry.
fn device_id(inventory: &Inventory, key: &str) -> Result<u64> {
    match inventory.find(key) {
        Some(device) => Ok(device.id),
        None => key
            .parse()
            .map_err(|_| Error::DeviceNotFound(key.to_string())),
    }
}

fn list_row(record: &BackupRecord) -> String {
    format!(
        "{:>6}  {}  {:<16}  {:<6}  {}",
        record.id,
        record.created.format("%Y-%m-%d %H:%M:%S"),
        record.status.to_string(),
        record.collection_mode.to_string(),
        record.last_status
    )
}

fn diff_row(line: &DiffLine) -> String {
    let number = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_default();
    let marker = match line.tag {
        netvault::DiffLineTag::Equal => ' ',
        netvault::DiffLineTag::Insert => '+',
        netvault::DiffLineTag::Delete => '-',
        netvault::DiffLineTag::Replace => '|',
    };
    format!(
        "{:>5} {:<60} {} {:>5} {}",
        number(line.left_no),
        line.left.as_deref().unwrap_or(""),
        marker,
        number(line.right_no),
        line.right.as_deref().unwrap_or("")
    )
}
