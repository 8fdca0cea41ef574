//! Fleet-wide scheduled collection.

use futures_util::stream::{self, StreamExt};
use log::{error, info};

use crate::capture::ConfigCapturer;
use crate::error::Error;
use crate::inventory::DeviceDirectory;
use crate::manager::{BackupManager, ScheduledOutcome};
use crate::store::RecordStore;

/// Devices processed at once when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Totals of one scheduled run.
#[derive(Debug, Default)]
pub struct FleetReport {
    pub saved: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Devices whose run hit a store error, with the error.
    pub errors: Vec<(String, Error)>,
}

impl FleetReport {
    /// Devices looked at, including skipped ones.
    pub fn total(&self) -> usize {
        self.saved + self.unchanged + self.failed + self.skipped + self.errors.len()
    }
}

/// Runs scheduled collection across every active device.
///
/// A failing device never stops the run: its failure is recorded on the
/// device and the run moves on.
#[derive(Debug, Clone)]
pub struct FleetCollector {
    concurrency: usize,
}

impl Default for FleetCollector {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl FleetCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how many devices are collected concurrently (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run<S, C, D>(&self, manager: &BackupManager<S, C>, directory: &D) -> FleetReport
    where
        S: RecordStore,
        C: ConfigCapturer,
        D: DeviceDirectory + ?Sized,
    {
        let devices = directory.active_devices();
        info!(
            "scheduled backup of {} active devices ({} at a time)",
            devices.len(),
            self.concurrency
        );

        let mut results = stream::iter(devices)
            .map(|device| async move {
                let outcome = manager.collect_scheduled(&device).await;
                (device, outcome)
            })
            .buffer_unordered(self.concurrency);

        let mut report = FleetReport::default();
        while let Some((device, outcome)) = results.next().await {
            match outcome {
                Ok(ScheduledOutcome::Saved(_)) => report.saved += 1,
                Ok(ScheduledOutcome::Unchanged) => report.unchanged += 1,
                Ok(ScheduledOutcome::Failed(_)) => report.failed += 1,
                Ok(ScheduledOutcome::Skipped(_)) => report.skipped += 1,
                Err(e) => {
                    error!("{}: scheduled backup aborted: {}", device.name, e);
                    report.errors.push((device.name, e));
                }
            }
        }

        info!(
            "scheduled backup done: {} saved, {} unchanged, {} failed, {} skipped, {} errors",
            report.saved,
            report.unchanged,
            report.failed,
            report.skipped,
            report.errors.len()
        );
        report
    }
}
