//! Background thermal frame collector.
//!
//! [`ScanCycle`] runs one discovery pass and writes what it found into the
//! store. [`ScanScheduler`] repeats cycles with a fixed pause between them
//! until cancelled or until the BLE transport is gone for good.
//! [`Collector`] opens the adapter and spawns the scheduler.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use grideye_core::{BleDiscovery, DiscoveredDevice, Discovery, parse_advertisement};
use grideye_types::{DeviceRecord, format_manufacturer_id, now_millis};

use crate::config::ScannerConfig;
use crate::state::{AppState, SchedulerPhase};

/// Outcome of one scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Devices returned by discovery.
    pub discovered: usize,
    /// Devices advertising under the recognized manufacturer ID.
    pub matched: usize,
    /// Records written to the store.
    pub updated: usize,
    /// Matched devices skipped because their advertisement was unusable.
    pub failed: usize,
    /// Timestamp shared by every record written in the cycle.
    pub captured_at: OffsetDateTime,
}

impl CycleReport {
    fn new(discovered: usize, captured_at: OffsetDateTime) -> Self {
        Self {
            discovered,
            matched: 0,
            updated: 0,
            failed: 0,
            captured_at,
        }
    }
}

/// One discovery pass applied to the store.
pub struct ScanCycle {
    state: Arc<AppState>,
    manufacturer_id: u16,
    scan_duration: Duration,
}

impl ScanCycle {
    /// Create a cycle writing into `state.store`.
    pub fn new(state: Arc<AppState>, manufacturer_id: u16, scan_duration: Duration) -> Self {
        Self {
            state,
            manufacturer_id,
            scan_duration,
        }
    }

    /// Create a cycle from scanner settings.
    pub fn from_config(state: Arc<AppState>, config: &ScannerConfig) -> Self {
        Self::new(state, config.manufacturer_id, config.scan_duration())
    }

    /// Discover devices and store every thermal frame found.
    ///
    /// A discovery failure returns before the store is touched.
    pub async fn run(&self, discovery: &dyn Discovery) -> Result<CycleReport, CollectorError> {
        let devices = discovery
            .discover(self.scan_duration)
            .await
            .map_err(CollectorError::Discovery)?;

        Ok(self.apply(&devices, now_millis()))
    }

    /// Store the frames carried by `devices`, all stamped `captured_at`.
    ///
    /// Devices are handled one at a time; a device that cannot be turned
    /// into a record is logged and skipped.
    pub fn apply(&self, devices: &[DiscoveredDevice], captured_at: OffsetDateTime) -> CycleReport {
        let mut report = CycleReport::new(devices.len(), captured_at);

        for device in devices {
            match parse_advertisement(device, self.manufacturer_id) {
                Ok(Some(adv)) => {
                    report.matched += 1;
                    let record =
                        DeviceRecord::new(adv.address.clone(), adv.name, captured_at, adv.frame);
                    self.state.store.upsert(adv.address, record);
                    report.updated += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    report.matched += 1;
                    report.failed += 1;
                    warn!("Skipping device: {}", e);
                }
            }
        }

        report
    }
}

/// Repeats [`ScanCycle`] on a fixed interval.
pub struct ScanScheduler {
    state: Arc<AppState>,
    discovery: Arc<dyn Discovery>,
    cycle: ScanCycle,
    interval: Duration,
    expire_after: Option<Duration>,
}

impl ScanScheduler {
    /// Create a scheduler using the scanner settings in `state.config`.
    pub fn new(state: Arc<AppState>, discovery: Arc<dyn Discovery>) -> Self {
        let config = state.config.scanner.clone();
        Self {
            cycle: ScanCycle::from_config(Arc::clone(&state), &config),
            state,
            discovery,
            interval: config.interval(),
            expire_after: config.expire_after(),
        }
    }

    /// Run cycles until `cancel` fires or a fatal error occurs.
    ///
    /// Returns `Ok(())` on cancellation and the fatal error otherwise.
    /// Recoverable failures are logged and the next cycle runs after the
    /// usual pause.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), CollectorError> {
        let status = &self.state.scheduler;
        status.mark_started();
        info!(
            "Scanner started (backend: {}, interval: {}s, manufacturer: {})",
            self.discovery.backend(),
            self.interval.as_secs(),
            format_manufacturer_id(self.cycle.manufacturer_id)
        );

        let mut consecutive_failures = 0u32;
        let outcome = loop {
            status.set_phase(SchedulerPhase::Scanning);
            let result = tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                result = self.cycle.run(self.discovery.as_ref()) => result,
            };
            status.set_phase(SchedulerPhase::Idle);

            match result {
                Ok(report) => {
                    consecutive_failures = 0;
                    debug!(
                        "Scan cycle: {} seen, {} matched, {} updated, {} failed",
                        report.discovered, report.matched, report.updated, report.failed
                    );
                    status.record_cycle(&report);
                    self.expire(report.captured_at);
                }
                Err(e) if e.is_fatal() => {
                    error!("Scanner stopping: {}", e);
                    status.record_failure(&e);
                    break Err(e);
                }
                Err(e) => {
                    consecutive_failures += 1;
                    status.record_failure(&e);
                    if consecutive_failures <= 3 {
                        warn!("{} (attempt {})", e, consecutive_failures);
                    } else if consecutive_failures == 4 {
                        error!(
                            "Scan failed {} times in a row, will continue trying silently",
                            consecutive_failures
                        );
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        status.set_phase(SchedulerPhase::Stopped);
        if outcome.is_ok() {
            info!("Scanner stopped");
        }
        outcome
    }

    fn expire(&self, now: OffsetDateTime) {
        let Some(max_age) = self.expire_after else {
            return;
        };
        let Some(cutoff) = time::Duration::try_from(max_age)
            .ok()
            .and_then(|age| now.checked_sub(age))
        else {
            debug!("Expiry age {}s reaches past the calendar, nothing to prune", max_age.as_secs());
            return;
        };
        let removed = self.state.store.prune_older_than(cutoff);
        if removed > 0 {
            info!("Expired {} device(s) not seen for {}s", removed, max_age.as_secs());
        }
    }
}

/// Background collector that owns the BLE scanner task.
pub struct Collector {
    state: Arc<AppState>,
}

impl Collector {
    /// Create a new collector.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Open the Bluetooth adapter and start scanning in the background.
    ///
    /// Returns immediately. If no adapter can be opened the error is logged,
    /// the store stays as it is, and HTTP reads keep working.
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let discovery = match BleDiscovery::new().await {
                Ok(discovery) => discovery,
                Err(e) => {
                    let e = CollectorError::Adapter(e);
                    error!("Scanner not started: {}", e);
                    state.scheduler.record_failure(&e);
                    return;
                }
            };
            // Fatal errors are logged by the scheduler itself.
            let _ = ScanScheduler::new(state, Arc::new(discovery))
                .run(cancel)
                .await;
        })
    }
}

/// Collector errors.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to open Bluetooth adapter: {0}")]
    Adapter(grideye_core::Error),
    #[error("Scan cycle failed: {0}")]
    Discovery(grideye_core::Error),
}

impl CollectorError {
    /// Whether the scanner cannot continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Adapter(_) => true,
            Self::Discovery(e) => e.is_fatal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use grideye_core::{MockDiscovery, MockOutcome};
    use grideye_types::{GRID_EYE_MANUFACTURER_ID, ThermalFrame};
    use time::macros::datetime;

    use crate::config::Config;

    fn sensor(address: &str, name: &str, frame: &[u8]) -> DiscoveredDevice {
        DiscoveredDevice::new(address)
            .with_name(name)
            .with_manufacturer_data(GRID_EYE_MANUFACTURER_ID, frame.to_vec())
    }

    fn state_with_interval(interval_secs: u64) -> Arc<AppState> {
        let mut config = Config::default();
        config.scanner.interval_secs = interval_secs;
        AppState::new(config)
    }

    fn cycle(state: &Arc<AppState>) -> ScanCycle {
        ScanCycle::new(
            Arc::clone(state),
            GRID_EYE_MANUFACTURER_ID,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_apply_stores_matching_devices() {
        let state = AppState::new(Config::default());
        let at = datetime!(2024-01-01 00:00:00.123 UTC);

        let report = cycle(&state).apply(
            &[sensor("AA:BB", "s1", &[1, 2, 3]), sensor("CC:DD", "s2", &[])],
            at,
        );

        assert_eq!(report.discovered, 2);
        assert_eq!(report.matched, 2);
        assert_eq!(report.updated, 2);
        assert_eq!(report.failed, 0);

        let record = state.store.get("AA:BB").unwrap();
        assert_eq!(record.name.as_deref(), Some("s1"));
        assert_eq!(record.thermal_data.samples(), &[1, 2, 3]);
        assert_eq!(record.timestamp, at);
        assert!(state.store.get("CC:DD").unwrap().thermal_data.is_empty());
    }

    #[test]
    fn test_apply_ignores_other_manufacturers() {
        let state = AppState::new(Config::default());
        let other = DiscoveredDevice::new("11:22")
            .with_name("headphones")
            .with_manufacturer_data(0x004C, vec![1, 2]);
        let plain = DiscoveredDevice::new("33:44");

        let report = cycle(&state).apply(&[other, plain], now_millis());

        assert_eq!(report.discovered, 2);
        assert_eq!(report.matched, 0);
        assert_eq!(report.failed, 0);
        assert!(state.store.is_empty());
    }

    #[test]
    fn test_bad_device_does_not_block_others() {
        let state = AppState::new(Config::default());
        let broken = sensor("", "nameless", &[9, 9]);
        let good = sensor("AA:BB", "s1", &[4, 5]);

        let report = cycle(&state).apply(&[broken, good], now_millis());

        assert_eq!(report.matched, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(state.store.len(), 1);
        assert_eq!(state.store.get("AA:BB").unwrap().thermal_data.samples(), &[4, 5]);
    }

    #[test]
    fn test_records_in_one_cycle_share_timestamp() {
        let state = AppState::new(Config::default());
        let at = datetime!(2024-06-01 12:30:45.678 UTC);

        cycle(&state).apply(
            &[
                sensor("A", "a", &[1]),
                sensor("B", "b", &[2]),
                sensor("C", "c", &[3]),
            ],
            at,
        );

        let snapshot = state.store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.values().all(|r| r.timestamp == at));
    }

    #[test]
    fn test_configured_manufacturer_id() {
        let state = AppState::new(Config::default());
        let custom = ScanCycle::new(Arc::clone(&state), 0x0059, Duration::from_secs(1));
        let device = DiscoveredDevice::new("AA").with_manufacturer_data(0x0059, vec![7]);

        custom.apply(&[device, sensor("BB", "default-id", &[1])], now_millis());

        assert!(state.store.get("AA").is_some());
        assert!(state.store.get("BB").is_none());
    }

    #[tokio::test]
    async fn test_run_failure_leaves_store_unchanged() {
        let state = AppState::new(Config::default());
        state.store.upsert(
            "AA:BB",
            DeviceRecord::new("AA:BB", None, now_millis(), ThermalFrame::from(vec![1u8])),
        );
        let before = state.store.snapshot();

        let discovery = MockDiscovery::new().with_failure("adapter busy");
        let err = cycle(&state).run(&discovery).await.unwrap_err();

        assert!(!err.is_fatal());
        assert!(err.to_string().contains("adapter busy"));
        assert_eq!(state.store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_run_reports_cycle() {
        let state = AppState::new(Config::default());
        let discovery = MockDiscovery::new().with_devices(vec![sensor("AA:BB", "s1", &[1])]);

        let report = cycle(&state).run(&discovery).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(
            state.store.get("AA:BB").unwrap().timestamp,
            report.captured_at
        );
        assert_eq!(report.captured_at.nanosecond() % 1_000_000, 0);
    }

    #[tokio::test]
    async fn test_device_missing_from_later_pass_keeps_old_timestamp() {
        let state = AppState::new(Config::default());
        let discovery = MockDiscovery::new()
            .with_devices(vec![sensor("AA:BB", "s1", &[1]), sensor("CC:DD", "s2", &[2])])
            .with_devices(vec![sensor("CC:DD", "s2", &[3])]);

        let first = cycle(&state).run(&discovery).await.unwrap();
        let second = cycle(&state).run(&discovery).await.unwrap();
        assert_eq!(second.discovered, 1);

        let gone = state.store.get("AA:BB").unwrap();
        assert_eq!(gone.timestamp, first.captured_at);
        assert_eq!(gone.thermal_data.samples(), &[1]);

        let heard = state.store.get("CC:DD").unwrap();
        assert_eq!(heard.timestamp, second.captured_at);
        assert_eq!(heard.thermal_data.samples(), &[3]);
    }

    #[test]
    fn test_unheard_device_ages_out() {
        let state = AppState::new(Config::default());
        let first = datetime!(2024-01-01 00:00:00 UTC);
        let later = datetime!(2024-01-01 00:05:00 UTC);

        cycle(&state).apply(
            &[sensor("AA:BB", "s1", &[1]), sensor("CC:DD", "s2", &[2])],
            first,
        );
        cycle(&state).apply(&[sensor("CC:DD", "s2", &[3])], later);

        assert_eq!(state.store.get("AA:BB").unwrap().timestamp, first);
        assert_eq!(
            state
                .store
                .prune_older_than(later - time::Duration::minutes(1)),
            1
        );
        assert!(state.store.get("AA:BB").is_none());
        assert_eq!(state.store.get("CC:DD").unwrap().timestamp, later);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_continues_after_failure() {
        let state = state_with_interval(5);
        let discovery = Arc::new(
            MockDiscovery::new()
                .with_failure("adapter busy")
                .with_devices(vec![sensor("AA:BB", "s1", &[1, 2, 3])]),
        );
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            ScanScheduler::new(Arc::clone(&state), discovery.clone()).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(discovery.call_count() >= 2);
        assert!(state.store.get("AA:BB").is_some());

        let report = state.scheduler.report();
        assert_eq!(report.cycles_failed, 1);
        assert!(report.cycles_completed >= 1);
        assert_eq!(
            report.last_error.as_deref(),
            Some("Scan cycle failed: Discovery failed: adapter busy")
        );

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(state.scheduler.phase(), SchedulerPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_waits_interval_between_cycles() {
        let state = state_with_interval(10);
        let discovery = Arc::new(MockDiscovery::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            ScanScheduler::new(Arc::clone(&state), discovery.clone()).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(discovery.call_count(), 1);
        assert_eq!(state.scheduler.phase(), SchedulerPhase::Idle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(discovery.call_count(), 2);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_interval_not_compensated_for_scan_time() {
        let state = state_with_interval(5);
        let discovery = Arc::new(MockDiscovery::new().with_latency(Duration::from_secs(3)));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            ScanScheduler::new(Arc::clone(&state), discovery.clone()).run(cancel.clone()),
        );

        // Cycles start at 0s and 8s (3s scan + 5s pause).
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(discovery.call_count(), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(discovery.call_count(), 2);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_stops_on_fatal_error() {
        let state = state_with_interval(5);
        state.store.upsert(
            "AA:BB",
            DeviceRecord::new("AA:BB", None, now_millis(), ThermalFrame::from(vec![1u8])),
        );
        let discovery = Arc::new(MockDiscovery::new().with_unavailable("adapter removed"));

        let result = ScanScheduler::new(Arc::clone(&state), discovery.clone())
            .run(CancellationToken::new())
            .await;

        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(discovery.call_count(), 1);
        assert_eq!(state.scheduler.phase(), SchedulerPhase::Stopped);
        assert_eq!(state.store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_cancelled_during_discovery() {
        let state = state_with_interval(5);
        let discovery = Arc::new(MockDiscovery::new().with_latency(Duration::from_secs(60)));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            ScanScheduler::new(Arc::clone(&state), discovery.clone()).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.scheduler.phase(), SchedulerPhase::Scanning);

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(state.scheduler.phase(), SchedulerPhase::Stopped);
        assert_eq!(state.scheduler.report().cycles_completed, 0);
        assert_eq!(discovery.abandoned_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_expires_stale_devices() {
        let mut config = Config::default();
        config.scanner.expire_after_secs = Some(60);
        let state = AppState::new(config);

        let stale_at = now_millis() - time::Duration::minutes(10);
        state
            .store
            .upsert("OLD", DeviceRecord::new("OLD", None, stale_at, ThermalFrame::from(vec![1u8])));

        let discovery =
            Arc::new(MockDiscovery::new().with_fallback(MockOutcome::Devices(vec![sensor(
                "NEW", "s1", &[2],
            )])));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            ScanScheduler::new(Arc::clone(&state), discovery).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(state.store.get("OLD").is_none());
        assert!(state.store.get("NEW").is_some());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_survives_unrepresentable_expiry_age() {
        let mut config = Config::default();
        config.scanner.interval_secs = 1;
        config.scanner.expire_after_secs = Some(u64::MAX);
        let state = AppState::new(config);
        state.store.upsert(
            "OLD",
            DeviceRecord::new(
                "OLD",
                None,
                now_millis() - time::Duration::days(30),
                ThermalFrame::from(vec![1u8]),
            ),
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            ScanScheduler::new(Arc::clone(&state), Arc::new(MockDiscovery::new()))
                .run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(state.store.get("OLD").is_some());
        assert!(state.scheduler.report().cycles_completed >= 2);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_keeps_devices_without_expiry() {
        let state = state_with_interval(5);
        let stale_at = now_millis() - time::Duration::days(30);
        state
            .store
            .upsert("OLD", DeviceRecord::new("OLD", None, stale_at, ThermalFrame::from(vec![1u8])));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            ScanScheduler::new(Arc::clone(&state), Arc::new(MockDiscovery::new()))
                .run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(state.store.get("OLD").is_some());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn test_collector_error_classification() {
        let adapter = CollectorError::Adapter(grideye_core::Error::unavailable("none"));
        assert!(adapter.is_fatal());
        assert!(adapter.to_string().contains("Failed to open Bluetooth adapter"));

        let transient = CollectorError::Discovery(grideye_core::Error::Transport("busy".into()));
        assert!(!transient.is_fatal());

        let gone = CollectorError::Discovery(grideye_core::Error::unavailable("removed"));
        assert!(gone.is_fatal());
    }
}
