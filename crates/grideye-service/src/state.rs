//! Application state shared across handlers.
//!
//! The scanner task writes to [`AppState::store`] and [`AppState::scheduler`];
//! HTTP handlers only read them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use time::OffsetDateTime;

use crate::collector::CycleReport;
use crate::config::Config;
use crate::store::SnapshotStore;

/// Shared application state.
pub struct AppState {
    /// Latest reading per device.
    pub store: SnapshotStore,
    /// Configuration the process was started with.
    pub config: Config,
    /// What the background scanner is doing.
    pub scheduler: SchedulerStatus,
}

impl AppState {
    /// Create application state with an empty store.
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            store: SnapshotStore::new(),
            config,
            scheduler: SchedulerStatus::new(),
        })
    }
}

/// Scanner lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SchedulerPhase {
    /// Waiting for the next cycle.
    Idle = 0,
    /// A discovery pass is in progress.
    Scanning = 1,
    /// Not running: never started, cancelled, or stopped by a fatal error.
    Stopped = 2,
}

impl SchedulerPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Scanning,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug, Default)]
struct LastCycle {
    completed_at: Option<OffsetDateTime>,
    devices_updated: usize,
    error: Option<String>,
}

/// Scanner status published for the status endpoint.
pub struct SchedulerStatus {
    phase: AtomicU8,
    /// When the scanner was started (Unix timestamp).
    started_at: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    devices_failed: AtomicU64,
    last: Mutex<LastCycle>,
}

impl SchedulerStatus {
    /// Create a status for a scanner that has not started.
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(SchedulerPhase::Stopped as u8),
            started_at: AtomicU64::new(0),
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            devices_failed: AtomicU64::new(0),
            last: Mutex::new(LastCycle::default()),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SchedulerPhase {
        SchedulerPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Move to `phase`.
    pub fn set_phase(&self, phase: SchedulerPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Mark the scanner as started.
    pub fn mark_started(&self) {
        let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
        self.started_at.store(now, Ordering::SeqCst);
        self.set_phase(SchedulerPhase::Idle);
    }

    /// Get the scanner start time.
    pub fn started_at(&self) -> Option<OffsetDateTime> {
        let ts = self.started_at.load(Ordering::SeqCst);
        if ts == 0 {
            None
        } else {
            OffsetDateTime::from_unix_timestamp(ts as i64).ok()
        }
    }

    /// Fold a finished cycle into the counters.
    pub fn record_cycle(&self, report: &CycleReport) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.devices_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);

        let mut last = self.last.lock();
        last.completed_at = Some(report.captured_at);
        last.devices_updated = report.updated;
    }

    /// Record a cycle that failed before any device was processed.
    pub fn record_failure(&self, error: &impl std::fmt::Display) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        self.last.lock().error = Some(error.to_string());
    }

    /// Point-in-time view for serialization.
    pub fn report(&self) -> SchedulerReport {
        let last = self.last.lock();
        SchedulerReport {
            phase: self.phase(),
            started_at: self.started_at(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            devices_failed: self.devices_failed.load(Ordering::Relaxed),
            last_cycle_at: last.completed_at,
            last_cycle_updated: last.devices_updated,
            last_error: last.error.clone(),
        }
    }
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of [`SchedulerStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerReport {
    pub phase: SchedulerPhase,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub devices_failed: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_cycle_at: Option<OffsetDateTime>,
    pub last_cycle_updated: usize,
    pub last_error: Option<String>,
}
