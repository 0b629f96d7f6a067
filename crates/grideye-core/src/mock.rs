//! Scripted discovery for testing.
//!
//! [`MockDiscovery`] implements [`Discovery`] without BLE hardware. Each call
//! to `discover` pops the next scripted outcome; once the script is empty the
//! fallback outcome is returned on every call.
//!
//! # Features
//!
//! - **Failure injection**: script transport failures or a lost adapter
//! - **Latency simulation**: wait for the requested scan window, or a fixed delay
//! - **Call counting**: observe how many passes the scheduler ran, and how
//!   many were dropped before they finished

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::guard::ScanGuard;
use crate::scan::DiscoveredDevice;
use crate::traits::Discovery;

/// One scripted result of a discovery pass.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// The pass succeeds and returns these devices.
    Devices(Vec<DiscoveredDevice>),
    /// The pass fails with a recoverable transport error.
    Failure(String),
    /// The adapter is gone; the error is fatal.
    Unavailable(String),
}

impl MockOutcome {
    fn into_result(self) -> Result<Vec<DiscoveredDevice>> {
        match self {
            Self::Devices(devices) => Ok(devices),
            Self::Failure(reason) => Err(Error::Transport(reason)),
            Self::Unavailable(reason) => Err(Error::unavailable(reason)),
        }
    }
}

/// A mock discovery transport.
///
/// # Example
///
/// ```
/// use grideye_core::{Discovery, DiscoveredDevice, MockDiscovery};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let discovery = MockDiscovery::new()
///         .with_failure("adapter busy")
///         .with_devices(vec![DiscoveredDevice::new("AA:BB")]);
///
///     assert!(discovery.discover(Duration::ZERO).await.is_err());
///     assert_eq!(discovery.discover(Duration::ZERO).await.unwrap().len(), 1);
///     assert_eq!(discovery.call_count(), 2);
/// }
/// ```
pub struct MockDiscovery {
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: Mutex<MockOutcome>,
    calls: AtomicU32,
    abandoned: AtomicU32,
    /// Fixed latency applied to every call.
    latency: Duration,
    /// Whether to sleep for the requested scan window.
    honor_duration: bool,
}

impl std::fmt::Debug for MockDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDiscovery")
            .field("scripted", &self.script.lock().len())
            .field("calls", &self.calls.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDiscovery {
    /// Create a mock that finds nothing.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(MockOutcome::Devices(Vec::new())),
            calls: AtomicU32::new(0),
            abandoned: AtomicU32::new(0),
            latency: Duration::ZERO,
            honor_duration: false,
        }
    }

    /// Queue a successful pass.
    pub fn with_devices(self, devices: Vec<DiscoveredDevice>) -> Self {
        self.push(MockOutcome::Devices(devices));
        self
    }

    /// Queue a recoverable failure.
    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        self.push(MockOutcome::Failure(reason.into()));
        self
    }

    /// Queue a fatal failure.
    pub fn with_unavailable(self, reason: impl Into<String>) -> Self {
        self.push(MockOutcome::Unavailable(reason.into()));
        self
    }

    /// Outcome returned once the script runs out.
    pub fn with_fallback(self, outcome: MockOutcome) -> Self {
        *self.fallback.lock() = outcome;
        self
    }

    /// Add a fixed delay to every pass.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sleep for the requested scan window on every pass.
    pub fn honor_duration(mut self, honor: bool) -> Self {
        self.honor_duration = honor;
        self
    }

    /// Queue an outcome after construction.
    pub fn push(&self, outcome: MockOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Number of `discover` calls so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of `discover` calls dropped before they returned.
    pub fn abandoned_count(&self) -> u32 {
        self.abandoned.load(Ordering::Relaxed)
    }

    /// Number of scripted outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    fn next_outcome(&self) -> MockOutcome {
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().clone())
    }
}

#[async_trait]
impl Discovery for MockDiscovery {
    async fn discover(&self, duration: Duration) -> Result<Vec<DiscoveredDevice>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let guard = ScanGuard::new(|| {
            self.abandoned.fetch_add(1, Ordering::Relaxed);
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.honor_duration {
            tokio::time::sleep(duration).await;
        }

        guard.disarm();
        self.next_outcome().into_result()
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}
