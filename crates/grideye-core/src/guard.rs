//! Scan guard for cleanup when a discovery pass is abandoned.
//!
//! A discovery future can be dropped part way through, for example when the
//! caller races it against a shutdown signal or a timeout. [`ScanGuard`] runs
//! its cleanup in that case only; a pass that finishes normally calls
//! [`ScanGuard::disarm`] and nothing happens on drop.

use btleplug::api::Central as _;
use btleplug::platform::Adapter;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Runs a cleanup action if dropped before [`ScanGuard::disarm`] is called.
///
/// # Example
///
/// ```
/// use grideye_core::ScanGuard;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// let cleaned = AtomicBool::new(false);
/// {
///     let _guard = ScanGuard::new(|| cleaned.store(true, Ordering::SeqCst));
/// }
/// assert!(cleaned.load(Ordering::SeqCst));
/// ```
pub struct ScanGuard<F: FnOnce()> {
    on_abandon: Option<F>,
}

impl<F: FnOnce()> ScanGuard<F> {
    /// Arm a guard that calls `on_abandon` when dropped.
    pub fn new(on_abandon: F) -> Self {
        Self {
            on_abandon: Some(on_abandon),
        }
    }

    /// The pass completed; drop without running the cleanup.
    pub fn disarm(mut self) {
        self.on_abandon = None;
    }
}

impl<F: FnOnce()> Drop for ScanGuard<F> {
    fn drop(&mut self) {
        if let Some(on_abandon) = self.on_abandon.take() {
            on_abandon();
        }
    }
}

/// Guard that stops scanning on `adapter` if the pass is abandoned.
///
/// `stop_scan` is async, so it is spawned on the current runtime.
pub(crate) fn stop_scan_on_drop(adapter: Adapter) -> ScanGuard<impl FnOnce() + Send> {
    ScanGuard::new(move || match Handle::try_current() {
        Ok(handle) => {
            debug!("Scan abandoned, stopping adapter scan");
            handle.spawn(async move {
                if let Err(e) = adapter.stop_scan().await {
                    warn!("Failed to stop abandoned scan: {}", e);
                }
            });
        }
        Err(_) => warn!("No tokio runtime available to stop abandoned scan"),
    })
}
