//! Trait abstraction over the BLE discovery transport.
//!
//! The [`Discovery`] trait lets the scan loop run against a real adapter
//! ([`BleDiscovery`](crate::scan::BleDiscovery)) or a scripted one
//! ([`MockDiscovery`](crate::mock::MockDiscovery)).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::scan::DiscoveredDevice;

/// A source of BLE advertisements.
///
/// # Example
///
/// ```ignore
/// use grideye_core::{Discovery, Result};
/// use std::time::Duration;
///
/// async fn count<D: Discovery>(discovery: &D) -> Result<usize> {
///     Ok(discovery.discover(Duration::from_secs(5)).await?.len())
/// }
/// ```
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Scan for `duration` and return every device heard during that window,
    /// with the advertisement data it sent.
    ///
    /// Devices known only from earlier passes are not returned. A failure
    /// means the whole pass failed; no partial list is returned.
    /// Implementations must return within a finite bound of `duration`.
    async fn discover(&self, duration: Duration) -> Result<Vec<DiscoveredDevice>>;

    /// Short name of the backend, used in logs and status output.
    fn backend(&self) -> &'static str;
}
