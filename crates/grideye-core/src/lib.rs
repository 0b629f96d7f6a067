//! BLE discovery and thermal payload parsing for grid sensors.
//!
//! This crate talks to the platform Bluetooth stack and turns advertisements
//! into thermal frames. It does not keep state between passes; storing the
//! latest frame per device is the service's job.
//!
//! # Platform Differences
//!
//! - **macOS**: CoreBluetooth hides MAC addresses. Devices are keyed by the
//!   peripheral UUID, which is stable per Mac but differs between Macs.
//! - **Linux/Windows**: Devices are keyed by their Bluetooth MAC address
//!   (e.g., `AA:BB:CC:DD:EE:FF`).
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use grideye_core::{BleDiscovery, Discovery, parse_advertisement};
//! use grideye_types::GRID_EYE_MANUFACTURER_ID;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discovery = BleDiscovery::new().await?;
//!     for device in discovery.discover(Duration::from_secs(5)).await? {
//!         if let Some(adv) = parse_advertisement(&device, GRID_EYE_MANUFACTURER_ID)? {
//!             println!("{}: {} samples", adv.address, adv.frame.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod advertisement;
pub mod error;
pub mod guard;
pub mod mock;
pub mod scan;
pub mod traits;
pub mod util;

pub use grideye_types::types;

pub use advertisement::{ThermalAdvertisement, parse_advertisement, parse_thermal_payload};
pub use error::{Error, Result};
pub use guard::ScanGuard;
pub use mock::{MockDiscovery, MockOutcome};
pub use scan::{BleDiscovery, DiscoveredDevice, SCAN_GRACE_PERIOD};
pub use traits::Discovery;
