//! Device discovery over Bluetooth Low Energy.
//!
//! One call to [`scan_with_adapter`] runs a bounded scan and returns every
//! device heard during that scan window, together with its manufacturer
//! data. Peripherals the adapter only remembers from earlier scans are left
//! out. Filtering for thermal frames happens later, in the scan cycle.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::guard::stop_scan_on_drop;
use crate::traits::Discovery;
use crate::util::create_identifier;

/// Extra time allowed on top of the scan window before discovery is abandoned.
pub const SCAN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// One device seen during discovery, with its advertisement contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Device address (peripheral UUID on macOS).
    pub address: String,
    /// Advertised local name.
    pub name: Option<String>,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Manufacturer data blocks keyed by company identifier.
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
}

impl DiscoveredDevice {
    /// Create a device with no name and no advertisement payload.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Set the advertised name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the signal strength.
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Add a manufacturer data block.
    pub fn with_manufacturer_data(mut self, company_id: u16, data: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_data.insert(company_id, data.into());
        self
    }

    /// Manufacturer data advertised under `company_id`, if any.
    pub fn manufacturer_payload(&self, company_id: u16) -> Option<&[u8]> {
        self.manufacturer_data.get(&company_id).map(Vec::as_slice)
    }
}

/// Get the first available Bluetooth adapter.
///
/// Failure here means the BLE capability is missing altogether, so every
/// error is reported as [`Error::BluetoothUnavailable`].
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|e| Error::unavailable(format!("cannot open Bluetooth manager: {}", e)))?;
    let adapters = manager
        .adapters()
        .await
        .map_err(|e| Error::unavailable(format!("cannot list Bluetooth adapters: {}", e)))?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| Error::unavailable("no Bluetooth adapter available"))
}

/// Scan for `duration` on `adapter` and collect the devices heard meanwhile.
///
/// The whole operation is bounded by `duration + SCAN_GRACE_PERIOD`. If it
/// is abandoned (timeout, or the caller dropping the future), the adapter is
/// told to stop scanning in the background.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    duration: Duration,
) -> Result<Vec<DiscoveredDevice>> {
    let bound = duration + SCAN_GRACE_PERIOD;
    timeout(bound, scan_inner(adapter, duration))
        .await
        .map_err(|_| Error::timeout("discover", bound))?
}

async fn scan_inner(adapter: &Adapter, duration: Duration) -> Result<Vec<DiscoveredDevice>> {
    debug!("Starting BLE scan for {}ms", duration.as_millis());

    let mut events = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;
    let guard = stop_scan_on_drop(adapter.clone());

    let deadline = Instant::now() + duration;
    let mut heard = HeardDevices::default();
    loop {
        match timeout_at(deadline, events.next()).await {
            Ok(Some(event)) => heard.observe(event),
            Ok(None) => {
                debug!("Adapter event stream closed before the scan window ended");
                break;
            }
            Err(_) => break,
        }
    }

    guard.disarm();
    adapter.stop_scan().await?;

    let mut discovered = Vec::with_capacity(heard.len());
    for (id, manufacturer_data) in heard.into_inner() {
        match process_peripheral(adapter, &id, manufacturer_data).await {
            Ok(Some(device)) => discovered.push(device),
            Ok(None) => {}
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    debug!("Scan complete. Heard {} device(s)", discovered.len());
    Ok(discovered)
}

/// Build a device from a peripheral heard in this window.
///
/// Manufacturer data received as advertisement events during the window
/// wins over the adapter's cached properties. The cached copy is used only
/// when the device was heard without a data event, which BlueZ does when
/// the payload has not changed.
async fn process_peripheral(
    adapter: &Adapter,
    id: &PeripheralId,
    fresh_data: HashMap<u16, Vec<u8>>,
) -> Result<Option<DiscoveredDevice>> {
    let peripheral = adapter.peripheral(id).await?;
    let properties = match peripheral.properties().await? {
        Some(p) => p,
        None => return Ok(None),
    };

    let address = create_identifier(&properties.address.to_string(), id);
    let manufacturer_data = if fresh_data.is_empty() {
        properties.manufacturer_data
    } else {
        fresh_data
    };

    Ok(Some(DiscoveredDevice {
        address,
        name: properties.local_name,
        rssi: properties.rssi,
        manufacturer_data,
    }))
}

/// Devices heard during one scan window, with the manufacturer data each
/// one advertised in that window.
#[derive(Debug)]
struct HeardDevices<K> {
    devices: HashMap<K, HashMap<u16, Vec<u8>>>,
}

impl<K> Default for HeardDevices<K> {
    fn default() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> HeardDevices<K> {
    fn heard(&mut self, id: K) {
        self.devices.entry(id).or_default();
    }

    fn advertised(&mut self, id: K, manufacturer_data: HashMap<u16, Vec<u8>>) {
        self.devices.entry(id).or_default().extend(manufacturer_data);
    }

    fn len(&self) -> usize {
        self.devices.len()
    }

    fn into_inner(self) -> HashMap<K, HashMap<u16, Vec<u8>>> {
        self.devices
    }
}

impl HeardDevices<PeripheralId> {
    fn observe(&mut self, event: CentralEvent) {
        match event {
            CentralEvent::ManufacturerDataAdvertisement {
                id,
                manufacturer_data,
            } => self.advertised(id, manufacturer_data),
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => self.heard(id),
            _ => {}
        }
    }
}

/// [`Discovery`] backed by the platform's BLE stack through btleplug.
pub struct BleDiscovery {
    adapter: Adapter,
}

impl BleDiscovery {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BluetoothUnavailable`] if no adapter can be opened.
    pub async fn new() -> Result<Self> {
        let adapter = get_adapter().await?;
        match adapter.adapter_info().await {
            Ok(info) => info!("Using Bluetooth adapter: {}", info),
            Err(e) => warn!("Using Bluetooth adapter (info unavailable: {})", e),
        }
        Ok(Self { adapter })
    }
}

#[async_trait]
impl Discovery for BleDiscovery {
    async fn discover(&self, duration: Duration) -> Result<Vec<DiscoveredDevice>> {
        scan_with_adapter(&self.adapter, duration).await
    }

    fn backend(&self) -> &'static str {
        "btleplug"
    }
}
