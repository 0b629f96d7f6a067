//! Thermal frame extraction from BLE advertisements.
//!
//! A thermal grid sensor broadcasts its latest frame as manufacturer data.
//! The payload is the frame itself, one unsigned byte per sample, with no
//! header and no checksum.

use grideye_types::ThermalFrame;

use crate::error::{Error, Result};
use crate::scan::DiscoveredDevice;

/// A device advertisement that carried a thermal frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThermalAdvertisement {
    /// Device address.
    pub address: String,
    /// Advertised name, if any.
    pub name: Option<String>,
    /// Decoded frame.
    pub frame: ThermalFrame,
}

/// Decode a manufacturer data payload into thermal samples.
///
/// Every byte becomes one sample of the same value, in order. Any input is
/// accepted, including an empty payload.
///
/// # Example
///
/// ```
/// use grideye_core::parse_thermal_payload;
///
/// let frame = parse_thermal_payload(&[0x15, 0x16, 0xFF]);
/// assert_eq!(frame.samples(), &[21, 22, 255]);
/// ```
pub fn parse_thermal_payload(data: &[u8]) -> ThermalFrame {
    ThermalFrame::from_bytes(data)
}

/// Extract the thermal frame from one discovered device.
///
/// Returns `Ok(None)` when the device did not advertise under
/// `manufacturer_id`; such devices are not thermal sensors.
///
/// # Errors
///
/// Returns [`Error::InvalidAdvertisement`] when the device carries a frame
/// but cannot be keyed (empty address).
pub fn parse_advertisement(
    device: &DiscoveredDevice,
    manufacturer_id: u16,
) -> Result<Option<ThermalAdvertisement>> {
    let Some(payload) = device.manufacturer_payload(manufacturer_id) else {
        return Ok(None);
    };

    let address = device.address.trim();
    if address.is_empty() {
        return Err(Error::invalid_advertisement(
            &device.address,
            "device address is empty",
        ));
    }

    Ok(Some(ThermalAdvertisement {
        address: address.to_string(),
        name: device.name.clone(),
        frame: parse_thermal_payload(payload),
    }))
}
