//! Core types for thermal grid readings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One thermal frame: the raw samples carried in a manufacturer data block.
///
/// Each sample is one unsigned byte of the advertised payload, in payload
/// order. The number of samples is whatever the sensor sent; an 8x8 grid
/// produces 64 samples but no length is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ThermalFrame(Vec<u8>);

impl ThermalFrame {
    /// Build a frame from raw payload bytes.
    ///
    /// Accepts any input, including an empty slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(data.to_vec())
    }

    /// The samples in payload order.
    pub fn samples(&self) -> &[u8] {
        &self.0
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame carries no samples.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Smallest sample, if any.
    pub fn min(&self) -> Option<u8> {
        self.0.iter().copied().min()
    }

    /// Largest sample, if any.
    pub fn max(&self) -> Option<u8> {
        self.0.iter().copied().max()
    }
}

impl From<Vec<u8>> for ThermalFrame {
    fn from(samples: Vec<u8>) -> Self {
        Self(samples)
    }
}

/// The latest reading captured for one device.
///
/// Serialized as `{"name": ..., "timestamp": ..., "thermal_data": [...]}`.
/// The address is the key a record is stored under, so it is not repeated
/// inside the serialized value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceRecord {
    /// Stable device identifier (MAC address, or peripheral UUID on macOS).
    #[cfg_attr(feature = "serde", serde(skip, default))]
    pub address: String,
    /// Advertised local name, if the device sent one.
    pub name: Option<String>,
    /// When the scan cycle that produced this record started processing.
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp::millis_z"))]
    pub timestamp: OffsetDateTime,
    /// Thermal samples from the advertisement.
    pub thermal_data: ThermalFrame,
}

impl DeviceRecord {
    /// Create a record.
    pub fn new(
        address: impl Into<String>,
        name: Option<String>,
        timestamp: OffsetDateTime,
        thermal_data: ThermalFrame,
    ) -> Self {
        Self {
            address: address.into(),
            name,
            timestamp,
            thermal_data,
        }
    }
}
