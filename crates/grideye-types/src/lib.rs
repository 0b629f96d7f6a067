//! Platform-agnostic types for BLE thermal grid sensors.
//!
//! This crate holds the data model shared by the BLE core (grideye-core)
//! and the HTTP service (grideye-service).
//!
//! # Features
//!
//! - [`ThermalFrame`]: samples decoded from a manufacturer data block
//! - [`DeviceRecord`]: the latest reading kept per device
//! - Millisecond `...Z` timestamp rendering and parsing
//! - The manufacturer ID thermal frames are advertised under
//!
//! # Example
//!
//! ```
//! use grideye_types::{DeviceRecord, ThermalFrame, format_timestamp};
//! use time::macros::datetime;
//!
//! let record = DeviceRecord::new(
//!     "AA:BB:CC:DD:EE:FF",
//!     Some("grid-1".to_string()),
//!     datetime!(2024-01-01 00:00:00.125 UTC),
//!     ThermalFrame::from_bytes(&[21, 22, 23]),
//! );
//! assert_eq!(format_timestamp(record.timestamp).unwrap(), "2024-01-01T00:00:00.125Z");
//! ```

pub mod error;
pub mod manufacturer;
pub mod timestamp;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use manufacturer::{GRID_EYE_MANUFACTURER_ID, format_manufacturer_id};
pub use timestamp::{format_timestamp, now_millis, parse_timestamp, truncate_to_millis};
pub use types::{DeviceRecord, ThermalFrame};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_thermal_frame_preserves_every_byte(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let frame = ThermalFrame::from_bytes(&data);
            prop_assert_eq!(frame.len(), data.len());
            for (sample, byte) in frame.samples().iter().zip(data.iter()) {
                prop_assert_eq!(*sample, *byte);
            }
        }

        #[test]
        fn prop_timestamp_round_trips_at_millisecond_precision(
            secs in 0i64..4_102_444_800,
            millis in 0u16..1000,
        ) {
            let at = time::OffsetDateTime::from_unix_timestamp(secs).unwrap()
                + time::Duration::milliseconds(i64::from(millis));
            let rendered = format_timestamp(at).unwrap();
            prop_assert!(rendered.ends_with('Z'));
            prop_assert_eq!(rendered.len(), 24);
            prop_assert_eq!(parse_timestamp(&rendered).unwrap(), at);
        }
    }

    #[test]
    fn test_public_exports() {
        let _ = std::any::TypeId::of::<DeviceRecord>();
        let _ = std::any::TypeId::of::<ThermalFrame>();
        let _ = std::any::TypeId::of::<ParseError>();
    }
}
