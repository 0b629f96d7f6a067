//! Manufacturer identifiers used in BLE advertisements.
//!
//! Manufacturer-specific data in an advertisement is keyed by a 16-bit
//! company identifier. The thermal grid firmware broadcasts its frame under
//! the reserved test identifier `0xFFFF`.

/// Manufacturer ID under which thermal grid frames are advertised.
pub const GRID_EYE_MANUFACTURER_ID: u16 = 0xFFFF;

/// Format a manufacturer ID the way it is written in logs and config docs.
pub fn format_manufacturer_id(id: u16) -> String {
    format!("0x{:04X}", id)
}
