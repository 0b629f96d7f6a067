//! Utility functions for grideye-core.

use btleplug::platform::PeripheralId;

/// Address reported by backends that do not expose the MAC (CoreBluetooth).
pub const UNRESOLVED_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms they wrap the
/// MAC address. The `PeripheralId(...)` debug wrapper is stripped.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    strip_peripheral_wrapper(&format!("{:?}", id))
}

fn strip_peripheral_wrapper(debug: &str) -> String {
    debug
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Pick the address a device is keyed under.
///
/// Uses the Bluetooth address when the platform provides one, and falls back
/// to the peripheral identifier when it does not.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    resolve_identifier(address, || format_peripheral_id(peripheral_id))
}

fn resolve_identifier(address: &str, fallback: impl FnOnce() -> String) -> String {
    if address == UNRESOLVED_ADDRESS {
        fallback()
    } else {
        address.to_string()
    }
}
