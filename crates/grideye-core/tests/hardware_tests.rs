//! Hardware tests for grideye-core
//!
//! These tests require a Bluetooth adapter and should be run with:
//! `cargo test --package grideye-core -- --ignored --nocapture`
//!
//! A thermal grid sensor advertising under manufacturer ID 0xFFFF should be
//! in range for `test_discover_thermal_sensor` to find anything.

use std::time::Duration;

use grideye_core::{BleDiscovery, Discovery, parse_advertisement};
use grideye_types::GRID_EYE_MANUFACTURER_ID;
use tokio::time::timeout;

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_open_adapter() {
    let discovery = BleDiscovery::new().await;
    assert!(discovery.is_ok(), "no usable adapter: {:?}", discovery.err());
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_discover_thermal_sensor() {
    let discovery = BleDiscovery::new().await.unwrap();

    let result = timeout(
        Duration::from_secs(30),
        discovery.discover(Duration::from_secs(10)),
    )
    .await;

    match result {
        Ok(Ok(devices)) => {
            println!("Saw {} devices", devices.len());
            for device in &devices {
                if let Ok(Some(adv)) = parse_advertisement(device, GRID_EYE_MANUFACTURER_ID) {
                    println!(
                        "  {} ({}) {} samples",
                        adv.name.as_deref().unwrap_or("Unknown"),
                        adv.address,
                        adv.frame.len()
                    );
                }
            }
        }
        Ok(Err(e)) => panic!("Discovery failed: {}", e),
        Err(_) => panic!("Discovery did not return within 30 seconds"),
    }
}
