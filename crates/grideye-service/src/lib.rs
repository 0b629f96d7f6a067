//! Background BLE scanner and HTTP snapshot API for thermal grid sensors.
//!
//! This crate provides a service that:
//! - Listens for thermal grid sensor advertisements on a fixed interval
//! - Keeps the latest frame per device in memory
//! - Exposes the latest frames over HTTP
//!
//! Nothing is persisted. A device that stops advertising keeps its last
//! frame until the process exits, unless an expiry age is configured.
//!
//! # REST API Endpoints
//!
//! - `GET /` - Plain text liveness response (`sensor.`)
//! - `GET /api/get-grid-eyes` - Latest frame of every device, keyed by address
//! - `GET /api/health` - Service health check
//! - `GET /api/status` - Scanner phase, counters and last error
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/grideye/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:5000"
//!
//! [scanner]
//! interval_secs = 5
//! scan_duration_secs = 5
//! manufacturer_id = 65535
//! # expire_after_secs = 300
//! ```

pub mod api;
pub mod collector;
pub mod config;
pub mod state;
pub mod store;

pub use collector::{Collector, CollectorError, CycleReport, ScanCycle, ScanScheduler};
pub use config::{Config, ConfigError, ScannerConfig, ServerConfig, ValidationError};
pub use state::{AppState, SchedulerPhase, SchedulerReport, SchedulerStatus};
pub use store::{Snapshot, SnapshotStore};
