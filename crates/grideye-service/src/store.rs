//! In-memory store of the latest reading per device.
//!
//! # Locking
//!
//! One [`parking_lot::RwLock`] guards the map. Writers replace a whole
//! [`DeviceRecord`] under the write guard, so a reader holding the read guard
//! sees every record either entirely before or entirely after a write.
//! [`SnapshotStore::snapshot`] holds the read guard only while copying; callers
//! serialize the copy after the guard is gone.
//!
//! Nothing outside this module touches the map directly.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use time::OffsetDateTime;

use grideye_types::DeviceRecord;

/// Point-in-time copy of the store, keyed by device address.
///
/// Ordered by address so serialized output is stable.
pub type Snapshot = BTreeMap<String, DeviceRecord>;

/// Latest-reading store shared by the scanner and the HTTP handlers.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    records: RwLock<HashMap<String, DeviceRecord>>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `address`.
    pub fn upsert(&self, address: impl Into<String>, record: DeviceRecord) {
        self.records.write().insert(address.into(), record);
    }

    /// Copy the current contents.
    pub fn snapshot(&self) -> Snapshot {
        let records = self.records.read();
        records
            .iter()
            .map(|(address, record)| (address.clone(), record.clone()))
            .collect()
    }

    /// Copy of the record for one address.
    pub fn get(&self, address: &str) -> Option<DeviceRecord> {
        self.records.read().get(address).cloned()
    }

    /// Number of devices held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no device has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drop every record captured before `cutoff`. Returns how many were dropped.
    pub fn prune_older_than(&self, cutoff: OffsetDateTime) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.timestamp >= cutoff);
        before - records.len()
    }
}
