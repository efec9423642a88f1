//! Lifetime usage counters.
//!
//! [`UsageTracker`] keeps a small [`UsageStats`] document next to the range state:
//! how many calculations and ranges were run, how many elements were processed, and
//! how long the user spent. It follows the same write-through contract as
//! [`RangeStore`](crate::store::RangeStore): every update is persisted immediately.
//!
//! ```rust
//! use rangesync::storage::MemoryStorage;
//! use rangesync::usage::UsageTracker;
//!
//! let mut usage = UsageTracker::open_default(MemoryStorage::new());
//! usage.record_calculation();
//! usage.record_range_analyzed(100);
//! assert_eq!(usage.stats().total_calculations, 1);
//! assert_eq!(usage.stats().total_elements_processed, 100);
//! assert!(usage.stats().last_session_date.is_some());
//! ```

use crate::rangesync::config::RangeSyncConfig;
use crate::rangesync::storage::{StateStorage, StorageError};
use crate::rangesync::store::optional_iso_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub total_calculations: u64,
    pub total_ranges_analyzed: u64,
    pub total_elements_processed: u64,
    /// Seconds.
    pub total_time_spent: u64,
    #[serde(deserialize_with = "optional_iso_timestamp")]
    pub last_session_date: Option<DateTime<Utc>>,
}

/// Usage counters bound to a storage backend.
#[derive(Debug)]
pub struct UsageTracker<S: StateStorage> {
    stats: UsageStats,
    storage: S,
    key: String,
}

impl<S: StateStorage> UsageTracker<S> {
    pub fn open(storage: S, config: &RangeSyncConfig) -> Self {
        let key = config.usage_storage_key.clone();
        let stats = match storage.load(&key) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed usage stats '{}': {}", key, err);
                UsageStats::default()
            }),
            Ok(None) => UsageStats::default(),
            Err(err) => {
                log::warn!("Could not read usage stats '{}': {}", key, err);
                UsageStats::default()
            }
        };
        Self {
            stats,
            storage,
            key,
        }
    }

    pub fn open_default(storage: S) -> Self {
        Self::open(storage, &RangeSyncConfig::default())
    }

    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }

    pub fn persist(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.stats)?;
        self.storage.save(&self.key, &json)
    }

    fn flush(&self) {
        if let Err(err) = self.persist() {
            log::error!("Failed to persist usage stats '{}': {}", self.key, err);
        }
    }

    /// Count one calculation and stamp the session date.
    pub fn record_calculation(&mut self) {
        self.stats.total_calculations += 1;
        self.stats.last_session_date = Some(Utc::now());
        self.flush();
    }

    /// Count one analyzed range of `elements` values.
    pub fn record_range_analyzed(&mut self, elements: u64) {
        self.stats.total_ranges_analyzed += 1;
        self.stats.total_elements_processed =
            self.stats.total_elements_processed.saturating_add(elements);
        self.flush();
    }

    pub fn add_elements_processed(&mut self, count: u64) {
        self.stats.total_elements_processed =
            self.stats.total_elements_processed.saturating_add(count);
        self.flush();
    }

    pub fn add_time_spent(&mut self, seconds: u64) {
        self.stats.total_time_spent = self.stats.total_time_spent.saturating_add(seconds);
        self.flush();
    }

    pub fn reset(&mut self) {
        self.stats = UsageStats::default();
        self.flush();
    }
}
