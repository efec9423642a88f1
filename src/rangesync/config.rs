//! Configuration for rangesync.
//!
//! Provides the [`RangeSyncConfig`] struct for choosing where state is stored and
//! tuning the advisory limits. Users construct this manually; no config-file parsing
//! dependencies are required.
//!
//! # Example
//!
//! ```rust
//! use rangesync::RangeSyncConfig;
//! use std::path::PathBuf;
//!
//! // Use the defaults ("rangesync_state" in the current directory)
//! let config = RangeSyncConfig::default();
//!
//! // Or override only what you need
//! let config = RangeSyncConfig {
//!     state_dir: PathBuf::from("/var/data/rangesync"),
//!     ..RangeSyncConfig::default()
//! };
//! ```

use std::path::PathBuf;

/// Storage key the range store persists under.
pub const DEFAULT_STORAGE_KEY: &str = "range-storage";

/// Storage key the usage counters persist under.
pub const DEFAULT_USAGE_STORAGE_KEY: &str = "rangesync-stats";

/// Global configuration for the range engine and its stores.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSyncConfig {
    /// Directory used by [`FileStorage`](crate::storage::FileStorage).
    pub state_dir: PathBuf,
    /// Key for the persisted [`RangeState`](crate::store::RangeState) document.
    pub storage_key: String,
    /// Key for the persisted [`UsageStats`](crate::usage::UsageStats) document.
    pub usage_storage_key: String,
    /// Estimated element count above which a committed range is logged as oversized.
    /// Ranges are never refused.
    pub large_range_threshold: u64,
    /// How many leading values a chart preview shows.
    pub preview_points: usize,
}

impl Default for RangeSyncConfig {
    /// ```rust
    /// use rangesync::RangeSyncConfig;
    /// use std::path::PathBuf;
    ///
    /// let config = RangeSyncConfig::default();
    /// assert_eq!(config.state_dir, PathBuf::from("rangesync_state"));
    /// assert_eq!(config.storage_key, "range-storage");
    /// assert_eq!(config.preview_points, 50);
    /// ```
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("rangesync_state"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            usage_storage_key: DEFAULT_USAGE_STORAGE_KEY.to_string(),
            large_range_threshold: 1_000_000,
            preview_points: 50,
        }
    }
}
