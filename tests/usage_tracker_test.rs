//! Test suite for the persisted usage counters

use rangesync::storage::{FileStorage, MemoryStorage, StateStorage};
use rangesync::usage::{UsageStats, UsageTracker};
use rangesync::RangeSyncConfig;
use tempfile::TempDir;

#[test]
fn test_starts_at_zero() {
    let usage = UsageTracker::open_default(MemoryStorage::new());
    assert_eq!(usage.stats(), &UsageStats::default());
    assert_eq!(usage.stats().last_session_date, None);
}

#[test]
fn test_counters_accumulate_and_persist() {
    let storage = MemoryStorage::new();
    let mut usage = UsageTracker::open_default(storage.clone());
    usage.record_calculation();
    usage.record_calculation();
    usage.record_range_analyzed(100);
    usage.add_elements_processed(25);
    usage.add_time_spent(90);

    let stats = usage.stats().clone();
    assert_eq!(stats.total_calculations, 2);
    assert_eq!(stats.total_ranges_analyzed, 1);
    assert_eq!(stats.total_elements_processed, 125);
    assert_eq!(stats.total_time_spent, 90);
    assert!(stats.last_session_date.is_some());

    let raw = storage.load("rangesync-stats").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["totalCalculations"], 2);
    assert_eq!(json["totalElementsProcessed"], 125);
    assert!(json["lastSessionDate"].is_string());

    let reopened = UsageTracker::open_default(storage);
    assert_eq!(reopened.stats(), &stats);
}

#[test]
fn test_usage_and_range_state_use_separate_keys() {
    let storage = MemoryStorage::new();
    let mut usage = UsageTracker::open_default(storage.clone());
    usage.record_calculation();
    assert!(storage.load("range-storage").unwrap().is_none());
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_reset() {
    let storage = MemoryStorage::new();
    let mut usage = UsageTracker::open_default(storage.clone());
    usage.record_range_analyzed(10);
    usage.reset();
    assert_eq!(usage.stats(), &UsageStats::default());
    assert_eq!(
        UsageTracker::open_default(storage).stats(),
        &UsageStats::default()
    );
}

#[test]
fn test_counters_saturate() {
    let mut usage = UsageTracker::open_default(MemoryStorage::new());
    usage.add_elements_processed(u64::MAX);
    usage.record_range_analyzed(10);
    assert_eq!(usage.stats().total_elements_processed, u64::MAX);
}

#[test]
fn test_malformed_document_is_ignored() {
    let storage = MemoryStorage::new();
    storage.save("rangesync-stats", "[1, 2, 3]").unwrap();
    let usage = UsageTracker::open_default(storage);
    assert_eq!(usage.stats(), &UsageStats::default());
}

#[test]
fn test_file_backed_usage() {
    let dir = TempDir::new().unwrap();
    let config = RangeSyncConfig {
        state_dir: dir.path().to_path_buf(),
        ..RangeSyncConfig::default()
    };
    let storage = FileStorage::open(&config.state_dir).unwrap();
    {
        let mut usage = UsageTracker::open(storage.clone(), &config);
        usage.add_time_spent(30);
    }
    assert!(dir.path().join("rangesync-stats.json").exists());
    let usage = UsageTracker::open(storage, &config);
    assert_eq!(usage.stats().total_time_spent, 30);
}

#[test]
fn test_session_date_without_offset_is_read_as_utc() {
    let storage = MemoryStorage::new();
    storage
        .save(
            "rangesync-stats",
            r#"{"totalCalculations": 4, "lastSessionDate": "2024-03-01T08:30:00"}"#,
        )
        .unwrap();
    let usage = UsageTracker::open_default(storage);
    assert_eq!(usage.stats().total_calculations, 4);
    assert_eq!(
        usage.stats().last_session_date.map(|d| d.to_rfc3339()),
        Some("2024-03-01T08:30:00+00:00".to_string())
    );
}
