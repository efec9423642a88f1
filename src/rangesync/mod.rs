// src/rangesync/mod.rs

pub mod config;
pub mod formula;
pub mod sequence;
pub mod share_link;
pub mod statistics;
pub mod storage;
pub mod store;
pub mod usage;

// Let's explicitly export the store so it can be reached as rangesync::RangeStore
// instead of rangesync::store::RangeStore
pub use store::RangeStore;
