//! Cache Module
//!
//! Provides an expiring key-value cache persisted to a storage slot.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::CacheStore;
