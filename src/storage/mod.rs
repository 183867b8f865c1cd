//! Storage Module
//!
//! Persistent string slots backing the offline cache.
//!
//! The cache keeps its whole state in one slot and rewrites it on every
//! mutation, so implementations only need whole-value reads and writes.

mod file;
mod memory;

use thiserror::Error;

pub use file::{is_valid_slot_name, FileStorage};
pub use memory::MemoryStorage;

// == Public Constants ==
/// Default slot name holding the serialized cache.
pub const DEFAULT_STORAGE_KEY: &str = "offline-cache";

// == Storage Error ==
/// Errors raised by storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be (de)serialized
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend refused the write (quota, read-only, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Slot name the backend cannot represent
    #[error("Invalid storage slot name: '{0}'")]
    InvalidKey(String),
}

// == Storage Trait ==
/// Minimal string-keyed persistent storage.
pub trait Storage: Send + Sync {
    /// Reads a slot. `Ok(None)` when the slot does not exist.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a slot, replacing any previous content.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a slot. Removing a missing slot is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
