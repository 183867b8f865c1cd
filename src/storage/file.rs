//! File-backed storage: one JSON file per slot inside a directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Storage, StorageError};

/// Storage that keeps each slot in `<dir>/<slot>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous content intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the storage directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the file backing `key`.
    ///
    /// Slot names must be a non-empty run of ASCII alphanumerics, `-` or `_`
    /// so that each name maps to exactly one file inside `dir`.
    fn slot_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_slot_name(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(key)?) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Returns true if `key` can be used as a slot name.
pub fn is_valid_slot_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(storage.get("offline-cache").unwrap().is_none());

        storage.set("offline-cache", r#"{"a":1}"#).unwrap();
        assert_eq!(
            storage.get("offline-cache").unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
        assert!(dir.path().join("offline-cache.json").exists());

        storage.remove("offline-cache").unwrap();
        assert!(storage.get("offline-cache").unwrap().is_none());
        assert!(!dir.path().join("offline-cache.json").exists());
    }

    #[test]
    fn test_file_storage_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("slot", "first").unwrap();
        storage.set("slot", "second").unwrap();
        assert_eq!(storage.get("slot").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::open(dir.path())
            .unwrap()
            .set("slot", "persisted")
            .unwrap();

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get("slot").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_invalid_slot_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        for key in ["../escape", "a.b", "a/b", ""] {
            assert!(matches!(
                storage.set(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
            assert!(matches!(storage.get(key), Err(StorageError::InvalidKey(_))));
            assert!(matches!(storage.remove(key), Err(StorageError::InvalidKey(_))));
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        // Names that differed only in punctuation no longer share a file
        storage.set("a_b", "underscore").unwrap();
        assert!(storage.get("a.b").is_err());
        assert_eq!(storage.get("a_b").unwrap().as_deref(), Some("underscore"));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        // A non-empty directory in the slot's place makes the rename fail
        let blocked = dir.path().join("slot.json");
        fs::create_dir_all(blocked.join("inner")).unwrap();

        assert!(matches!(storage.set("slot", "x"), Err(StorageError::Io(_))));
        assert!(!dir.path().join("slot.json.tmp").exists());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::open(&nested).unwrap();
        assert!(nested.is_dir());
        storage.set("slot", "x").unwrap();
        assert!(nested.join("slot.json").exists());
    }
}
