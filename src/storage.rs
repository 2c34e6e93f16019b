use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub const LANGUAGE_KEY: &str = "siteLanguage";
pub const THEME_KEY: &str = "theme";
pub const NOTICE_DISMISSED_KEY: &str = "safariWarningDismissed";

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
struct Snapshot(BTreeMap<String, String>);

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<Snapshot>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.0.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.0.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.0.remove(key);
        Ok(())
    }
}

// A json object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<Snapshot>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let bytes =
                std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse storage {}", path.display()))?
        } else {
            Snapshot::default()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    // The in-memory view only changes once the new snapshot is on disk.
    fn update(&self, f: impl FnOnce(&mut Snapshot)) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        let mut next = entries.clone();
        f(&mut next);
        let json = serde_json::to_vec_pretty(&next)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        std::fs::write(&self.path, json).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        *entries = next;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.0.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.0.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.0.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_storage_survives_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state/prefs.json");

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get(THEME_KEY), None);
        storage.set(THEME_KEY, "dark").unwrap();
        storage.set(LANGUAGE_KEY, "fr").unwrap();
        storage.remove(LANGUAGE_KEY).unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(reopened.get(LANGUAGE_KEY), None);
    }

    #[test]
    fn file_storage_rejects_garbage() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("prefs.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(FileStorage::open(&path).is_err());
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let storage = FileStorage::open(blocker.join("prefs.json")).unwrap();
        assert!(matches!(
            storage.set(THEME_KEY, "dark"),
            Err(StorageError::Write { .. })
        ));
        assert_eq!(storage.get(THEME_KEY), None);
    }

    #[test]
    fn failed_rewrite_keeps_old_value() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("prefs.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set(LANGUAGE_KEY, "fr").unwrap();

        // Replacing the file with a directory makes the next write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(storage.set(LANGUAGE_KEY, "de").is_err());
        assert!(storage.remove(LANGUAGE_KEY).is_err());
        assert_eq!(storage.get(LANGUAGE_KEY).as_deref(), Some("fr"));
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let storage = FileStorage::open(tempdir().unwrap().path().join("prefs.json")).unwrap();
        let _ = std::panic::catch_unwind(|| {
            let _guard = storage.entries.lock().unwrap();
            panic!("poison");
        });
        assert!(matches!(
            storage.set(THEME_KEY, "dark"),
            Err(StorageError::Poisoned)
        ));

        let memory = MemoryStorage::new();
        let _ = std::panic::catch_unwind(|| {
            let _guard = memory.entries.lock().unwrap();
            panic!("poison");
        });
        assert!(matches!(memory.set(THEME_KEY, "dark"), Err(StorageError::Poisoned)));
    }

    #[test]
    fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set(NOTICE_DISMISSED_KEY, "true").unwrap();
        assert_eq!(storage.get(NOTICE_DISMISSED_KEY).as_deref(), Some("true"));
        storage.remove(NOTICE_DISMISSED_KEY).unwrap();
        assert_eq!(storage.get(NOTICE_DISMISSED_KEY), None);
    }
}
