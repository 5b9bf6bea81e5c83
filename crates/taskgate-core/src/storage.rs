//! String-valued key-value storage that survives restarts.
//!
//! The store and the session gate only ever see the [`Storage`] trait; the
//! CLI wires a [`FileStorage`] rooted at the configured data directory.
//! Writes go through `&self` so the gate and the store can share one backend.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const USERNAME_KEY: &str = "username";
pub const TASKS_KEY: &str = "tasks";

pub trait Storage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

impl<S: Storage + ?Sized> Storage for &S {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        (**self).remove(key)
    }
}

/// One `<key>.data` file per key inside a data directory.
#[derive(Debug)]
pub struct FileStorage {
    pub data_dir: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file storage");
        Ok(Self { data_dir })
    }

    fn key_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(anyhow!("invalid storage key: {key:?}"));
        }
        Ok(self.data_dir.join(format!("{key}.data")))
    }
}

impl Storage for FileStorage {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => {
                debug!(file = %path.display(), bytes = value.len(), "read key");
                Ok(Some(value))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
        }
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.key_path(key)?;
        debug!(file = %path.display(), bytes = value.len(), "writing key atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed removing {}", path.display())),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{FileStorage, Storage};

    #[test]
    fn file_storage_set_get_remove() {
        let temp = tempdir().expect("tempdir");
        let storage = FileStorage::open(temp.path()).expect("open storage");

        assert_eq!(storage.get("username").unwrap(), None);
        storage.set("username", "alice").expect("write key");
        assert_eq!(storage.get("username").unwrap().as_deref(), Some("alice"));
        assert!(temp.path().join("username.data").exists());

        storage.set("username", "bob").expect("write key");
        assert_eq!(storage.get("username").unwrap().as_deref(), Some("bob"));

        storage.remove("username").expect("remove key");
        storage.remove("username").expect("remove key");
        assert_eq!(storage.get("username").unwrap(), None);
    }

    #[test]
    fn keys_cannot_escape_the_data_dir() {
        let temp = tempdir().expect("tempdir");
        let storage = FileStorage::open(temp.path()).expect("open storage");
        assert!(storage.set("../escape", "x").is_err());
        assert!(storage.get("").is_err());
    }
}
