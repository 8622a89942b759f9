//! Key-scoped stores with a finite capacity.
//!
//! The persistence service only needs `get`/`set`/`remove` on string values.
//! Both stores refuse a write that would go past their capacity with
//! [`StoreError::QuotaExceeded`] and leave the previous value in place.
use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::StoreError;

pub type ResultStore<T> = Result<T, StoreError>;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> ResultStore<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> ResultStore<()>;
    fn remove(&mut self, key: &str) -> ResultStore<()>;
}

/// In-process store. Capacity counts key and value bytes.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    capacity: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: Some(bytes),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ResultStore<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> ResultStore<()> {
        if let Some(capacity) = self.capacity {
            let current = self.entries.get(key).map_or(0, |old| key.len() + old.len());
            let others = self.used_bytes() - current;
            let needed = key.len() + value.len();
            if others + needed > capacity {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed: needed as u64,
                    available: capacity.saturating_sub(others) as u64,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> ResultStore<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a directory.
///
/// Writes go through a temporary file renamed over the old value, so a failed
/// write never truncates what was stored.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>, quota: Option<u64>) -> ResultStore<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.tmp"))
    }

    /// Bytes held by every stored value except `skip`.
    fn used_bytes(&self, skip: &str) -> ResultStore<u64> {
        let mut used = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == skip || name.ends_with(".tmp") {
                continue;
            }
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                used += metadata.len();
            }
        }
        Ok(used)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ResultStore<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> ResultStore<()> {
        let needed = value.len() as u64;
        if let Some(quota) = self.quota {
            let used = self.used_bytes(key)?;
            if used + needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available: quota.saturating_sub(used),
                });
            }
        }

        let tmp = self.tmp_path(key);
        let written = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, self.path(key)));
        match written {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(&tmp);
                if err.kind() == ErrorKind::StorageFull {
                    Err(StoreError::QuotaExceeded {
                        key: key.to_string(),
                        needed,
                        available: 0,
                    })
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn remove(&mut self, key: &str) -> ResultStore<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
