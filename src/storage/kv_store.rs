use crate::error::{LedgerError, Result};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

const FILES_TREE: &str = "files";

/// Byte storage the wallet persists through
pub trait Storage: Send + Sync {
    /// `LedgerError::NotFound` when nothing is stored under `path`
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;
}

/// Process-local storage, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.read().contains_key(path)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(path.to_string()))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.entries.write().insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Storage backed by a sled database; each path is a key in one tree
pub struct SledStorage {
    tree: sled::Tree,
}

impl SledStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        let tree = db.open_tree(FILES_TREE)?;
        debug!("Opened sled storage at {}", path.as_ref().display());
        Ok(SledStorage { tree })
    }
}

impl Storage for SledStorage {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        match self.tree.get(path)? {
            Some(value) => Ok(value.to_vec()),
            None => Err(LedgerError::NotFound(path.to_string())),
        }
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.tree.insert(path, bytes)?;
        self.tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(
            storage.read("wallet.dat"),
            Err(LedgerError::NotFound("wallet.dat".to_string()))
        );
        storage.write("wallet.dat", b"blob").unwrap();
        assert!(storage.contains("wallet.dat"));
        assert_eq!(storage.read("wallet.dat").unwrap(), b"blob".to_vec());
    }

    #[test]
    fn test_sled_storage_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let storage = SledStorage::open(dir.path()).unwrap();
            assert!(matches!(
                storage.read("wallet.dat"),
                Err(LedgerError::NotFound(_))
            ));
            storage.write("wallet.dat", b"first").unwrap();
            storage.write("wallet.dat", b"second").unwrap();
        }
        let storage = SledStorage::open(dir.path()).unwrap();
        assert_eq!(storage.read("wallet.dat").unwrap(), b"second".to_vec());
    }
}
