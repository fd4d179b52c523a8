//! Key-value stores for domain snapshots

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FEAError, FEAResult};

/// Minimal string store used by `Domain::save` / `Domain::restore`
pub trait KeyValueStore {
    fn put(&mut self, key: &str, value: &str) -> FEAResult<()>;
    fn get(&self, key: &str) -> FEAResult<Option<String>>;
    fn remove(&mut self, key: &str) -> FEAResult<()>;
    fn keys(&self) -> FEAResult<Vec<String>>;
    fn clear(&mut self) -> FEAResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&mut self, key: &str, value: &str) -> FEAResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> FEAResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> FEAResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> FEAResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn clear(&mut self) -> FEAResult<()> {
        self.entries.clear();
        Ok(())
    }
}

/// One `<key>.json` file per entry under a directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> FEAResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path(&self, key: &str) -> FEAResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(FEAError::InvalidInput(format!("invalid store key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for DirectoryStore {
    fn put(&mut self, key: &str, value: &str) -> FEAResult<()> {
        fs::write(self.path(key)?, value)?;
        Ok(())
    }

    fn get(&self, key: &str) -> FEAResult<Option<String>> {
        let path = self.path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn remove(&mut self, key: &str) -> FEAResult<()> {
        let path = self.path(key)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self) -> FEAResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear(&mut self) -> FEAResult<()> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut s = MemoryStore::new();
        s.put("a", "1").unwrap();
        s.put("b", "2").unwrap();
        assert_eq!(s.get("a").unwrap().as_deref(), Some("1"));
        s.remove("a").unwrap();
        assert_eq!(s.keys().unwrap(), vec!["b".to_string()]);
        s.clear().unwrap();
        assert!(s.get("b").unwrap().is_none());
    }

    #[test]
    fn test_directory_store() {
        let dir = std::env::temp_dir().join(format!("fiber-fea-store-{}", std::process::id()));
        let mut s = DirectoryStore::open(&dir).unwrap();
        s.put("domain-3", "{}").unwrap();
        assert_eq!(s.keys().unwrap(), vec!["domain-3".to_string()]);
        assert_eq!(s.get("domain-3").unwrap().as_deref(), Some("{}"));
        assert!(s.put("../escape", "x").is_err());
        s.clear().unwrap();
        assert!(s.keys().unwrap().is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }
}
