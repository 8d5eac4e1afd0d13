//! The persistent store contract and a JSON-file-backed implementation.
//!
//! The pipeline core only depends on the [`DataStore`] trait; reads and
//! writes are treated as atomic per key. [`JsonStore`] persists everything
//! in a single JSON document under the workspace database directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub trait DataStore: Send + Sync {
    fn get_hints(&self, pkid: &str) -> Option<Value>;
    fn set_hints(&self, pkid: &str, blob: Value) -> Result<()>;

    fn get_repo_info(&self, suite: &str, section: &str, arch: &str) -> Option<Value>;
    fn set_repo_info(&self, suite: &str, section: &str, arch: &str, info: Value) -> Result<()>;

    /// Append a statistics blob under the current time.
    fn add_statistics(&self, blob: Value) -> Result<()>;
    fn get_statistics(&self) -> Result<BTreeMap<i64, Value>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    hints: BTreeMap<String, Value>,
    #[serde(default)]
    repo_info: BTreeMap<String, Value>,
    #[serde(default)]
    statistics: BTreeMap<i64, Value>,
}

/// Write-through store persisting to `<dir>/asgen-db.json`.
pub struct JsonStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create database directory {}", dir.display()))?;
        let path = dir.join("asgen-db.json");
        let data = if path.is_file() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("corrupt database file {}", path.display()))?
        } else {
            StoreData::default()
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    fn repo_key(suite: &str, section: &str, arch: &str) -> String {
        format!("{suite}/{section}/{arch}")
    }
}

impl DataStore for JsonStore {
    fn get_hints(&self, pkid: &str) -> Option<Value> {
        self.data.lock().unwrap().hints.get(pkid).cloned()
    }

    fn set_hints(&self, pkid: &str, blob: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.hints.insert(pkid.to_string(), blob);
        self.persist(&data)
    }

    fn get_repo_info(&self, suite: &str, section: &str, arch: &str) -> Option<Value> {
        let key = Self::repo_key(suite, section, arch);
        self.data.lock().unwrap().repo_info.get(&key).cloned()
    }

    fn set_repo_info(&self, suite: &str, section: &str, arch: &str, info: Value) -> Result<()> {
        let key = Self::repo_key(suite, section, arch);
        let mut data = self.data.lock().unwrap();
        data.repo_info.insert(key, info);
        self.persist(&data)
    }

    fn add_statistics(&self, blob: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let mut ts = unix_now();
        // Keep one blob per timestamp key; nudge forward on collision.
        while data.statistics.contains_key(&ts) {
            ts += 1;
        }
        data.statistics.insert(ts, blob);
        self.persist(&data)
    }

    fn get_statistics(&self) -> Result<BTreeMap<i64, Value>> {
        Ok(self.data.lock().unwrap().statistics.clone())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a statistics sample at an explicit timestamp.
    pub fn put_statistics_at(&self, ts: i64, blob: Value) {
        self.data.lock().unwrap().statistics.insert(ts, blob);
    }
}

impl DataStore for MemoryStore {
    fn get_hints(&self, pkid: &str) -> Option<Value> {
        self.data.lock().unwrap().hints.get(pkid).cloned()
    }

    fn set_hints(&self, pkid: &str, blob: Value) -> Result<()> {
        self.data.lock().unwrap().hints.insert(pkid.to_string(), blob);
        Ok(())
    }

    fn get_repo_info(&self, suite: &str, section: &str, arch: &str) -> Option<Value> {
        let key = JsonStore::repo_key(suite, section, arch);
        self.data.lock().unwrap().repo_info.get(&key).cloned()
    }

    fn set_repo_info(&self, suite: &str, section: &str, arch: &str, info: Value) -> Result<()> {
        let key = JsonStore::repo_key(suite, section, arch);
        self.data.lock().unwrap().repo_info.insert(key, info);
        Ok(())
    }

    fn add_statistics(&self, blob: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let mut ts = unix_now();
        while data.statistics.contains_key(&ts) {
            ts += 1;
        }
        data.statistics.insert(ts, blob);
        Ok(())
    }

    fn get_statistics(&self) -> Result<BTreeMap<i64, Value>> {
        Ok(self.data.lock().unwrap().statistics.clone())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_store_round_trips_hints() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();

        assert_eq!(store.get_hints("foo/1.0/amd64"), None);
        store
            .set_hints("foo/1.0/amd64", json!({"foo.desktop": []}))
            .unwrap();
        assert_eq!(
            store.get_hints("foo/1.0/amd64"),
            Some(json!({"foo.desktop": []}))
        );

        // Reopen from disk.
        drop(store);
        let store = JsonStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get_hints("foo/1.0/amd64"),
            Some(json!({"foo.desktop": []}))
        );
    }

    #[test]
    fn repo_info_is_keyed_by_slice() {
        let store = MemoryStore::new();
        store.set_repo_info("sid", "main", "amd64", json!({"mtime": 42})).unwrap();
        assert_eq!(
            store.get_repo_info("sid", "main", "amd64"),
            Some(json!({"mtime": 42}))
        );
        assert_eq!(store.get_repo_info("sid", "main", "arm64"), None);
    }

    #[test]
    fn statistics_never_collide_on_the_same_second() {
        let store = MemoryStore::new();
        store.add_statistics(json!({"n": 1})).unwrap();
        store.add_statistics(json!({"n": 2})).unwrap();
        assert_eq!(store.get_statistics().unwrap().len(), 2);
    }
}
