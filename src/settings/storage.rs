use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage is not writable: {0}")]
    ReadOnly(String),
}

/// Durable string key-value storage, the local-storage analogue the
/// settings are persisted to.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage. Survives a store reload as long as the value is kept.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage backed by a single JSON object file.
///
/// The whole object is rewritten through a temp file and rename on every
/// `set`, so readers never observe a half-written file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: serde_json::Map<String, serde_json::Value>,
}

impl JsonFileStorage {
    /// Open the file at `path`. A missing file starts out empty; an
    /// unparseable one is reported so the caller can decide to start fresh.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => serde_json::Map::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings file at {}, starting empty", path.display());
                serde_json::Map::new()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|value| value.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let parsed: serde_json::Value = serde_json::from_str(value)?;
        self.entries.insert(key.to_string(), parsed);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let payload = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, payload.as_bytes())?;
        Ok(())
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), std::io::Error> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, payload)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{JsonFileStorage, KeyValueStore, MemoryStorage};

    fn test_temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir().join(format!(
            "narration-rs-{name}-{}-{nanos}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("temp dir should be created");
        dir
    }

    #[test]
    fn memory_storage_returns_what_was_set() {
        let mut storage = MemoryStorage::default();
        assert_eq!(storage.get("k").expect("get"), None);
        storage.set("k", "\"v\"").expect("set");
        assert_eq!(storage.get("k").expect("get").as_deref(), Some("\"v\""));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn json_file_storage_survives_reopen() {
        let root = test_temp_dir("reopen");
        let path = root.join("nested").join("settings.json");

        let mut storage = JsonFileStorage::open(&path).expect("missing file opens empty");
        storage.set("accessibility.darkMode", "true").expect("set");
        storage
            .set("accessibility.fontScale", "\"large\"")
            .expect("set");

        let reopened = JsonFileStorage::open(&path).expect("reopen");
        assert_eq!(
            reopened.get("accessibility.darkMode").expect("get").as_deref(),
            Some("true")
        );
        assert_eq!(
            reopened
                .get("accessibility.fontScale")
                .expect("get")
                .as_deref(),
            Some("\"large\"")
        );
        assert!(!path.with_extension("json.tmp").exists());

        fs::remove_dir_all(&root).expect("temporary directory should be removed");
    }

    #[test]
    fn json_file_storage_rejects_corrupt_file() {
        let root = test_temp_dir("corrupt");
        let path = root.join("settings.json");
        fs::write(&path, "{ not json").expect("write corrupt payload");

        assert!(JsonFileStorage::open(&path).is_err());

        fs::remove_dir_all(&root).expect("temporary directory should be removed");
    }
}
