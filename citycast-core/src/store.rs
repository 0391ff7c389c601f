//! Last-city persistence.
//!
//! `KeyValueStore` is the device-local async string store. `PreferenceStore`
//! wraps it with best-effort writes and tagged reads.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::Debug,
    io::ErrorKind,
    path::PathBuf,
    sync::Arc,
};

use crate::StoreError;

/// Key under which the last selected city name is kept.
pub const CITY_KEY: &str = "city";

#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// `Ok(None)` when the key was never set.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// String map persisted as a JSON object in a single file.
///
/// Writes land in a sibling temp file which is then renamed over the target,
/// so an interrupted write leaves the previous contents readable.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: tokio::sync::Mutex::new(()) }
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        // A corrupt file is replaced rather than blocking every future write.
        let mut items = match self.read_all().await {
            Ok(items) => items,
            Err(StoreError::Corrupt { .. }) => HashMap::new(),
            Err(e) => return Err(e),
        };
        items.insert(key.to_string(), value.to_string());

        let json = serde_json::to_vec_pretty(&items).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut items = self.read_all().await?;
        Ok(items.remove(key))
    }
}

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.lock().get(key).cloned())
    }
}

/// Outcome of a preference read.
#[derive(Debug)]
pub enum Lookup {
    Found(String),
    NotFound,
    ReadError(StoreError),
}

impl Lookup {
    /// Collapses `NotFound` and `ReadError` into `None`.
    pub fn into_option(self) -> Option<String> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound | Lookup::ReadError(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Best-effort preference persistence over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Writes `value` under `key`. Failures are logged and reported as `false`.
    pub async fn set(&self, key: &str, value: &str) -> bool {
        match self.backend.set_item(key, value).await {
            Ok(()) => {
                tracing::debug!(key, value, "stored preference");
                true
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "error storing preference");
                false
            }
        }
    }

    pub async fn get(&self, key: &str) -> Lookup {
        match self.backend.get_item(key).await {
            Ok(Some(v)) => Lookup::Found(v),
            Ok(None) => Lookup::NotFound,
            Err(e) => {
                tracing::warn!(key, error = %e, "error reading preference");
                Lookup::ReadError(e)
            }
        }
    }

    pub async fn last_city(&self) -> Lookup {
        self.get(CITY_KEY).await
    }

    pub async fn remember_city(&self, name: &str) -> bool {
        self.set(CITY_KEY, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn set_item(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "read-only").into())
        }

        async fn get_item(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied").into())
        }
    }

    fn memory_prefs() -> PreferenceStore {
        PreferenceStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn get_after_set_returns_value() {
        let prefs = memory_prefs();

        for (k, v) in [("city", "London"), ("unit", "celsius"), ("city", "Tokyo")] {
            assert!(prefs.set(k, v).await);
            match prefs.get(k).await {
                Lookup::Found(got) => assert_eq!(got, v),
                other => panic!("expected Found, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn never_set_key_is_not_found() {
        let prefs = memory_prefs();
        assert!(matches!(prefs.get("city").await, Lookup::NotFound));
    }

    #[tokio::test]
    async fn failing_backend_is_swallowed() {
        let prefs = PreferenceStore::new(Arc::new(BrokenStore));

        assert!(!prefs.set("city", "London").await);

        let lookup = prefs.get("city").await;
        assert!(matches!(lookup, Lookup::ReadError(StoreError::Io(_))));
        assert_eq!(lookup.into_option(), None);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs").join("preferences.json");

        let first = PreferenceStore::new(Arc::new(FileStore::new(&path)));
        assert!(first.remember_city("Paris").await);
        assert!(first.remember_city("Tokyo").await);

        let reopened = PreferenceStore::new(Arc::new(FileStore::new(&path)));
        assert_eq!(reopened.last_city().await.into_option().as_deref(), Some("Tokyo"));
        assert!(!dir.path().join("prefs").join("preferences.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = PreferenceStore::new(Arc::new(FileStore::new(dir.path().join("none.json"))));

        assert!(matches!(prefs.last_city().await, Lookup::NotFound));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_error_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{not json").expect("write");

        let prefs = PreferenceStore::new(Arc::new(FileStore::new(&path)));
        assert!(matches!(
            prefs.last_city().await,
            Lookup::ReadError(StoreError::Corrupt { .. })
        ));

        assert!(prefs.remember_city("Lima").await);
        assert!(prefs.last_city().await.is_found());
    }
}
