//! In-memory object backend for testing.

use crate::backend::ObjectBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// In-memory object backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation.
///
/// # Examples
///
/// ```
/// use retrosync_storage::backend::{MockBackend, ObjectBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_objects([
///     ("2024/01/17/12/pi/gba/x.sav", b"save data"),
/// ]);
/// assert!(backend.exists("2024/01/17/12/pi/gba/x.sav").await?);
///
/// backend.put("2024/01/17/13/pi/gba/x.sav", b"newer save data").await?;
/// assert!(backend.exists("2024/01/17/13/pi/gba/x.sav").await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    container: String,
    container_exists: AtomicBool,
    failing_puts: bool,
    storage: RwLock<HashMap<String, (UtcDateTime, Vec<u8>)>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = UtcDateTime::now();
        for (key, data) in objects {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                panic!("MockBackend::with_objects: invalid key {key}");
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            container: "mock-container".to_string(),
            container_exists: AtomicBool::new(true),
            failing_puts: false,
            storage: RwLock::new(map),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Start without a container, as if the bucket was never created.
    pub fn without_container(self) -> Self {
        self.container_exists.store(false, Ordering::SeqCst);
        self
    }

    /// Make every upload fail with a retryable backend error.
    pub fn with_failing_puts(mut self) -> Self {
        self.failing_puts = true;
        self
    }

    /// Insert (or replace) an object with an explicit modification time.
    pub async fn insert_at(&self, key: &str, data: impl Into<Vec<u8>>, modified: UtcDateTime) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.insert(key, (modified, data.into()));
        Ok(())
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, &str); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl ObjectBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn container(&self) -> &str {
        &self.container
    }

    async fn container_exists(&self) -> Result<bool> {
        Ok(self.container_exists.load(Ordering::SeqCst))
    }

    async fn create_container(&self) -> Result<()> {
        self.container_exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let key = validate_key(key)?;
        if self.failing_puts {
            exn::bail!(ErrorKind::BackendError(format!("refusing to store {key}")));
        }
        self.storage.write().await.insert(key, (UtcDateTime::now(), data.to_vec()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let (_modified, data) =
            self.storage.read().await.get(&key).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))?;
        Ok(data)
    }

    async fn head(&self, key: &str) -> Result<Option<UtcDateTime>> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.get(&key).map(|(modified, _)| *modified))
    }
}
