//! Settings Storage backed by a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// File-backed settings store.
///
/// Every value lives in one JSON object on disk, typed by its JSON kind
/// (string, bool, number). The whole document is rewritten on each change
/// through a temporary file and a rename, so a crash mid-write leaves the
/// previous document intact.
pub struct JsonSettingsStore {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// Open (or start) the settings document at `path`.
    ///
    /// Runs synchronously so it can be called from configuration builders
    /// outside a runtime. A missing file is an empty store; a corrupt file is
    /// an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => Map::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(map) => map,
                _ => {
                    return Err(BridgeError::OperationFailed(format!(
                        "Settings file is not a JSON object: {}",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, keys = values.len(), "Opened settings store");

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Store that never touches disk (for testing).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    /// `<user config dir>/podcast-core/settings.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("podcast-core").join("settings.json"))
    }

    async fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(values)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().await;
        let previous = values.insert(key.to_string(), value);

        if let Err(e) = self.persist(&values).await {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            error!(key, error = %e, "Failed to persist setting");
            return Err(e);
        }

        debug!(key, "Stored setting");
        Ok(())
    }

    async fn get_value<T>(
        &self,
        key: &str,
        expected: &str,
        extract: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<Option<T>> {
        let values = self.values.lock().await;
        match values.get(key) {
            None => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| {
                error!(key, expected, "Type mismatch");
                BridgeError::OperationFailed(format!(
                    "Type mismatch for '{}': expected {}",
                    key, expected
                ))
            }),
        }
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string())).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key, "string", |v| v.as_str().map(str::to_string))
            .await
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, Value::Bool(value)).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get_value(key, "bool", Value::as_bool).await
    }

    async fn set_f64(&self, key: &str, value: f64) -> Result<()> {
        let number = Number::from_f64(value).ok_or_else(|| {
            BridgeError::OperationFailed(format!("Cannot store non-finite value for '{}'", key))
        })?;
        self.set_value(key, Value::Number(number)).await
    }

    async fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        self.get_value(key, "number", Value::as_f64).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        if let Some(old) = values.remove(key) {
            if let Err(e) = self.persist(&values).await {
                values.insert(key.to_string(), old);
                return Err(e);
            }
            debug!(key, "Deleted setting");
        }
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().await.contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.values.lock().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
