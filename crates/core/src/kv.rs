//! Key-value persistence capability.
//!
//! Values are opaque strings (commonly JSON) that callers (de)serialize
//! themselves. A read miss is `Ok(None)`, never an error.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value at `space/key`, or `None` if absent.
    async fn read(&self, space: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Write the value at `space/key`, replacing any previous value.
    async fn write(&self, space: &str, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Reject empty space or key names.
pub fn check_key(space: &str, key: &str) -> Result<(), StoreError> {
    if space.trim().is_empty() {
        return Err(StoreError::InvalidKey("space must not be empty".into()));
    }
    if key.trim().is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".into()));
    }
    Ok(())
}

/// Read and decode a JSON value.
///
/// Corrupt JSON is logged and reported as a miss, so callers fall back to
/// their defaults.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    space: &str,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(raw) = store.read(space, key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(space, key, error = %e, "Ignoring corrupt persisted value");
            Ok(None)
        }
    }
}

/// Read and decode a JSON value, failing on corrupt data.
///
/// Read-modify-write paths use this so a value that does not decode is
/// never replaced by a default.
pub async fn read_json_strict<T: DeserializeOwned>(
    store: &dyn KvStore,
    space: &str,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.read(space, key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON value.
pub async fn write_json<T: Serialize + Sync>(
    store: &dyn KvStore,
    space: &str,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string_pretty(value)?;
    store.write(space, key, &raw).await
}
