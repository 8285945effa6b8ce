//! Storage backend trait and the built-in volatile tier.

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::Result;

// ============================================================================
// StorageBackend
// ============================================================================

/// A key-value storage tier.
///
/// Implementations wrap a host storage area (the durable tier) or an
/// in-process map (the fast volatile tier). Values are opaque strings; the
/// [`FileStore`](crate::storage::FileStore) owns the entry encoding.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads a value. `Ok(None)` means the key is absent in this tier.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key. Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-process map tier; fast and volatile.
///
/// Used as the first tier in front of the host's durable storage, and as a
/// stand-in durable tier in tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty tier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds a key, bypassing the async API. Handy for tests and for
    /// importing legacy entries.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(key.into(), value.into());
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
