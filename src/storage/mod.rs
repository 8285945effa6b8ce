//! Tiered persistent file storage.
//!
//! Filter lists and other extension files are persisted as line-oriented
//! entries in the host's key-value storage. [`FileStore`] fronts an ordered
//! list of [`StorageBackend`] tiers: a fast volatile tier first (legacy
//! entries, caches), the durable host tier last. Reads try the tiers in
//! order and lazily migrate a hit forward to the durable tier; writes go
//! straight to the durable tier and clear stale copies from the tiers in
//! front of it.
//!
//! # Errors
//!
//! A present-but-undecodable entry surfaces as [`Error::Corrupted`]; no
//! repair or deletion is attempted. An entry absent in every tier surfaces
//! as [`Error::DoesNotExist`]. The two are deliberately distinct.

// ============================================================================
// Submodules
// ============================================================================

mod backend;

pub use backend::{MemoryBackend, StorageBackend};

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::events::EventTarget;

// ============================================================================
// Constants
// ============================================================================

/// Prefix namespacing file entries within the shared key-value store.
const KEY_PREFIX: &str = "file:";

// ============================================================================
// Types
// ============================================================================

/// Persisted entry layout (JSON in the backing store).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    content: Vec<String>,
    last_modified: u64,
}

/// Metadata returned by [`FileStore::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Last write time, milliseconds since the Unix epoch.
    pub last_modified: u64,
}

/// Change kind carried by [`StorageChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The entry was written or replaced.
    Set,
    /// The entry was removed.
    Removed,
}

/// Payload of the storage change-notification stream.
#[derive(Debug, Clone)]
pub struct StorageChange {
    /// File path the change applies to.
    pub path: String,
    /// What happened.
    pub kind: ChangeKind,
}

// ============================================================================
// FileStore
// ============================================================================

/// Line-oriented file storage over ordered key-value tiers.
pub struct FileStore {
    /// Tiers in read order; the last one is durable.
    tiers: Vec<Arc<dyn StorageBackend>>,
    on_changed: EventTarget<StorageChange>,
}

impl FileStore {
    /// Creates a store over the given tiers.
    ///
    /// Tiers are tried in order on read; the last tier is the durable one
    /// all writes target.
    ///
    /// # Panics
    ///
    /// Panics if `tiers` is empty.
    #[must_use]
    pub fn new(tiers: Vec<Arc<dyn StorageBackend>>) -> Self {
        assert!(!tiers.is_empty(), "FileStore requires at least one tier");
        Self {
            tiers,
            on_changed: EventTarget::new(),
        }
    }

    /// Change-notification stream, fired after writes, renames and removes.
    #[inline]
    #[must_use]
    pub fn on_changed(&self) -> &EventTarget<StorageChange> {
        &self.on_changed
    }
}

// ============================================================================
// FileStore - Operations
// ============================================================================

impl FileStore {
    /// Reads a file, invoking `listener` with each content line in order
    /// and then once with `None` to mark the end.
    pub async fn read_lines<F>(&self, path: &str, mut listener: F) -> Result<()>
    where
        F: FnMut(Option<&str>),
    {
        let entry = self.load(path).await?;
        for line in &entry.content {
            listener(Some(line));
        }
        listener(None);
        Ok(())
    }

    /// Writes a file's content lines, replacing any previous content.
    pub async fn write(&self, path: &str, lines: Vec<String>) -> Result<()> {
        let entry = FileEntry {
            content: lines,
            last_modified: now_millis(),
        };
        self.store_entry(path, &entry).await?;
        self.notify(path, ChangeKind::Set);
        Ok(())
    }

    /// Copies a file's content to a new path.
    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let source = self.load(from).await?;
        let entry = FileEntry {
            content: source.content,
            last_modified: now_millis(),
        };
        self.store_entry(to, &entry).await?;
        self.notify(to, ChangeKind::Set);
        Ok(())
    }

    /// Moves a file to a new path, keeping its timestamp.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let entry = self.load(from).await?;
        self.remove_from_all_tiers(&key_for(from)).await?;
        self.store_entry(to, &entry).await?;

        self.notify(from, ChangeKind::Removed);
        self.notify(to, ChangeKind::Set);
        Ok(())
    }

    /// Removes a file from every tier. Removing an absent file is a no-op.
    pub async fn remove(&self, path: &str) -> Result<()> {
        self.remove_from_all_tiers(&key_for(path)).await?;
        self.notify(path, ChangeKind::Removed);
        Ok(())
    }

    /// Returns file metadata.
    ///
    /// A missing file surfaces as [`Error::DoesNotExist`], like any other
    /// read.
    pub async fn stat(&self, path: &str) -> Result<FileStat> {
        let entry = self.load(path).await?;
        Ok(FileStat {
            last_modified: entry.last_modified,
        })
    }
}

// ============================================================================
// FileStore - Internal
// ============================================================================

impl FileStore {
    /// Loads an entry, trying tiers in order.
    ///
    /// A hit in a non-durable tier is migrated to the durable tier and
    /// removed from the tier it was found in, so legacy entries move
    /// forward on first use. A corrupted entry is left where it is.
    async fn load(&self, path: &str) -> Result<FileEntry> {
        let key = key_for(path);
        let last = self.tiers.len() - 1;

        for (index, tier) in self.tiers.iter().enumerate() {
            let Some(raw) = tier.get(&key).await? else {
                continue;
            };

            let entry: FileEntry =
                serde_json::from_str(&raw).map_err(|_| Error::corrupted(&key))?;

            if index < last {
                trace!(%key, tier = index, "Migrating entry to durable tier");
                self.tiers[last].set(&key, &raw).await?;
                tier.remove(&key).await?;
            }

            return Ok(entry);
        }

        Err(Error::does_not_exist(key))
    }

    async fn store_entry(&self, path: &str, entry: &FileEntry) -> Result<()> {
        let key = key_for(path);
        let raw = serde_json::to_string(entry)?;
        let last = self.tiers.len() - 1;

        // Stale copies in front of the durable tier would shadow the write.
        for tier in &self.tiers[..last] {
            tier.remove(&key).await?;
        }
        self.tiers[last].set(&key, &raw).await?;

        debug!(%key, lines = entry.content.len(), "Stored entry");
        Ok(())
    }

    async fn remove_from_all_tiers(&self, key: &str) -> Result<()> {
        for tier in &self.tiers {
            tier.remove(key).await?;
        }
        Ok(())
    }

    fn notify(&self, path: &str, kind: ChangeKind) {
        self.on_changed.dispatch(&StorageChange {
            path: path.to_string(),
            kind,
        });
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Maps a file path to its storage key.
fn key_for(path: &str) -> String {
    format!("{KEY_PREFIX}{path}")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    fn two_tier_store() -> (FileStore, Arc<MemoryBackend>, Arc<MemoryBackend>) {
        let fast = Arc::new(MemoryBackend::new());
        let durable = Arc::new(MemoryBackend::new());
        let store = FileStore::new(vec![
            Arc::clone(&fast) as Arc<dyn StorageBackend>,
            Arc::clone(&durable) as Arc<dyn StorageBackend>,
        ]);
        (store, fast, durable)
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_write_then_read_lines_in_order_with_terminator() {
        let (store, _fast, _durable) = two_tier_store();
        store.write("patterns.ini", lines(&["a", "b", "c"])).await.unwrap();

        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let result = store
            .read_lines("patterns.ini", move |line| {
                sink.lock().push(line.map(str::to_string));
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(
            seen.lock().as_slice(),
            &[
                Some("a".to_string()),
                Some("b".to_string()),
                Some("c".to_string()),
                None
            ]
        );
    }

    #[tokio::test]
    async fn test_miss_in_both_tiers_is_does_not_exist() {
        let (store, _fast, _durable) = two_tier_store();
        let err = store.read_lines("absent", |_| {}).await.unwrap_err();
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_surfaced_not_repaired() {
        let (store, fast, durable) = two_tier_store();
        fast.seed("file:broken", "not json {");

        let err = store.read_lines("broken", |_| {}).await.unwrap_err();
        assert!(err.is_corrupted());

        // The damaged entry is left in place and never migrated.
        assert!(fast.get("file:broken").await.unwrap().is_some());
        assert!(durable.get("file:broken").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_legacy_entry_migrates_on_read() {
        let (store, fast, durable) = two_tier_store();
        fast.seed(
            "file:legacy",
            r#"{"content":["old"],"lastModified":123}"#,
        );

        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .read_lines("legacy", move |line| {
                sink.lock().push(line.map(str::to_string));
            })
            .await
            .unwrap();

        assert_eq!(seen.lock().len(), 2);
        assert!(fast.get("file:legacy").await.unwrap().is_none());
        assert!(durable.get("file:legacy").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_write_targets_durable_tier_and_clears_fast() {
        let (store, fast, durable) = two_tier_store();
        fast.seed("file:f", r#"{"content":["stale"],"lastModified":1}"#);

        store.write("f", lines(&["fresh"])).await.unwrap();
        assert!(fast.get("file:f").await.unwrap().is_none());
        assert!(durable.get("file:f").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_copy_and_stat() {
        let (store, _fast, _durable) = two_tier_store();
        store.write("src", lines(&["x"])).await.unwrap();
        store.copy("src", "dst").await.unwrap();

        let stat = store.stat("dst").await.unwrap();
        assert!(stat.last_modified > 0);

        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .read_lines("dst", move |line| {
                sink.lock().push(line.map(str::to_string));
            })
            .await
            .unwrap();
        assert_eq!(seen.lock().as_slice(), &[Some("x".to_string()), None]);
    }

    #[tokio::test]
    async fn test_rename_removes_source() {
        let (store, _fast, _durable) = two_tier_store();
        store.write("old", lines(&["x"])).await.unwrap();
        store.rename("old", "new").await.unwrap();

        assert!(store.stat("old").await.unwrap_err().is_missing());
        assert!(store.stat("new").await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_notifies() {
        let (store, _fast, _durable) = two_tier_store();
        store.write("f", lines(&["x"])).await.unwrap();

        let changes: Arc<Mutex<Vec<(String, ChangeKind)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        store.on_changed().add_listener(move |change| {
            sink.lock().push((change.path.clone(), change.kind));
        });

        store.remove("f").await.unwrap();
        store.remove("f").await.unwrap();

        assert!(store.stat("f").await.unwrap_err().is_missing());
        assert_eq!(
            changes.lock().as_slice(),
            &[
                ("f".to_string(), ChangeKind::Removed),
                ("f".to_string(), ChangeKind::Removed)
            ]
        );
    }
}
