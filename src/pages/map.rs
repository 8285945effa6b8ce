//! Per-page associated-data tables.
//!
//! Consumers attach state to a page through a [`PageMap`]; the tracker
//! purges every registered map when the page navigates away or its tab
//! closes, so stale per-page state never leaks across navigations.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::identifiers::TabId;
use crate::pages::Page;

// ============================================================================
// TabScoped
// ============================================================================

/// A table whose entries are scoped to a tab's current page.
pub(crate) trait TabScoped: Send + Sync {
    /// Drops the entry for a tab, if any.
    fn purge(&self, tab_id: TabId);
}

// ============================================================================
// PageMap
// ============================================================================

/// A side table keyed by [`Page`] (i.e. by tab id).
///
/// Created through
/// [`PageTracker::new_page_map`](crate::pages::PageTracker::new_page_map)
/// so the tracker can purge it on navigation and tab removal.
#[derive(Debug)]
pub struct PageMap<T> {
    entries: Mutex<FxHashMap<TabId, T>>,
}

impl<T> PageMap<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(FxHashMap::default()),
        })
    }

    /// Associates a value with the page, replacing any previous one.
    pub fn set(&self, page: &Page, value: T) {
        self.entries.lock().insert(page.id(), value);
    }

    /// Removes and returns the value for the page.
    pub fn remove(&self, page: &Page) -> Option<T> {
        self.entries.lock().remove(&page.id())
    }

    /// Checks whether the page has an associated value.
    #[must_use]
    pub fn contains(&self, page: &Page) -> bool {
        self.entries.lock().contains_key(&page.id())
    }

    /// Returns the number of pages with an associated value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Checks whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: Clone> PageMap<T> {
    /// Returns a clone of the value associated with the page.
    #[must_use]
    pub fn get(&self, page: &Page) -> Option<T> {
        self.entries.lock().get(&page.id()).cloned()
    }
}

impl<T: Send + Sync> TabScoped for PageMap<T> {
    fn purge(&self, tab_id: TabId) {
        self.entries.lock().remove(&tab_id);
    }
}

// ============================================================================
// PageDataRegistry
// ============================================================================

/// Registry of all live page maps, held by the tracker.
///
/// Maps are held weakly; a map dropped by its consumer disappears from the
/// registry on the next purge.
#[derive(Default)]
pub(crate) struct PageDataRegistry {
    maps: Mutex<Vec<Weak<dyn TabScoped>>>,
}

impl PageDataRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, map: Weak<dyn TabScoped>) {
        self.maps.lock().push(map);
    }

    /// Purges a tab's entry from every registered map.
    pub(crate) fn purge_tab(&self, tab_id: TabId) {
        self.maps.lock().retain(|weak| match weak.upgrade() {
            Some(map) => {
                map.purge(tab_id);
                true
            }
            None => false,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::frames::FrameStore;

    fn page(id: u32) -> Page {
        Page::new(TabId::new(id), None, Arc::new(FrameStore::new()))
    }

    #[test]
    fn test_set_get_remove() {
        let map: Arc<PageMap<String>> = PageMap::new();
        let p = page(1);

        assert!(map.get(&p).is_none());
        map.set(&p, "hello".into());
        assert_eq!(map.get(&p).as_deref(), Some("hello"));
        assert_eq!(map.remove(&p).as_deref(), Some("hello"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_registry_purges_all_maps() {
        let registry = PageDataRegistry::new();
        let strings: Arc<PageMap<String>> = PageMap::new();
        let numbers: Arc<PageMap<u32>> = PageMap::new();
        registry.register(Arc::downgrade(&strings) as Weak<dyn TabScoped>);
        registry.register(Arc::downgrade(&numbers) as Weak<dyn TabScoped>);

        let p = page(9);
        strings.set(&p, "x".into());
        numbers.set(&p, 7);

        registry.purge_tab(TabId::new(9));
        assert!(strings.get(&p).is_none());
        assert!(numbers.get(&p).is_none());
    }

    #[test]
    fn test_registry_drops_dead_maps() {
        let registry = PageDataRegistry::new();
        let map: Arc<PageMap<u32>> = PageMap::new();
        registry.register(Arc::downgrade(&map) as Weak<dyn TabScoped>);
        drop(map);

        // Should not panic or retain the dead entry.
        registry.purge_tab(TabId::new(1));
        assert!(registry.maps.lock().is_empty());
    }
}
