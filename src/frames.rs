//! Per-tab frame tree storage.
//!
//! [`FrameStore`] maps each tab to the frames the host has reported for it.
//! Records reference their parent by [`FrameId`] key rather than by owning
//! pointer, so ownership stays single-directional: the tab map owns the
//! records, ancestors are reached by lookup.
//!
//! The store is mutated only by the page tracker; the request interceptor
//! and [`Page`](crate::pages::Page) read from it.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use url::Url;

use crate::host::TabSnapshot;
use crate::identifiers::{FrameId, TabId};

// ============================================================================
// FrameRecord
// ============================================================================

/// A navigable document context within a tab.
///
/// `parent` is a non-owning key into the same tab's frame map; following
/// parent links terminates at the main frame (`parent == None`) or at an
/// ancestor the host never described.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameRecord {
    /// Frame URL, `None` until a navigation commits.
    pub url: Option<Url>,
    /// Parent frame key, `None` for the main frame.
    pub parent: Option<FrameId>,
}

// ============================================================================
// FrameStore
// ============================================================================

/// Mapping from tab to frame tree.
///
/// A tab's sub-map is created on the first observed frame event for that
/// tab (or bulk-populated at startup via [`bootstrap`](Self::bootstrap))
/// and deleted in its entirety when the tab closes or is replaced.
#[derive(Debug, Default)]
pub struct FrameStore {
    tabs: RwLock<FxHashMap<TabId, FxHashMap<FrameId, FrameRecord>>>,
}

impl FrameStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// FrameStore - Lookups
// ============================================================================

impl FrameStore {
    /// Looks up a frame record. Pure read, no allocation on miss.
    #[must_use]
    pub fn get_frame(&self, tab_id: TabId, frame_id: FrameId) -> Option<FrameRecord> {
        self.tabs
            .read()
            .get(&tab_id)
            .and_then(|frames| frames.get(&frame_id))
            .cloned()
    }

    /// Returns the URL of a tab's main frame, if recorded.
    #[must_use]
    pub fn top_url(&self, tab_id: TabId) -> Option<Url> {
        self.tabs
            .read()
            .get(&tab_id)
            .and_then(|frames| frames.get(&FrameId::main()))
            .and_then(|frame| frame.url.clone())
    }

    /// Checks whether any frames are recorded for a tab.
    #[must_use]
    pub fn contains_tab(&self, tab_id: TabId) -> bool {
        self.tabs.read().contains_key(&tab_id)
    }

    /// Walks parent links from a frame, returning the chain excluding the
    /// starting frame.
    ///
    /// The walk is guarded against malformed host input: a revisited frame
    /// ends the chain, so traversal always terminates.
    #[must_use]
    pub fn parent_chain(&self, tab_id: TabId, frame_id: FrameId) -> Vec<(FrameId, FrameRecord)> {
        let tabs = self.tabs.read();
        let Some(frames) = tabs.get(&tab_id) else {
            return Vec::new();
        };

        let mut chain = Vec::new();
        let mut visited = FxHashSet::default();
        visited.insert(frame_id);

        let mut current = frames.get(&frame_id).and_then(|frame| frame.parent);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let Some(record) = frames.get(&id) else {
                break;
            };
            chain.push((id, record.clone()));
            current = record.parent;
        }

        chain
    }
}

// ============================================================================
// FrameStore - Mutation
// ============================================================================

impl FrameStore {
    /// Records the parent of a frame, creating the record if absent.
    ///
    /// The parent link is only attached when the parent's record already
    /// exists in the tab; an unknown parent leaves the link unset.
    pub fn record_parent(
        &self,
        tab_id: TabId,
        frame_id: FrameId,
        parent_frame_id: Option<FrameId>,
    ) {
        let mut tabs = self.tabs.write();
        let frames = tabs.entry(tab_id).or_default();

        let parent = parent_frame_id.filter(|id| frames.contains_key(id));
        frames.entry(frame_id).or_default().parent = parent;

        trace!(%tab_id, %frame_id, ?parent, "Recorded frame parent");
    }

    /// Sets a frame's URL, creating the record if absent.
    pub fn set_url(&self, tab_id: TabId, frame_id: FrameId, url: Url) {
        let mut tabs = self.tabs.write();
        tabs.entry(tab_id).or_default().entry(frame_id).or_default().url = Some(url);
    }

    /// Deletes a tab's entire frame map. No-op if the tab is unknown.
    pub fn remove_tab(&self, tab_id: TabId) {
        if self.tabs.write().remove(&tab_id).is_some() {
            debug!(%tab_id, "Dropped frame map");
        }
    }

    /// Bulk-populates the store from a startup enumeration of open tabs.
    ///
    /// Two passes per tab: all records are created with their URL first,
    /// parent links are resolved second, because the host may enumerate a
    /// child frame before its parent.
    pub fn bootstrap(&self, snapshot: &[TabSnapshot]) {
        let mut tabs = self.tabs.write();

        for tab in snapshot {
            if tab.frames.is_empty() {
                continue;
            }

            let mut frames: FxHashMap<FrameId, FrameRecord> = FxHashMap::default();
            for frame in &tab.frames {
                frames.insert(
                    frame.frame_id,
                    FrameRecord {
                        url: Some(frame.url.clone()),
                        parent: None,
                    },
                );
            }
            for frame in &tab.frames {
                if let Some(parent) = frame.parent_frame_id
                    && frames.contains_key(&parent)
                    && let Some(record) = frames.get_mut(&frame.frame_id)
                {
                    record.parent = Some(parent);
                }
            }

            debug!(tab_id = %tab.tab_id, frames = frames.len(), "Bootstrapped tab");
            tabs.insert(tab.tab_id, frames);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::host::FrameSnapshot;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test url")
    }

    #[test]
    fn test_get_frame_absent() {
        let store = FrameStore::new();
        assert!(store.get_frame(TabId::new(1), FrameId::main()).is_none());
    }

    #[test]
    fn test_set_url_creates_record() {
        let store = FrameStore::new();
        store.set_url(TabId::new(1), FrameId::main(), url("https://a.test/"));

        let frame = store.get_frame(TabId::new(1), FrameId::main()).unwrap();
        assert_eq!(frame.url, Some(url("https://a.test/")));
        assert_eq!(frame.parent, None);
    }

    #[test]
    fn test_record_parent_requires_existing_parent() {
        let store = FrameStore::new();
        let tab = TabId::new(1);

        // Parent 0 does not exist yet, link stays unset.
        store.record_parent(tab, FrameId::new(3), Some(FrameId::main()));
        assert_eq!(store.get_frame(tab, FrameId::new(3)).unwrap().parent, None);

        store.set_url(tab, FrameId::main(), url("https://a.test/"));
        store.record_parent(tab, FrameId::new(4), Some(FrameId::main()));
        assert_eq!(
            store.get_frame(tab, FrameId::new(4)).unwrap().parent,
            Some(FrameId::main())
        );
    }

    #[test]
    fn test_remove_tab_is_idempotent() {
        let store = FrameStore::new();
        let tab = TabId::new(2);
        store.set_url(tab, FrameId::main(), url("https://a.test/"));

        store.remove_tab(tab);
        assert!(store.get_frame(tab, FrameId::main()).is_none());
        store.remove_tab(tab);
        assert!(!store.contains_tab(tab));
    }

    #[test]
    fn test_top_url() {
        let store = FrameStore::new();
        let tab = TabId::new(3);
        assert!(store.top_url(tab).is_none());

        store.set_url(tab, FrameId::new(5), url("https://iframe.test/"));
        assert!(store.top_url(tab).is_none());

        store.set_url(tab, FrameId::main(), url("https://a.test/"));
        assert_eq!(store.top_url(tab), Some(url("https://a.test/")));
    }

    #[test]
    fn test_bootstrap_resolves_children_listed_before_parents() {
        let store = FrameStore::new();
        let tab = TabId::new(7);

        store.bootstrap(&[TabSnapshot {
            tab_id: tab,
            frames: vec![
                FrameSnapshot {
                    frame_id: FrameId::new(3),
                    parent_frame_id: Some(FrameId::main()),
                    url: url("https://b.test/frame"),
                },
                FrameSnapshot {
                    frame_id: FrameId::main(),
                    parent_frame_id: None,
                    url: url("https://a.test/"),
                },
            ],
        }]);

        let child = store.get_frame(tab, FrameId::new(3)).unwrap();
        assert_eq!(child.parent, Some(FrameId::main()));
        assert_eq!(child.url, Some(url("https://b.test/frame")));
        assert_eq!(store.top_url(tab), Some(url("https://a.test/")));
    }

    #[test]
    fn test_parent_chain_terminates_at_main_frame() {
        let store = FrameStore::new();
        let tab = TabId::new(1);
        store.set_url(tab, FrameId::main(), url("https://a.test/"));
        store.record_parent(tab, FrameId::new(3), Some(FrameId::main()));
        store.record_parent(tab, FrameId::new(9), Some(FrameId::new(3)));

        let chain = store.parent_chain(tab, FrameId::new(9));
        let ids: Vec<FrameId> = chain.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![FrameId::new(3), FrameId::main()]);
        assert_eq!(chain.last().unwrap().1.parent, None);
    }

    proptest! {
        // For any per-tab causal sequence of before-navigate/committed
        // events, every parent chain is acyclic and terminates.
        #[test]
        fn prop_parent_chains_are_acyclic(
            events in proptest::collection::vec((0u64..8, 0u64..8, proptest::bool::ANY), 0..64)
        ) {
            let store = FrameStore::new();
            let tab = TabId::new(1);

            for (frame, parent, committed) in events {
                store.record_parent(tab, FrameId::new(frame), Some(FrameId::new(parent)));
                if committed {
                    store.set_url(tab, FrameId::new(frame), url("https://a.test/"));
                }
            }

            for frame in 0..8 {
                let chain = store.parent_chain(tab, FrameId::new(frame));
                prop_assert!(chain.len() <= 8);

                let mut seen = std::collections::HashSet::new();
                seen.insert(FrameId::new(frame));
                for (id, _) in &chain {
                    prop_assert!(seen.insert(*id), "cycle through frame {id}");
                }
            }
        }
    }
}
