//! Page handle with lazy URL resolution.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use url::Url;

use crate::frames::FrameStore;
use crate::identifiers::{FrameId, TabId};

// ============================================================================
// Page
// ============================================================================

/// A lightweight handle to the page loaded in a tab.
///
/// Handles are cheap, short-lived and recreated per access; they carry the
/// tab id plus, when the host supplied one, the resolved URL. Equality and
/// hashing use the tab id only, so a handle built from just an id keys the
/// same per-page data as one built from a full tab description.
#[derive(Clone)]
pub struct Page {
    id: TabId,
    url: Option<Url>,
    store: Arc<FrameStore>,
}

impl Page {
    /// Creates a page handle.
    ///
    /// Pass `url: None` to resolve lazily through the frame store.
    pub(crate) fn new(id: TabId, url: Option<Url>, store: Arc<FrameStore>) -> Self {
        Self { id, url, store }
    }

    /// Returns the tab ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TabId {
        self.id
    }

    /// Returns the page URL.
    ///
    /// Usually the handle is created from a host tab description that
    /// carries the URL. A handle created from just a tab id falls back to
    /// the main frame's URL recorded in the frame store, and returns `None`
    /// while that is unresolved. No caching beyond the handle's lifetime.
    #[must_use]
    pub fn url(&self) -> Option<Url> {
        if self.url.is_some() {
            return self.url.clone();
        }
        self.store.top_url(self.id)
    }

    /// Checks whether the main frame of this page is known to the store.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.store.get_frame(self.id, FrameId::main()).is_some()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Page {}

impl Hash for Page {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Tests
// ============================================================================
