//! Tab lifecycle and navigation tracking.
//!
//! [`PageTracker`] consumes the host's tab and navigation notifications,
//! keeps the [`FrameStore`] consistent, and emits the normalized page
//! lifecycle events external consumers subscribe to:
//!
//! | Event | Payload | Fired when |
//! |-------|---------|------------|
//! | `on_loading` | [`Page`] | a page starts loading (host tab-updated, or commit of a prerendered tab) |
//! | `on_activated` | [`Page`] | a tab becomes active |
//! | `on_removed` | [`TabId`] | a tab closes or is replaced away |
//!
//! Per-tab notifications are assumed delivered in causal order
//! (before-navigate before committed, committed before a later removal);
//! no reordering or buffering is attempted. Tabs are independent of each
//! other.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use tracing::{debug, trace};
use url::Url;

use crate::events::EventTarget;
use crate::frames::FrameStore;
use crate::host::{Host, NavigationDetails, TabInfo, TabSnapshot, TabStatus};
use crate::identifiers::{FrameId, TabId};
use crate::pages::Page;
use crate::pages::map::{PageDataRegistry, PageMap, TabScoped};

// ============================================================================
// PageTracker
// ============================================================================

/// Reconstructs per-tab page state from host notifications.
///
/// Constructed once by [`ExtensionBridge`](crate::bridge::ExtensionBridge);
/// all per-page side tables and the sitekey fast-path table live here as
/// explicit fields rather than ambient globals.
pub struct PageTracker {
    store: Arc<FrameStore>,
    host: Arc<dyn Host>,
    page_data: PageDataRegistry,

    /// Pages whose structure was already updated ahead of the commit
    /// notification (sitekey fast-path).
    eager_updates: Arc<PageMap<Url>>,

    on_loading: EventTarget<Page>,
    on_activated: EventTarget<Page>,
    on_removed: EventTarget<TabId>,
}

impl PageTracker {
    pub(crate) fn new(store: Arc<FrameStore>, host: Arc<dyn Host>) -> Self {
        let page_data = PageDataRegistry::new();
        let eager_updates: Arc<PageMap<Url>> = PageMap::new();
        page_data.register(Arc::downgrade(&eager_updates) as Weak<dyn TabScoped>);

        Self {
            store,
            host,
            page_data,
            eager_updates,
            on_loading: EventTarget::new(),
            on_activated: EventTarget::new(),
            on_removed: EventTarget::new(),
        }
    }
}

// ============================================================================
// PageTracker - Events & Lookups
// ============================================================================

impl PageTracker {
    /// Event fired when a page starts loading.
    #[inline]
    #[must_use]
    pub fn on_loading(&self) -> &EventTarget<Page> {
        &self.on_loading
    }

    /// Event fired when a tab is activated.
    #[inline]
    #[must_use]
    pub fn on_activated(&self) -> &EventTarget<Page> {
        &self.on_activated
    }

    /// Event fired when a tab closes or is replaced away.
    #[inline]
    #[must_use]
    pub fn on_removed(&self) -> &EventTarget<TabId> {
        &self.on_removed
    }

    /// Creates a page handle for a tab id with lazy URL resolution.
    #[must_use]
    pub fn get_page(&self, tab_id: TabId) -> Page {
        Page::new(tab_id, None, Arc::clone(&self.store))
    }

    /// Creates a per-page side table purged automatically on navigation
    /// and tab removal.
    #[must_use]
    pub fn new_page_map<T: Send + Sync + 'static>(&self) -> Arc<PageMap<T>> {
        let map = PageMap::new();
        self.page_data
            .register(Arc::downgrade(&map) as Weak<dyn TabScoped>);
        map
    }

    fn page(&self, tab_id: TabId, url: Option<Url>) -> Page {
        Page::new(tab_id, url, Arc::clone(&self.store))
    }
}

// ============================================================================
// PageTracker - Navigation Notifications
// ============================================================================

impl PageTracker {
    /// Handles a host before-navigate notification.
    ///
    /// The parent frame must be captured here: the committed notification
    /// does not carry parent-frame information.
    pub fn on_before_navigate(&self, details: &NavigationDetails) {
        trace!(
            tab_id = %details.tab_id,
            frame_id = %details.frame_id,
            "Before navigate"
        );
        self.store
            .record_parent(details.tab_id, details.frame_id, details.parent_frame_id);
    }

    /// Handles a host committed-navigation notification.
    pub async fn on_committed(&self, details: &NavigationDetails) {
        self.update_page_structure(details.tab_id, details.frame_id, &details.url, false)
            .await;
    }

    /// Updates the page/frame structure for a (tab, frame, url).
    ///
    /// With `eager = true` this is the sitekey fast-path: a response header
    /// carried a site key and the structure must be updated before the
    /// commit notification arrives, so the key can be used immediately.
    /// The pair is recorded so the subsequent ordinary commit for the same
    /// (tab, url) does not trash the freshly attached per-page state.
    pub async fn update_page_structure(
        &self,
        tab_id: TabId,
        frame_id: FrameId,
        url: &Url,
        eager: bool,
    ) {
        if frame_id.is_main() {
            let page = self.page(tab_id, Some(url.clone()));

            if self.eager_updates.get(&page).as_ref() != Some(url) {
                // Side tables pertain to the previous page on this tab.
                self.page_data.purge_tab(tab_id);

                if eager {
                    self.eager_updates.set(&page, url.clone());
                }

                // A prerendered tab cannot be resolved by the host and will
                // never receive a tab-updated notification, so onLoading has
                // to fire from here. Visible tabs keep relying on the host
                // notification instead, otherwise browser-action state set
                // from onLoading would be clobbered when the host resets it
                // on navigation.
                if !self.host.tab_exists(tab_id).await {
                    debug!(%tab_id, url = %url, "Tab unresolvable, dispatching onLoading");
                    self.on_loading.dispatch(&page);
                }
            }
        }

        self.store.set_url(tab_id, frame_id, url.clone());
    }
}

// ============================================================================
// PageTracker - Tab Lifecycle Notifications
// ============================================================================

impl PageTracker {
    /// Handles a host tab-updated notification.
    pub fn on_tab_updated(&self, tab: &TabInfo) {
        if tab.status == TabStatus::Loading {
            let page = self.page(tab.id, tab.url.clone());
            self.on_loading.dispatch(&page);
        }
    }

    /// Handles a host tab-activated notification.
    pub fn on_tab_activated(&self, tab_id: TabId) {
        let page = self.page(tab_id, None);
        self.on_activated.dispatch(&page);
    }

    /// Handles a host tab-removed notification.
    pub fn on_tab_removed(&self, tab_id: TabId) {
        self.forget_tab(tab_id);
    }

    /// Handles a host tab-replaced notification.
    ///
    /// The removed tab is forgotten; the added tab builds state through its
    /// own navigation notifications.
    pub fn on_tab_replaced(&self, _added_tab_id: TabId, removed_tab_id: TabId) {
        self.forget_tab(removed_tab_id);
    }

    /// Bulk-populates frame state from a startup snapshot of open tabs.
    pub fn bootstrap(&self, snapshot: &[TabSnapshot]) {
        self.store.bootstrap(snapshot);
    }

    fn forget_tab(&self, tab_id: TabId) {
        debug!(%tab_id, "Forgetting tab");
        self.on_removed.dispatch(&tab_id);
        self.page_data.purge_tab(tab_id);
        self.store.remove_tab(tab_id);
    }
}

// ============================================================================
// Tests
// ============================================================================
