//! Composition root wiring tracker, interceptor and messaging together.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use url::Url;

use crate::frames::{FrameRecord, FrameStore};
use crate::host::{
    BlockingResponse, Host, NavigationDetails, RequestDetails, TabInfo, TabSnapshot,
};
use crate::identifiers::{FrameId, TabId};
use crate::messaging::{Messaging, RawSender};
use crate::pages::{Page, PageMap, PageTracker};
use crate::requests::RequestInterceptor;

// ============================================================================
// ExtensionBridge
// ============================================================================

/// The host compatibility core, constructed once at process start.
///
/// Owns the [`FrameStore`] and the components reading and writing it;
/// everything that used to be ambient global state (the sitekey side
/// table, the behavior-change quota) lives inside this instance. The
/// embedder adapts raw host notifications into the `on_*` entry points
/// below and registers host-side callbacks against the exposed event
/// streams.
///
/// # Example
///
/// ```ignore
/// let bridge = Arc::new(ExtensionBridge::new(host));
///
/// bridge.requests().on_before_request().add_listener(|event| {
///     // filter engine decides; Some(false) cancels the request
///     Some(!matches(&event.url, event.class))
/// });
///
/// bridge.pages().on_loading().add_listener(|page| {
///     // refresh per-page UI state
/// });
/// ```
pub struct ExtensionBridge {
    store: Arc<FrameStore>,
    pages: PageTracker,
    requests: RequestInterceptor,
    messaging: Messaging,
}

impl ExtensionBridge {
    /// Creates the bridge against a host implementation.
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self {
        let store = Arc::new(FrameStore::new());
        let pages = PageTracker::new(Arc::clone(&store), Arc::clone(&host));
        let requests = RequestInterceptor::new(Arc::clone(&store), host);
        let messaging = Messaging::new(Arc::clone(&store));

        Self {
            store,
            pages,
            requests,
            messaging,
        }
    }
}

// ============================================================================
// ExtensionBridge - Components
// ============================================================================

impl ExtensionBridge {
    /// Page lifecycle tracking and events.
    #[inline]
    #[must_use]
    pub fn pages(&self) -> &PageTracker {
        &self.pages
    }

    /// Request interception and decision events.
    #[inline]
    #[must_use]
    pub fn requests(&self) -> &RequestInterceptor {
        &self.requests
    }

    /// Runtime message dispatch.
    #[inline]
    #[must_use]
    pub fn messaging(&self) -> &Messaging {
        &self.messaging
    }
}

// ============================================================================
// ExtensionBridge - Lookups
// ============================================================================

impl ExtensionBridge {
    /// Looks up a frame record.
    #[must_use]
    pub fn get_frame(&self, tab_id: TabId, frame_id: FrameId) -> Option<FrameRecord> {
        self.store.get_frame(tab_id, frame_id)
    }

    /// Creates a page handle for a tab id.
    #[must_use]
    pub fn get_page(&self, tab_id: TabId) -> Page {
        self.pages.get_page(tab_id)
    }

    /// Creates a per-page side table purged on navigation and removal.
    #[must_use]
    pub fn new_page_map<T: Send + Sync + 'static>(&self) -> Arc<PageMap<T>> {
        self.pages.new_page_map()
    }
}

// ============================================================================
// ExtensionBridge - Host Notification Entry Points
// ============================================================================

impl ExtensionBridge {
    /// Before-navigate notification.
    ///
    /// Also the point where a pending behavior-change notification is
    /// propagated to the host; earlier propagation would have no visible
    /// effect.
    pub async fn on_before_navigate(&self, details: &NavigationDetails) {
        self.pages.on_before_navigate(details);
        self.requests.flush_behavior_change().await;
    }

    /// Committed-navigation notification.
    pub async fn on_committed(&self, details: &NavigationDetails) {
        self.pages.on_committed(details).await;
    }

    /// Eager main-frame update from the sitekey fast-path.
    ///
    /// Invoked when a response header carries a site key, ahead of the
    /// commit notification, so filter logic can use the key immediately.
    pub async fn on_sitekey_navigation(&self, tab_id: TabId, frame_id: FrameId, url: &Url) {
        self.pages
            .update_page_structure(tab_id, frame_id, url, true)
            .await;
    }

    /// Tab-updated notification.
    pub fn on_tab_updated(&self, tab: &TabInfo) {
        self.pages.on_tab_updated(tab);
    }

    /// Tab-activated notification.
    pub fn on_tab_activated(&self, tab_id: TabId) {
        self.pages.on_tab_activated(tab_id);
    }

    /// Tab-removed notification.
    pub fn on_tab_removed(&self, tab_id: TabId) {
        self.pages.on_tab_removed(tab_id);
    }

    /// Tab-replaced notification.
    pub fn on_tab_replaced(&self, added_tab_id: TabId, removed_tab_id: TabId) {
        self.pages.on_tab_replaced(added_tab_id, removed_tab_id);
    }

    /// Request interception entry point; must return before the request
    /// proceeds.
    pub fn on_intercepted_request(&self, details: &RequestDetails) -> Option<BlockingResponse> {
        self.requests.on_intercepted_request(details)
    }

    /// Runtime message entry point.
    pub fn on_message(&self, payload: serde_json::Value, sender: Option<RawSender>) -> bool {
        self.messaging.handle_message(payload, sender)
    }

    /// Bulk-populates frame state from a startup snapshot of open tabs.
    pub fn bootstrap(&self, snapshot: &[TabSnapshot]) {
        self.pages.bootstrap(snapshot);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::host::testing::MockHost;
    use crate::host::{FrameSnapshot, ResourceType};

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test url")
    }

    fn nav(tab: u32, frame: u64, parent: Option<u64>, url_str: &str) -> NavigationDetails {
        NavigationDetails {
            tab_id: TabId::new(tab),
            frame_id: FrameId::new(frame),
            parent_frame_id: parent.map(FrameId::new),
            url: url(url_str),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_iframe_blocking() {
        let host = Arc::new(MockHost::new());
        host.add_tab(TabId::new(5));
        let bridge = ExtensionBridge::new(host as Arc<dyn Host>);

        bridge.requests().on_before_request().add_listener(|event| {
            Some(!(event.class == "SUBDOCUMENT" && event.url.domain() == Some("c.test")))
        });

        bridge.on_committed(&nav(5, 0, None, "https://a.test/")).await;
        bridge.on_before_navigate(&nav(5, 3, Some(0), "https://b.test/ad")).await;
        bridge.on_committed(&nav(5, 3, Some(0), "https://b.test/ad")).await;

        let blocked = bridge.on_intercepted_request(&RequestDetails {
            tab_id: Some(TabId::new(5)),
            frame_id: FrameId::new(7),
            parent_frame_id: Some(FrameId::new(3)),
            url: url("https://c.test/x"),
            resource_type: ResourceType::SubFrame,
        });
        assert_eq!(blocked, Some(BlockingResponse::cancel()));

        let allowed = bridge.on_intercepted_request(&RequestDetails {
            tab_id: Some(TabId::new(5)),
            frame_id: FrameId::new(3),
            parent_frame_id: Some(FrameId::new(0)),
            url: url("https://c.test/img.png"),
            resource_type: ResourceType::Image,
        });
        assert!(allowed.is_none());
    }

    #[tokio::test]
    async fn test_behavior_change_flushes_on_navigation() {
        let host = Arc::new(MockHost::new());
        host.add_tab(TabId::new(1));
        let bridge = ExtensionBridge::new(Arc::clone(&host) as Arc<dyn Host>);

        bridge.requests().handler_behavior_changed();
        assert_eq!(host.behavior_change_count(), 0);

        bridge.on_before_navigate(&nav(1, 0, None, "https://a.test/")).await;
        assert_eq!(host.behavior_change_count(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_populates_lookups() {
        let host = Arc::new(MockHost::new());
        let bridge = ExtensionBridge::new(host as Arc<dyn Host>);

        bridge.bootstrap(&[TabSnapshot {
            tab_id: TabId::new(2),
            frames: vec![FrameSnapshot {
                frame_id: FrameId::main(),
                parent_frame_id: None,
                url: url("https://a.test/"),
            }],
        }]);

        assert!(bridge.get_frame(TabId::new(2), FrameId::main()).is_some());
        assert_eq!(
            bridge.get_page(TabId::new(2)).url(),
            Some(url("https://a.test/"))
        );
    }

    #[tokio::test]
    async fn test_sitekey_navigation_marks_eager_update() {
        let host = Arc::new(MockHost::new());
        let bridge = ExtensionBridge::new(host as Arc<dyn Host>);
        let tab = TabId::new(3);

        let loading = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&loading);
        bridge.pages().on_loading().add_listener(move |_page| {
            flag.store(true, Ordering::Relaxed);
        });

        bridge
            .on_sitekey_navigation(tab, FrameId::main(), &url("https://a.test/"))
            .await;
        assert!(loading.load(Ordering::Relaxed));

        // The benign commit for the same (tab, url) must not wipe state.
        let keys = bridge.new_page_map::<String>();
        keys.set(&bridge.get_page(tab), "sitekey".into());
        bridge.on_committed(&nav(3, 0, None, "https://a.test/")).await;
        assert_eq!(keys.get(&bridge.get_page(tab)).as_deref(), Some("sitekey"));
    }
}
