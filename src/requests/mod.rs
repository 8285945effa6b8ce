//! Request interception and attribution.
//!
//! [`RequestInterceptor`] receives outbound-request notifications from the
//! host, resolves the originating frame through the
//! [`FrameStore`](crate::frames::FrameStore), and asks the registered
//! decision listeners whether the request may proceed. A listener's
//! explicit `Some(false)` vetoes the request; every other result
//! (`None`, `Some(true)`) lets it through.
//!
//! The filter engine itself is an external consumer; this module only
//! supplies it with correctly attributed request context.

// ============================================================================
// Submodules
// ============================================================================

mod quota;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace};
use url::Url;

use crate::events::EventTarget;
use crate::frames::{FrameRecord, FrameStore};
use crate::host::{BlockingResponse, Host, RequestDetails, ResourceType};
use crate::identifiers::FrameId;
use crate::pages::Page;
use crate::requests::quota::BehaviorChangeGate;

// ============================================================================
// BlockEvent
// ============================================================================

/// Payload handed to request decision listeners.
#[derive(Debug, Clone)]
pub struct BlockEvent {
    /// Request URL.
    pub url: Url,
    /// Classification label, e.g. `IMAGE`, `SCRIPT`, `SUBDOCUMENT`.
    pub class: &'static str,
    /// Page the request belongs to.
    pub page: Page,
    /// The frame containing the element that triggered the request.
    pub frame: FrameRecord,
}

// ============================================================================
// RequestInterceptor
// ============================================================================

/// Attributes intercepted requests to frames and applies listener vetoes.
pub struct RequestInterceptor {
    store: Arc<FrameStore>,
    host: Arc<dyn Host>,
    gate: BehaviorChangeGate,
    on_before_request: EventTarget<BlockEvent, Option<bool>>,
}

impl RequestInterceptor {
    pub(crate) fn new(store: Arc<FrameStore>, host: Arc<dyn Host>) -> Self {
        let gate = BehaviorChangeGate::new(host.behavior_change_quota());
        Self {
            store,
            host,
            gate,
            on_before_request: EventTarget::new(),
        }
    }

    /// Decision event dispatched for every attributable request.
    ///
    /// Returning `Some(false)` from a listener cancels the request; any
    /// other result does not.
    #[inline]
    #[must_use]
    pub fn on_before_request(&self) -> &EventTarget<BlockEvent, Option<bool>> {
        &self.on_before_request
    }
}

// ============================================================================
// RequestInterceptor - Interception
// ============================================================================

impl RequestInterceptor {
    /// Handles an intercepted request, returning a cancel instruction for
    /// the host or `None` to let it proceed.
    ///
    /// Requests that cannot be attributed never block:
    ///
    /// - requests not associated with any tab,
    /// - top-level document loads (blocking navigation is outside this
    ///   layer's authority),
    /// - non-http(s) schemes,
    /// - requests whose frame record is missing (fail open; an attribution
    ///   gap is a tracking bug, not a reason to drop traffic).
    pub fn on_intercepted_request(&self, details: &RequestDetails) -> Option<BlockingResponse> {
        let tab_id = details.tab_id?;
        if details.resource_type == ResourceType::MainFrame {
            return None;
        }
        if !matches!(details.url.scheme(), "http" | "https") {
            return None;
        }

        // We want the frame containing the element that triggered the
        // request. For sub-document loads that is the parent frame; the
        // sub-document's own frame does not exist yet.
        let (frame_id, class) = classify(details)?;
        let frame = self.store.get_frame(tab_id, frame_id)?;

        let event = BlockEvent {
            url: details.url.clone(),
            class,
            page: Page::new(tab_id, None, Arc::clone(&self.store)),
            frame,
        };

        trace!(%tab_id, %frame_id, class, url = %event.url, "Dispatching request decision");
        let results = self.on_before_request.dispatch(&event);

        if results.contains(&Some(false)) {
            debug!(%tab_id, url = %event.url, class, "Request cancelled");
            Some(BlockingResponse::cancel())
        } else {
            None
        }
    }
}

// ============================================================================
// RequestInterceptor - Behavior Change
// ============================================================================

impl RequestInterceptor {
    /// Requests a `handler_behavior_changed` notification to the host.
    ///
    /// The call is deferred until the next navigation: it has no visible
    /// effect earlier, it is expensive, and deferral coalesces the bursts
    /// caused by adding or removing several filters at once.
    pub fn handler_behavior_changed(&self) {
        self.gate.request();
    }

    /// Flushes a pending behavior change; called on before-navigate.
    pub(crate) async fn flush_behavior_change(&self) {
        self.gate.flush(self.host.as_ref()).await;
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the relevant frame id and classification label for a request.
fn classify(details: &RequestDetails) -> Option<(FrameId, &'static str)> {
    if details.resource_type == ResourceType::SubFrame {
        Some((details.parent_frame_id?, "SUBDOCUMENT"))
    } else {
        Some((details.frame_id, details.resource_type.label()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::host::testing::MockHost;
    use crate::identifiers::TabId;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test url")
    }

    fn interceptor() -> (RequestInterceptor, Arc<FrameStore>) {
        let store = Arc::new(FrameStore::new());
        let host = Arc::new(MockHost::new());
        let interceptor = RequestInterceptor::new(Arc::clone(&store), host as Arc<dyn Host>);
        (interceptor, store)
    }

    fn request(
        tab: Option<u32>,
        frame: u64,
        parent: Option<u64>,
        url_str: &str,
        ty: ResourceType,
    ) -> RequestDetails {
        RequestDetails {
            tab_id: tab.map(TabId::new),
            frame_id: FrameId::new(frame),
            parent_frame_id: parent.map(FrameId::new),
            url: url(url_str),
            resource_type: ty,
        }
    }

    /// Populates tab 5 with a main frame and an iframe (frame 3).
    fn populate_tab_5(store: &FrameStore) {
        let tab = TabId::new(5);
        store.set_url(tab, FrameId::main(), url("https://a.test/"));
        store.record_parent(tab, FrameId::new(3), Some(FrameId::main()));
        store.set_url(tab, FrameId::new(3), url("https://b.test/ad"));
    }

    #[test]
    fn test_tabless_request_passes() {
        let (interceptor, _store) = interceptor();
        interceptor.on_before_request().add_listener(|_| Some(false));

        let details = request(None, 0, None, "https://c.test/x", ResourceType::Image);
        assert!(interceptor.on_intercepted_request(&details).is_none());
    }

    #[test]
    fn test_top_level_document_passes() {
        let (interceptor, store) = interceptor();
        populate_tab_5(&store);
        interceptor.on_before_request().add_listener(|_| Some(false));

        let details = request(Some(5), 0, None, "https://c.test/", ResourceType::MainFrame);
        assert!(interceptor.on_intercepted_request(&details).is_none());
    }

    #[test]
    fn test_non_http_scheme_passes() {
        let (interceptor, store) = interceptor();
        populate_tab_5(&store);
        interceptor.on_before_request().add_listener(|_| Some(false));

        let details = request(Some(5), 0, None, "ws://c.test/socket", ResourceType::WebSocket);
        assert!(interceptor.on_intercepted_request(&details).is_none());
    }

    #[test]
    fn test_missing_frame_fails_open() {
        let (interceptor, _store) = interceptor();
        interceptor.on_before_request().add_listener(|_| Some(false));

        let details = request(Some(5), 2, None, "https://c.test/x", ResourceType::Image);
        assert!(interceptor.on_intercepted_request(&details).is_none());
    }

    #[test]
    fn test_subdocument_attributes_to_parent_frame() {
        let (interceptor, store) = interceptor();
        populate_tab_5(&store);

        let seen: Arc<Mutex<Vec<(String, Option<Url>)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        interceptor.on_before_request().add_listener(move |event| {
            sink.lock()
                .push((event.class.to_string(), event.frame.url.clone()));
            Some(false)
        });

        // New iframe inside frame 3; its own frame 7 does not exist yet.
        let details = request(Some(5), 7, Some(3), "https://c.test/x", ResourceType::SubFrame);
        let response = interceptor.on_intercepted_request(&details);

        assert_eq!(response, Some(BlockingResponse::cancel()));
        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "SUBDOCUMENT");
        assert_eq!(events[0].1, Some(url("https://b.test/ad")));
    }

    #[test]
    fn test_other_types_attribute_to_own_frame() {
        let (interceptor, store) = interceptor();
        populate_tab_5(&store);

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        interceptor.on_before_request().add_listener(move |event| {
            sink.lock().push(event.class.to_string());
            None
        });

        let details = request(Some(5), 3, Some(0), "https://c.test/img.png", ResourceType::Image);
        assert!(interceptor.on_intercepted_request(&details).is_none());
        assert_eq!(seen.lock().as_slice(), &["IMAGE".to_string()]);
    }

    #[test]
    fn test_only_exact_false_vetoes() {
        let (interceptor, store) = interceptor();
        populate_tab_5(&store);

        interceptor.on_before_request().add_listener(|_| None);
        interceptor.on_before_request().add_listener(|_| Some(true));

        let details = request(Some(5), 3, Some(0), "https://c.test/x", ResourceType::Script);
        assert!(interceptor.on_intercepted_request(&details).is_none());

        interceptor.on_before_request().add_listener(|_| Some(false));
        assert_eq!(
            interceptor.on_intercepted_request(&details),
            Some(BlockingResponse::cancel())
        );
    }

    #[test]
    fn test_listener_order_does_not_affect_outcome() {
        let details = request(Some(5), 3, Some(0), "https://c.test/x", ResourceType::Script);

        // Veto first, then allow.
        let (first, store) = interceptor();
        populate_tab_5(&store);
        first.on_before_request().add_listener(|_| Some(false));
        first.on_before_request().add_listener(|_| Some(true));
        assert_eq!(
            first.on_intercepted_request(&details),
            Some(BlockingResponse::cancel())
        );

        // Allow first, then veto.
        let (second, store) = interceptor();
        populate_tab_5(&store);
        second.on_before_request().add_listener(|_| Some(true));
        second.on_before_request().add_listener(|_| Some(false));
        assert_eq!(
            second.on_intercepted_request(&details),
            Some(BlockingResponse::cancel())
        );
    }

    #[test]
    fn test_page_handle_resolves_top_frame_url() {
        let (interceptor, store) = interceptor();
        populate_tab_5(&store);

        let seen: Arc<Mutex<Vec<Option<Url>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        interceptor.on_before_request().add_listener(move |event| {
            sink.lock().push(event.page.url());
            None
        });

        let details = request(Some(5), 3, Some(0), "https://c.test/x", ResourceType::Media);
        interceptor.on_intercepted_request(&details);
        assert_eq!(seen.lock().as_slice(), &[Some(url("https://a.test/"))]);
    }
}
