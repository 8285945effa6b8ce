//! The browser-host surface consumed by this core.
//!
//! The host runtime is a fixed external API: it pushes tab lifecycle,
//! navigation and request notifications into the shim, answers asynchronous
//! tab queries, and imposes a quota on behavior-change calls. The [`Host`]
//! trait is the seam an embedder implements; the structs in this module are
//! the normalized notification payloads the embedder feeds into
//! [`ExtensionBridge`](crate::bridge::ExtensionBridge).
//!
//! Everything here mirrors the host's own vocabulary (tab status strings,
//! resource types, `-1` parent frame ids mapped to `None`); no host quirks
//! beyond the documented ones are modeled.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use url::Url;

use crate::identifiers::{FrameId, TabId};

// ============================================================================
// Host Trait
// ============================================================================

/// Asynchronous calls into the host runtime.
///
/// All continuations resume on the embedding event loop; none of these
/// operations support cancellation.
#[async_trait]
pub trait Host: Send + Sync {
    /// Checks whether the host can currently resolve a tab.
    ///
    /// Returns `false` for tabs the host cannot look up, e.g. tabs that are
    /// still prerendering. This is not an error condition: the tracker uses
    /// it to decide whether to dispatch `onLoading` itself, since the host
    /// never fires a tab-updated notification for such tabs.
    async fn tab_exists(&self, tab_id: TabId) -> bool;

    /// Notifies the host that blocking behavior changed.
    ///
    /// Callers must respect [`behavior_change_quota`](Host::behavior_change_quota);
    /// the host degrades the extension's standing when the quota is
    /// exceeded. Go through
    /// [`RequestInterceptor::handler_behavior_changed`](crate::requests::RequestInterceptor::handler_behavior_changed)
    /// instead of calling this directly.
    async fn handler_behavior_changed(&self);

    /// Maximum behavior-changed calls the host allows per 10-minute window.
    fn behavior_change_quota(&self) -> u32 {
        DEFAULT_BEHAVIOR_CHANGE_QUOTA
    }
}

/// Host default for the behavior-changed call quota.
pub const DEFAULT_BEHAVIOR_CHANGE_QUOTA: u32 = 20;

// ============================================================================
// Tab Notifications
// ============================================================================

/// Load status carried by tab lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    /// The tab started loading a page.
    Loading,
    /// The tab finished loading.
    Complete,
}

/// A tab as described by the host in lifecycle notifications.
#[derive(Debug, Clone)]
pub struct TabInfo {
    /// Tab ID.
    pub id: TabId,
    /// Tab URL, when the host supplies one.
    pub url: Option<Url>,
    /// Load status.
    pub status: TabStatus,
}

// ============================================================================
// Navigation Notifications
// ============================================================================

/// Payload of a before-navigate or committed navigation notification.
#[derive(Debug, Clone)]
pub struct NavigationDetails {
    /// Tab the navigation happens in.
    pub tab_id: TabId,
    /// Frame that navigates.
    pub frame_id: FrameId,
    /// Parent frame, `None` for the main frame (the host reports `-1`).
    pub parent_frame_id: Option<FrameId>,
    /// Target URL.
    pub url: Url,
}

// ============================================================================
// Request Notifications
// ============================================================================

/// Category of an intercepted request, as labeled by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// Top-level document load.
    MainFrame,
    /// Embedded frame's own document load.
    SubFrame,
    /// Stylesheet.
    Stylesheet,
    /// Script.
    Script,
    /// Image.
    Image,
    /// Font.
    Font,
    /// Plugin object.
    Object,
    /// XMLHttpRequest / fetch.
    XmlHttpRequest,
    /// Hyperlink ping or beacon.
    Ping,
    /// Audio or video.
    Media,
    /// WebSocket handshake.
    WebSocket,
    /// Anything else.
    Other,
}

impl ResourceType {
    /// Returns the uppercased classification label for this type.
    ///
    /// Sub-frame requests are classified separately (as `SUBDOCUMENT`) by
    /// the interceptor and never use this label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MainFrame => "MAIN_FRAME",
            Self::SubFrame => "SUB_FRAME",
            Self::Stylesheet => "STYLESHEET",
            Self::Script => "SCRIPT",
            Self::Image => "IMAGE",
            Self::Font => "FONT",
            Self::Object => "OBJECT",
            Self::XmlHttpRequest => "XMLHTTPREQUEST",
            Self::Ping => "PING",
            Self::Media => "MEDIA",
            Self::WebSocket => "WEBSOCKET",
            Self::Other => "OTHER",
        }
    }
}

/// Payload of a request interception notification.
#[derive(Debug, Clone)]
pub struct RequestDetails {
    /// Originating tab, `None` for requests not associated with any tab.
    pub tab_id: Option<TabId>,
    /// Frame the request was issued from.
    pub frame_id: FrameId,
    /// Parent of `frame_id`, `None` for the main frame.
    pub parent_frame_id: Option<FrameId>,
    /// Request URL.
    pub url: Url,
    /// Host-assigned request category.
    pub resource_type: ResourceType,
}

/// Cancel instruction returned to the host from request interception.
///
/// Absence (the `None` arm of `Option<BlockingResponse>`) means the request
/// proceeds unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingResponse {
    /// Always `true`; the host only understands an explicit cancel.
    pub cancel: bool,
}

impl BlockingResponse {
    /// Creates a cancel instruction.
    #[inline]
    #[must_use]
    pub const fn cancel() -> Self {
        Self { cancel: true }
    }
}

// ============================================================================
// Bootstrap Snapshots
// ============================================================================

/// One frame from a host frame enumeration.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Frame ID.
    pub frame_id: FrameId,
    /// Parent frame, `None` for the main frame.
    pub parent_frame_id: Option<FrameId>,
    /// Frame URL at snapshot time.
    pub url: Url,
}

/// All frames of one open tab, captured at startup.
#[derive(Debug, Clone)]
pub struct TabSnapshot {
    /// Tab ID.
    pub tab_id: TabId,
    /// Frames of the tab, in host-supplied order (children may precede
    /// their parents).
    pub frames: Vec<FrameSnapshot>,
}

// ============================================================================
// Test Support
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
