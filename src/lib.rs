//! Host-API compatibility core for browser content-filtering extensions.
//!
//! This library lets a content-filtering extension run unmodified across
//! browser extension hosts by normalizing the host's tab, navigation and
//! request notifications into a consistent model. Its centerpiece is the
//! frame/page tracking subsystem: per tab, a tree of navigation frames is
//! reconstructed from asynchronous host events and used to attribute every
//! intercepted request to the frame containing the element that issued it.
//!
//! # Architecture
//!
//! ```text
//! host notifications ──► ExtensionBridge
//!                          ├─ PageTracker ──────┐ writes
//!                          │                    ▼
//!                          │               FrameStore
//!                          │                    ▲ reads
//!                          └─ RequestInterceptor┘
//!                                    │
//!                                    ▼ onBeforeRequest (veto)
//!                            filter engine / UI / messaging
//! ```
//!
//! The filter-matching engine itself is external: it subscribes to the
//! decision event and vetoes requests; this crate only supplies correctly
//! attributed context (tab, frame, ancestry).
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use webext_shim::{ExtensionBridge, Host};
//!
//! let bridge = Arc::new(ExtensionBridge::new(host));
//!
//! bridge.requests().on_before_request().add_listener(|event| {
//!     // Some(false) cancels the request, anything else lets it pass.
//!     Some(event.url.domain() != Some("ads.example"))
//! });
//!
//! // Feed host notifications into the bridge:
//! // bridge.on_before_navigate(..), bridge.on_committed(..),
//! // bridge.on_intercepted_request(..), bridge.on_tab_removed(..), ...
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`ExtensionBridge`] composition root |
//! | [`frames`] | Per-tab frame trees: [`FrameStore`], [`FrameRecord`] |
//! | [`pages`] | [`Page`] handles, [`PageMap`] side tables, [`PageTracker`] |
//! | [`requests`] | Request attribution and veto dispatch |
//! | [`messaging`] | Runtime message fan-out |
//! | [`storage`] | Tiered line-oriented file storage |
//! | [`events`] | [`EventTarget`](events::EventTarget) observable |
//! | [`host`] | The host surface this core consumes |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Composition root constructed once at process start.
pub mod bridge;

/// Error types and result aliases.
pub mod error;

/// Typed event dispatch with collected listener results.
pub mod events;

/// Per-tab frame tree storage.
pub mod frames;

/// The browser-host surface consumed by this core.
pub mod host;

/// Type-safe identifiers for host-managed entities.
pub mod identifiers;

/// Runtime message dispatch.
pub mod messaging;

/// Page handles, per-page data and lifecycle tracking.
pub mod pages;

/// Request interception and attribution.
pub mod requests;

/// Tiered persistent file storage.
pub mod storage;

// ============================================================================
// Re-exports
// ============================================================================

// Composition root
pub use bridge::ExtensionBridge;

// Event dispatch
pub use events::{EventTarget, ListenerId};

// Frame types
pub use frames::{FrameRecord, FrameStore};

// Host surface
pub use host::{
    BlockingResponse, FrameSnapshot, Host, NavigationDetails, RequestDetails, ResourceType,
    TabInfo, TabSnapshot, TabStatus,
};

// Page types
pub use pages::{Page, PageMap, PageTracker};

// Request types
pub use requests::{BlockEvent, RequestInterceptor};

// Messaging types
pub use messaging::{MessageEvent, MessageSender, Messaging, RawSender, SenderFrame};

// Storage types
pub use storage::{ChangeKind, FileStat, FileStore, MemoryBackend, StorageBackend, StorageChange};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameId, TabId};
