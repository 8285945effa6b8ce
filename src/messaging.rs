//! Message passing between content scripts and the extension core.
//!
//! The host delivers runtime messages with a raw sender description; this
//! module enriches the sender with a [`Page`] handle and a frame view
//! resolved through the frame store, then fans the message out to the
//! registered listeners. A listener returning `true` signals that it will
//! reply asynchronously, which is propagated back to the host.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::events::EventTarget;
use crate::frames::{FrameRecord, FrameStore};
use crate::identifiers::{FrameId, TabId};
use crate::pages::Page;

// ============================================================================
// Sender Types
// ============================================================================

/// Raw sender description as supplied by the host.
///
/// Absent entirely for messages sent by the extension's own pages (popup,
/// background) rather than a content script.
#[derive(Debug, Clone)]
pub struct RawSender {
    /// Tab the message was sent from.
    pub tab_id: TabId,
    /// Frame the message was sent from.
    pub frame_id: FrameId,
    /// Sender document URL. Some hosts omit it for internal pages.
    pub url: Option<Url>,
}

/// The sending frame, resolved lazily against the frame store.
#[derive(Debug, Clone)]
pub struct SenderFrame {
    /// Sender document URL, when the host supplied one.
    pub url: Option<Url>,
    tab_id: TabId,
    frame_id: FrameId,
    store: Arc<FrameStore>,
}

impl SenderFrame {
    /// Returns the parent frame record of the sending frame.
    ///
    /// Falls back to the tab's main frame when the sending frame itself is
    /// not tracked, so listeners can still reason about the hosting page.
    #[must_use]
    pub fn parent(&self) -> Option<FrameRecord> {
        match self.store.get_frame(self.tab_id, self.frame_id) {
            Some(frame) => frame
                .parent
                .and_then(|id| self.store.get_frame(self.tab_id, id)),
            None => self.store.get_frame(self.tab_id, FrameId::main()),
        }
    }
}

/// Message sender handed to listeners.
#[derive(Debug, Clone)]
pub struct MessageSender {
    /// Page the message came from, if sent by a content script.
    pub page: Option<Page>,
    /// Frame the message came from, if sent by a content script.
    pub frame: Option<SenderFrame>,
}

/// Payload handed to message listeners.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Message body.
    pub payload: Value,
    /// Resolved sender.
    pub sender: MessageSender,
}

// ============================================================================
// Messaging
// ============================================================================

/// Fan-out dispatcher for host runtime messages.
pub struct Messaging {
    store: Arc<FrameStore>,
    on_message: EventTarget<MessageEvent, bool>,
}

impl Messaging {
    pub(crate) fn new(store: Arc<FrameStore>) -> Self {
        Self {
            store,
            on_message: EventTarget::new(),
        }
    }

    /// Message event stream.
    ///
    /// A listener returns `true` to indicate it will reply asynchronously.
    #[inline]
    #[must_use]
    pub fn on_message(&self) -> &EventTarget<MessageEvent, bool> {
        &self.on_message
    }

    /// Handles a host runtime message.
    ///
    /// Returns `true` if any listener will reply asynchronously; the host
    /// keeps the reply channel open in that case.
    pub fn handle_message(&self, payload: Value, raw_sender: Option<RawSender>) -> bool {
        let sender = match raw_sender {
            Some(raw) => MessageSender {
                page: Some(Page::new(raw.tab_id, None, Arc::clone(&self.store))),
                frame: Some(SenderFrame {
                    url: raw.url,
                    tab_id: raw.tab_id,
                    frame_id: raw.frame_id,
                    store: Arc::clone(&self.store),
                }),
            },
            None => MessageSender {
                page: None,
                frame: None,
            },
        };

        trace!(has_page = sender.page.is_some(), "Dispatching message");
        let event = MessageEvent { payload, sender };
        self.on_message.dispatch(&event).contains(&true)
    }
}

// ============================================================================
// Tests
// ============================================================================
