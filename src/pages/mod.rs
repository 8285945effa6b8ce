//! Page handles, per-page data and lifecycle tracking.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `page` | [`Page`] handle with lazy URL resolution |
//! | `map` | [`PageMap`] per-page side tables |
//! | `tracker` | [`PageTracker`] lifecycle state machine |

// ============================================================================
// Submodules
// ============================================================================

pub(crate) mod map;
mod page;
mod tracker;

// ============================================================================
// Re-exports
// ============================================================================

pub use map::PageMap;
pub use page::Page;
pub use tracker::PageTracker;
