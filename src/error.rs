//! Error types for the host compatibility core.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Storage | [`Error::Corrupted`], [`Error::DoesNotExist`], [`Error::Storage`] |
//! | External | [`Error::Json`] |
//!
//! Note that several conditions in this core are deliberately *not* errors:
//! an unresolvable (prerendered) tab triggers the loading fallback path, and
//! a missing frame record during request interception fails open. See the
//! `pages` and `requests` modules.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Persisted entry exists but cannot be decoded.
    ///
    /// No automatic repair or deletion is performed; the caller decides.
    #[error("Stored entry is corrupted: {key}")]
    Corrupted {
        /// Storage key of the malformed entry.
        key: String,
    },

    /// Entry absent in every storage tier.
    ///
    /// Distinct from [`Error::Corrupted`] so callers can tell a missing
    /// file apart from a damaged one.
    #[error("Stored entry does not exist: {key}")]
    DoesNotExist {
        /// Storage key that was looked up.
        key: String,
    },

    /// Storage backend failure.
    ///
    /// Returned when a tier's read or write fails for host-side reasons.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the backend failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a corrupted-entry error.
    #[inline]
    pub fn corrupted(key: impl Into<String>) -> Self {
        Self::Corrupted { key: key.into() }
    }

    /// Creates a does-not-exist error.
    #[inline]
    pub fn does_not_exist(key: impl Into<String>) -> Self {
        Self::DoesNotExist { key: key.into() }
    }

    /// Creates a storage backend error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the entry was absent rather than damaged.
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::DoesNotExist { .. })
    }

    /// Returns `true` if the entry exists but cannot be decoded.
    #[inline]
    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. } | Self::Json(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
