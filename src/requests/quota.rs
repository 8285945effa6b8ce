//! Quota-limited behavior-change notification gate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::host::Host;

// ============================================================================
// Constants
// ============================================================================

/// Delay after which one consumed behavior-change call is refilled.
///
/// Matches the host's 10-minute sliding quota window.
pub(crate) const REFILL_DELAY: Duration = Duration::from_secs(600);

// ============================================================================
// BehaviorChangeGate
// ============================================================================

/// Coalesces and rate-limits `handler_behavior_changed` host calls.
///
/// Callers mark the gate pending via [`request`](Self::request); the actual
/// host call happens at most once per navigation, when
/// [`flush`](Self::flush) runs. Each consumed call is refilled exactly once
/// after [`REFILL_DELAY`]; with the quota exhausted the call is skipped
/// outright and the pending flag stays set, so the next qualifying
/// navigation attempts again. Exceeding the quota would degrade the
/// extension's standing with the host.
pub(crate) struct BehaviorChangeGate {
    pending: AtomicBool,
    quota: Mutex<QuotaState>,
}

struct QuotaState {
    available: u32,
    /// Refill deadline per consumed call, oldest first.
    refills: VecDeque<Instant>,
}

impl BehaviorChangeGate {
    /// Creates a gate with the host's maximum calls per window.
    pub(crate) fn new(max_calls: u32) -> Self {
        Self {
            pending: AtomicBool::new(false),
            quota: Mutex::new(QuotaState {
                available: max_calls,
                refills: VecDeque::new(),
            }),
        }
    }

    /// Marks a behavior change as pending.
    ///
    /// The host call is deferred until the next navigation; calling this
    /// several times between navigations coalesces into one call.
    pub(crate) fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Checks whether a behavior change is waiting to be propagated.
    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Propagates a pending behavior change to the host, if the quota
    /// permits.
    pub(crate) async fn flush(&self, host: &dyn Host) {
        if !self.pending.load(Ordering::Acquire) {
            return;
        }

        if !self.try_consume() {
            warn!("Behavior-change quota exhausted, skipping host call");
            return;
        }

        self.pending.store(false, Ordering::Release);
        debug!("Propagating handler behavior change");
        host.handler_behavior_changed().await;
    }

    fn try_consume(&self) -> bool {
        let mut quota = self.quota.lock();
        let now = Instant::now();

        while quota.refills.front().is_some_and(|deadline| *deadline <= now) {
            quota.refills.pop_front();
            quota.available += 1;
        }

        if quota.available == 0 {
            return false;
        }

        quota.available -= 1;
        quota.refills.push_back(now + REFILL_DELAY);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
