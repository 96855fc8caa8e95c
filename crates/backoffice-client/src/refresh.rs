//! Single-flight token refresh.
//!
//! The gate has two states, `Idle` and `Refreshing`. The first request that
//! needs a refresh becomes the leader and receives a [`RefreshLease`]; every
//! request that needs one while the lease is held is parked on a queue and
//! resolved with the leader's outcome. At most one refresh is in flight.
//!
//! The lock is only held for state transitions, never across an await.

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::Error;

/// Outcome delivered to parked requests.
pub type RefreshOutcome = Result<(), Error>;

/// Result of entering the gate.
pub enum GateEntry<'a> {
    /// The caller must perform the refresh and complete the lease.
    Leader(RefreshLease<'a>),
    /// A refresh is already running; await its outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

enum GateState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
        /// Whether any participant asked for the session-expired notice.
        announce: bool,
    },
}

/// Coordinates refresh attempts.
pub struct RefreshGate {
    state: Mutex<GateState>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Idle),
        }
    }

    /// Enter the gate.
    ///
    /// `announce` records whether this participant wants the session-expired
    /// notice if the refresh fails. Session checks pass `false`.
    pub fn enter(&self, announce: bool) -> GateEntry<'_> {
        let mut state = self.state.lock();

        if let GateState::Refreshing {
            waiters,
            announce: any_announce,
        } = &mut *state
        {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            *any_announce |= announce;
            debug!(queued = waiters.len(), "refresh in flight, request parked");
            return GateEntry::Waiter(rx);
        }

        *state = GateState::Refreshing {
            waiters: Vec::new(),
            announce,
        };
        debug!("refresh gate: idle -> refreshing");
        GateEntry::Leader(RefreshLease {
            gate: self,
            completed: false,
        })
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), GateState::Refreshing { .. })
    }

    /// Number of parked requests.
    pub fn queued(&self) -> usize {
        match &*self.state.lock() {
            GateState::Idle => 0,
            GateState::Refreshing { waiters, .. } => waiters.len(),
        }
    }

    /// Return to `Idle`, handing `outcome` to every parked request.
    ///
    /// Returns whether any participant asked for the expiry notice.
    fn finish(&self, outcome: &RefreshOutcome) -> bool {
        let previous = std::mem::replace(&mut *self.state.lock(), GateState::Idle);
        let GateState::Refreshing { waiters, announce } = previous else {
            return false;
        };

        debug!(
            released = waiters.len(),
            ok = outcome.is_ok(),
            "refresh gate: refreshing -> idle"
        );
        for waiter in waiters {
            // A waiter whose request was dropped is simply gone.
            let _ = waiter.send(outcome.clone());
        }
        announce
    }
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RefreshGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGate")
            .field("refreshing", &self.is_refreshing())
            .field("queued", &self.queued())
            .finish()
    }
}

/// Held by the request performing the refresh.
///
/// Dropping the lease without completing it (the leader's future was
/// cancelled) fails every parked request instead of leaving them waiting.
pub struct RefreshLease<'a> {
    gate: &'a RefreshGate,
    completed: bool,
}

impl RefreshLease<'_> {
    /// Publish the refresh outcome. Returns whether the expiry notice is due.
    pub fn complete(mut self, outcome: &RefreshOutcome) -> bool {
        self.completed = true;
        self.gate.finish(outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.completed {
            warn!("token refresh abandoned before completion");
            self.gate.finish(&Err(Error::AuthExpired {
                message: "token refresh was interrupted".to_string(),
            }));
        }
    }
}
