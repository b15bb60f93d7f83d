//! Request lifecycle state machine.

use parking_lot::Mutex;

/// Lifecycle of one search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Dispatched,
    Streaming,
    Succeeded,
    Failed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Failed | RequestState::Cancelled
        )
    }
}

impl Default for RequestState {
    fn default() -> Self {
        RequestState::Dispatched
    }
}

/// Guards exactly-once settlement of a request whose terminal outcome can
/// arrive through several code paths (success event, failure event,
/// cancellation).
#[derive(Debug, Default)]
pub struct RequestTracker {
    state: Mutex<RequestState>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the provider has started producing results. A no-op once
    /// the request has moved past dispatch.
    pub fn begin_streaming(&self) {
        let mut state = self.state.lock();
        if *state == RequestState::Dispatched {
            *state = RequestState::Streaming;
        }
    }

    /// Attempt the transition into a terminal state. Returns `false` when
    /// the request already settled; the caller must then drop its outcome.
    pub fn try_settle(&self, terminal: RequestState) -> bool {
        debug_assert!(terminal.is_terminal());
        let mut state = self.state.lock();
        if state.is_terminal() {
            return false;
        }
        *state = terminal;
        true
    }

    pub fn state(&self) -> RequestState {
        *self.state.lock()
    }
}
