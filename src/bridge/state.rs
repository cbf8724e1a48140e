//! # Bridge lifecycle probe.
//!
//! Tracks which phase of the listen/close lifecycle the bridge is in:
//!
//! ```text
//! Idle ──► Starting ──► Listening ──► Stopping ──► Closed
//!                           │
//!                           └─────► Faulted   (backend died without a close request)
//! ```
//!
//! `Faulted` is terminal-ish: the backend is gone, but an explicit `close()`
//! still runs the teardown path and lands in `Closed`.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of an [`NfcBridge`](crate::NfcBridge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BridgeState {
    /// Constructed, not yet listening.
    Idle = 0,
    /// `listen()` is initializing the backend.
    Starting = 1,
    /// Backend running, events flowing.
    Listening = 2,
    /// `close()` is tearing the backend down.
    Stopping = 3,
    /// Shut down; the bridge is inert.
    Closed = 4,
    /// Backend terminated without a close request.
    Faulted = 5,
}

/// Lock-free cell holding the current [`BridgeState`].
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(BridgeState::Idle as u8))
    }

    pub(crate) fn get(&self) -> BridgeState {
        match self.0.load(Ordering::SeqCst) {
            0 => BridgeState::Idle,
            1 => BridgeState::Starting,
            2 => BridgeState::Listening,
            3 => BridgeState::Stopping,
            4 => BridgeState::Closed,
            _ => BridgeState::Faulted,
        }
    }

    pub(crate) fn set(&self, state: BridgeState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Moves to `Faulted` only if still `Listening`; a close that already
    /// started keeps its `Stopping`/`Closed` state.
    pub(crate) fn fault(&self) {
        let _ = self.0.compare_exchange(
            BridgeState::Listening as u8,
            BridgeState::Faulted as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_only_from_listening() {
        let cell = StateCell::new();
        cell.fault();
        assert_eq!(cell.get(), BridgeState::Idle);

        cell.set(BridgeState::Listening);
        cell.fault();
        assert_eq!(cell.get(), BridgeState::Faulted);

        cell.set(BridgeState::Stopping);
        cell.fault();
        assert_eq!(cell.get(), BridgeState::Stopping);
    }
}
