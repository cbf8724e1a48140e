//! # Events emitted by the bridge and its backend.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Detection events**: a tag entered or left the reader field
//! - **Lifecycle events**: listen started, shutdown requested, closed
//! - **Fault events**: unexpected poller exit, backend faults, subscriber drops
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! detected tag identifier, fault reasons, and process exit codes.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically in publish order. Detections are published by a single reader
//! task, so `Detect` events carry consecutive positions relative to the records
//! the poller produced: no reordering, no coalescing.
//!
//! ## Example
//! ```rust
//! use tagvisor::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::Detect).with_uid("AB12");
//!
//! assert_eq!(ev.kind, EventKind::Detect);
//! assert_eq!(ev.uid.as_deref(), Some("AB12"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of bridge events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Detection events ===
    /// A tag was detected in the reader field.
    ///
    /// Sets:
    /// - `uid`: tag identifier (parsed record or native UID)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Detect,

    /// A previously detected tag left the reader field.
    ///
    /// Only native backends can observe removal; the poller process reports
    /// detections only.
    ///
    /// Sets:
    /// - `uid`: tag identifier, when the binding reports one
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Removed,

    // === Lifecycle events ===
    /// The backend was started and the bridge is listening.
    ///
    /// Fired once startup is initiated, not once hardware is confirmed ready.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Listening,

    /// Shutdown requested (OS signal observed by [`guard_shutdown`](crate::NfcBridge::guard_shutdown)).
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// The bridge shut down and every subscriber was deregistered.
    ///
    /// This event, not the `close()` return, is the completion signal.
    /// Fired at most once per bridge.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Closed,

    // === Fault events ===
    /// The poller process exited without a prior close request.
    ///
    /// Sets:
    /// - `exit_code`: process exit code, if reported
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    UnexpectedExit,

    /// A backend fault after startup (native device error, poller i/o error).
    ///
    /// Sets:
    /// - `reason`: fault message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    BackendFault,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: panic info/message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SubscriberPanicked,
}

/// Bridge event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Tag identifier, if applicable.
    pub uid: Option<Arc<str>>,
    /// Human-readable reason (faults, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Poller process exit code (set for `UnexpectedExit`).
    pub exit_code: Option<i32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            uid: None,
            reason: None,
            exit_code: None,
        }
    }

    /// Attaches a tag identifier.
    #[inline]
    pub fn with_uid(mut self, uid: impl Into<Arc<str>>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a process exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Creates a detection event for the given tag identifier.
    #[inline]
    pub fn detect(uid: impl Into<Arc<str>>) -> Self {
        Event::now(EventKind::Detect).with_uid(uid)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// True for events that describe subscriber delivery problems.
    ///
    /// Used to keep overflow reporting from feeding back into itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::now(EventKind::Listening);
        let b = Event::now(EventKind::Detect);
        let c = Event::now(EventKind::Closed);
        assert!(a.seq < b.seq);
        assert!(b.seq < c.seq);
    }

    #[test]
    fn detect_carries_uid() {
        let ev = Event::detect("CD34");
        assert_eq!(ev.kind, EventKind::Detect);
        assert_eq!(ev.uid.as_deref(), Some("CD34"));
        assert!(ev.reason.is_none());
    }

    #[test]
    fn subscriber_events_are_flagged() {
        assert!(Event::subscriber_overflow("log", "full").is_subscriber_event());
        assert!(Event::subscriber_panicked("log", "boom".into()).is_subscriber_event());
        assert!(!Event::now(EventKind::Detect).is_subscriber_event());
    }
}
