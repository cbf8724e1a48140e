//! # Backend abstraction.
//!
//! This module defines the [`Backend`] trait, the seam between the bridge and
//! whatever produces raw detection signals. The common handle type is
//! [`BackendRef`], an `Arc<dyn Backend>` suitable for sharing across tasks.
//!
//! ## Lifecycle
//! ```text
//! listen():  start()  ── fail-fast init (spawn process / open device)
//!            run()    ── driven on a spawned task until close or failure
//! close():   stop()   ── request termination (kill signal / native close)
//!            token    ── cancelled; run() observes it at safe points
//! ```
//!
//! `start` and `run` are split so that initialization failures (executable not
//! found, binding load) surface synchronously from `listen()`, while the
//! long-running polling loop is driven in the background.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::events::Bus;

/// Shared handle to a backend.
pub type BackendRef = Arc<dyn Backend>;

/// # Source of detection signals with start/run/stop primitives.
///
/// A backend publishes [`Event`](crate::Event)s to the bus handed to it; the
/// bridge never inspects backend internals. Implementations must honor
/// cooperative cancellation: `run` exits promptly once the token is cancelled
/// or `stop` was called, and samples its close state **at exit time** to
/// distinguish a requested shutdown from a crash.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Returns a stable, human-readable backend name (for logs/events).
    fn name(&self) -> &str;

    /// Fail-fast initialization: spawn the poller process or open the device.
    ///
    /// Called exactly once, from `listen()`. Errors here abort the listen
    /// attempt and are returned to the caller.
    async fn start(&self, bus: &Bus) -> Result<(), BackendError>;

    /// Drives the backend until close or failure. Requires a prior `start()`.
    ///
    /// Runs on a spawned task. On a requested shutdown (token cancelled or
    /// `stop()` invoked) returns `Ok(())` after cleanup; on an unrequested
    /// termination publishes the corresponding fault event and returns the
    /// error.
    async fn run(&self, bus: Bus, ctx: CancellationToken) -> Result<(), BackendError>;

    /// Requests termination: sets the should-close flag and sends the kill
    /// signal (process) or closes the binding (native).
    ///
    /// Termination is asynchronous; completion is observed by `run` returning.
    async fn stop(&self);
}
