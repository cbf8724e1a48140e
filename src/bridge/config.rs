//! # Bridge runtime configuration.
//!
//! Provides [`BridgeConfig`] centralized settings for the bridge and its
//! process backend.
//!
//! Config is used in two ways:
//! 1. **Bridge creation**: `NfcBridge::builder(config)`
//! 2. **Constructor sugar**: [`BridgeOptions`](crate::BridgeOptions) resolution
//!    produces one (e.g. the executable-path form)
//!
//! ## Sentinel values
//! - `bus_capacity` is clamped to a minimum of 1 by the bus.
//! - `grace = 0s` → no wait; the backend driver is aborted immediately on close.

use std::time::Duration;

use crate::backends::RecordFormat;

/// Conventional poller executable, used when no executable is configured.
pub const DEFAULT_EXECUTABLE: &str = "nfc-poll";

/// Configuration for a bridge and its default process backend.
///
/// ## Field semantics
/// - `executable`: poller binary name or path (resolved through `PATH`)
/// - `args`: arguments passed to the poller (usually empty)
/// - `format`: record grammar for the poller's stdout
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
/// - `grace`: maximum wait for the backend to stop on close before aborting
///
/// ## Notes
/// All fields are public for flexibility; the defaults match the conventional
/// `nfc-poll` setup.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Poller executable spawned by the process backend.
    pub executable: String,

    /// Arguments for the poller. Conventional pollers take none.
    pub args: Vec<String>,

    /// Record grammar used to split poller output into detections.
    pub format: RecordFormat,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow raw receivers that lag behind more than `bus_capacity` messages
    /// will observe `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Maximum time `close()` waits for the backend driver after the kill
    /// signal before aborting it and reporting
    /// [`BridgeError::GraceExceeded`](crate::BridgeError::GraceExceeded).
    pub grace: Duration,
}

impl BridgeConfig {
    /// Creates a config for the given executable, defaults elsewhere.
    pub fn for_executable(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for BridgeConfig {
    /// Default configuration:
    ///
    /// - `executable = "nfc-poll"` (conventional poller)
    /// - `args = []`
    /// - `format = RecordFormat::lines()` (every non-empty line is one record)
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            args: Vec::new(),
            format: RecordFormat::default(),
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}
