//! Error types used by the bridge and its backends.
//!
//! This module defines two main error enums:
//!
//! - [`BridgeError`] — errors raised by the bridge lifecycle itself.
//! - [`BackendError`] — errors raised by a backend (poller process or native binding).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! ## Propagation policy
//! Initialization failures surface synchronously from
//! [`NfcBridge::listen`](crate::NfcBridge::listen) as [`BridgeError::BackendInit`].
//! Faults after startup (unexpected poller exit, native device errors) are
//! published as events on the bus instead of being returned; see
//! [`EventKind::UnexpectedExit`](crate::EventKind::UnexpectedExit) and
//! [`EventKind::BackendFault`](crate::EventKind::BackendFault).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the bridge lifecycle.
///
/// These represent misuse of the listen/close contract or a shutdown that did
/// not complete in time. A second `close()` is **not** an error: it is a
/// documented no-op.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Backend failed to initialize at `listen()` time (spawn or binding failure).
    #[error("backend failed to initialize: {source}")]
    BackendInit {
        /// The underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// `listen()` was called while the bridge is already listening.
    #[error("bridge is already listening")]
    AlreadyListening,

    /// `listen()` was called on a bridge that has been closed.
    ///
    /// A closed bridge is inert; construct a new one to listen again.
    #[error("bridge is closed")]
    Closed,

    /// The backend driver did not stop within the configured grace window and
    /// was aborted.
    #[error("close grace {grace:?} exceeded; backend driver aborted")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },
}

impl BridgeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tagvisor::BridgeError;
    ///
    /// assert_eq!(BridgeError::AlreadyListening.as_label(), "bridge_already_listening");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeError::BackendInit { .. } => "bridge_backend_init",
            BridgeError::AlreadyListening => "bridge_already_listening",
            BridgeError::Closed => "bridge_closed",
            BridgeError::GraceExceeded { .. } => "bridge_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BridgeError::BackendInit { source } => format!("backend init: {source}"),
            BridgeError::AlreadyListening => "already listening".to_string(),
            BridgeError::Closed => "bridge closed".to_string(),
            BridgeError::GraceExceeded { grace } => {
                format!("grace exceeded after {grace:?}; driver aborted")
            }
        }
    }
}

/// # Errors produced by a detection backend.
///
/// Raised by the poller-process backend or by a [`NativeHandle`](crate::NativeHandle)
/// collaborator. Init-time variants (`ExecutableNotFound`, `Spawn`, `NativeInit`)
/// reach the consumer through [`BridgeError::BackendInit`]; runtime variants are
/// published as events.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BackendError {
    /// The configured poller executable could not be located.
    #[error("executable not found: {executable}")]
    ExecutableNotFound {
        /// Name or path of the executable that was looked up.
        executable: String,
    },

    /// The poller process could not be spawned (other than not-found).
    #[error("failed to spawn poller: {error}")]
    Spawn {
        /// The underlying error message.
        error: String,
    },

    /// The native binding failed to open the device.
    #[error("native binding failed: {error}")]
    NativeInit {
        /// The underlying error message.
        error: String,
    },

    /// I/O failure while talking to the device or reading poller output.
    #[error("backend i/o failed: {error}")]
    Io {
        /// The underlying error message.
        error: String,
    },

    /// The poller process exited without a prior close request.
    #[error("poller exited unexpectedly (code {exit_code:?})")]
    UnexpectedExit {
        /// Process exit code, if the OS reported one.
        exit_code: Option<i32>,
    },
}

impl BackendError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BackendError::ExecutableNotFound { .. } => "backend_executable_not_found",
            BackendError::Spawn { .. } => "backend_spawn",
            BackendError::NativeInit { .. } => "backend_native_init",
            BackendError::Io { .. } => "backend_io",
            BackendError::UnexpectedExit { .. } => "backend_unexpected_exit",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BackendError::ExecutableNotFound { executable } => {
                format!("not found: {executable}")
            }
            BackendError::Spawn { error } => format!("spawn: {error}"),
            BackendError::NativeInit { error } => format!("native init: {error}"),
            BackendError::Io { error } => format!("i/o: {error}"),
            BackendError::UnexpectedExit { exit_code } => {
                format!("unexpected exit: code={exit_code:?}")
            }
        }
    }

    /// True when this error describes an init-time failure (fatal to `listen()`).
    ///
    /// # Example
    /// ```
    /// use tagvisor::BackendError;
    ///
    /// let err = BackendError::ExecutableNotFound { executable: "nfc-poll".into() };
    /// assert!(err.is_init_failure());
    ///
    /// let err = BackendError::UnexpectedExit { exit_code: Some(1) };
    /// assert!(!err.is_init_failure());
    /// ```
    pub fn is_init_failure(&self) -> bool {
        matches!(
            self,
            BackendError::ExecutableNotFound { .. }
                | BackendError::Spawn { .. }
                | BackendError::NativeInit { .. }
        )
    }
}
