//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [listening]
//! [detect] uid=AB12
//! [removed] uid=AB12
//! [unexpected-exit] code=Some(1) reason="poller exited unexpectedly (code Some(1))"
//! [closed]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event descriptions
/// to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::Detect => {
                if let Some(uid) = &e.uid {
                    println!("[detect] uid={uid}");
                }
            }
            EventKind::Removed => {
                println!("[removed] uid={:?}", e.uid);
            }
            EventKind::Listening => {
                println!("[listening]");
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::Closed => {
                println!("[closed]");
            }
            EventKind::UnexpectedExit => {
                println!(
                    "[unexpected-exit] code={:?} reason={:?}",
                    e.exit_code, e.reason
                );
            }
            EventKind::BackendFault => {
                println!("[backend-fault] reason={:?}", e.reason);
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] reason={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
