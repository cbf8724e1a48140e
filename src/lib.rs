//! # tagvisor
//!
//! **Tagvisor** is a lightweight event bridge for NFC tag detection.
//!
//! It supervises a detection backend (an external polling executable or an
//! in-process native binding) and relays its signals to application code as
//! a consistent, ordered event stream. The crate is designed as a building
//! block for kiosks, access readers, and anything else that reacts to a tag
//! entering the field.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │  NfcBridge (lifecycle orchestrator)                          │
//!     │  - Bus (broadcast events)                                    │
//!     │  - SubscriberSet (fans out to user subscribers)              │
//!     │  - exactly one Backend                                       │
//!     └───────┬───────────────────────────────┬──────────────────────┘
//!             ▼                               ▼
//!     ┌───────────────────────┐   ┌────────────────────────────┐
//!     │  ProcessBackend       │   │  NativeBackend             │
//!     │  spawn("nfc-poll")    │   │  Arc<dyn NativeHandle>     │
//!     │  stdout ─► chunks     │   │  binding publishes events  │
//!     │  OutputParser         │   │  directly (no parsing)     │
//!     │  ─► Detect per record │   │                            │
//!     └──────────┬────────────┘   └──────────┬─────────────────┘
//!                │ publish                   │ publish
//!                ▼                           ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Bus (broadcast channel)                     │
//! └───────────────┬──────────────────────────────────┬───────────────┘
//!                 ▼                                  ▼
//!        fan-out listener                     raw receivers
//!          (in NfcBridge)                  (NfcBridge::events)
//!       ┌────────┼────────┐
//!       ▼        ▼        ▼
//!   [queue S1][queue S2][queue SN]    (per-subscriber bounded queues)
//!       ▼        ▼        ▼
//!   sub1.on  sub2.on  subN.on
//!    _event() _event()  _event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! NfcBridge::new(options) ──► listen() ──► backend.start()   (fail-fast)
//!                                     ├─► publish(Listening)
//!                                     └─► backend.run()      (driver task)
//!
//! backend output ──► Detect events, in record production order
//!
//! close() ──► backend.stop() + cancel
//!        ├─► driver joins within grace (else aborted)
//!        ├─► publish(Closed)
//!        └─► every subscriber deregistered; bridge inert
//!
//! poller dies uninvited ──► publish(UnexpectedExit), state = Faulted
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                    |
//! |-------------------|----------------------------------------------------------------------|---------------------------------------|
//! | **Bridge**        | Construct, listen, close; ordered detect/lifecycle event stream.     | [`NfcBridge`], [`BridgeOptions`]      |
//! | **Backends**      | Poller process or native binding behind one trait.                   | [`Backend`], [`ProcessBackend`], [`NativeBackend`], [`NativeHandle`] |
//! | **Parsing**       | Chunked poller output split into complete records.                   | [`OutputParser`], [`RecordFormat`]    |
//! | **Subscriber API**| Hook into detection/lifecycle events (callbacks or trait impls).     | [`Subscribe`], [`DetectFn`]           |
//! | **Errors**        | Typed errors for the bridge lifecycle and backends.                  | [`BridgeError`], [`BackendError`]     |
//! | **Configuration** | Centralize runtime settings.                                         | [`BridgeConfig`]                      |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use tagvisor::{BridgeConfig, EventKind, NfcBridge, RecordFormat};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = BridgeConfig::default();
//!     cfg.format = RecordFormat::with_prefix("TAG:");
//!
//!     let bridge = NfcBridge::new(cfg);
//!     bridge.on_detect(|uid| println!("tag detected: {uid}"));
//!
//!     // Close the bridge (and kill the poller) on SIGINT/SIGTERM.
//!     bridge.guard_shutdown();
//!     bridge.listen().await?;
//!
//!     // The Closed event, not close() itself, signals completion.
//!     let mut events = bridge.events();
//!     while let Ok(ev) = events.recv().await {
//!         if ev.kind == EventKind::Closed {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod backends;
mod bridge;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use backends::{Backend, BackendRef, NativeBackend, NativeHandle, OutputParser, ProcessBackend, RecordFormat};
pub use bridge::{BridgeBuilder, BridgeConfig, BridgeOptions, BridgeState, NfcBridge, DEFAULT_EXECUTABLE};
pub use error::{BackendError, BridgeError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{DetectFn, EventFn, Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
