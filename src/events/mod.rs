//! Bridge events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the bridge and its backend.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `NfcBridge` (lifecycle), backends (detections, faults),
//!   `SubscriberSet` (overflow/panic).
//! - **Consumers**: the bridge fan-out listener (delivers to subscribers in bus
//!   order) and any raw receiver obtained via
//!   [`NfcBridge::events`](crate::NfcBridge::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
