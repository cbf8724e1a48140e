//! Bridge core: construction, lifecycle, and shutdown.
//!
//! The only long-lived object from this module is [`NfcBridge`], which owns
//! the backend, the bus, and the subscriber registry.
//!
//! Internal modules:
//! - [`bridge`]: listen/close lifecycle, fan-out, grace-window teardown;
//! - [`builder`]: construction of a bridge with custom subscribers/backend;
//! - [`config`]: runtime configuration with sentinel semantics;
//! - [`options`]: canonical resolution of the polymorphic constructor forms;
//! - [`state`]: lifecycle probe;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod bridge;
mod builder;
mod config;
mod options;
mod shutdown;
mod state;

pub use bridge::NfcBridge;
pub use builder::BridgeBuilder;
pub use config::{BridgeConfig, DEFAULT_EXECUTABLE};
pub use options::BridgeOptions;
pub use state::BridgeState;
