//! # Builder for constructing a bridge with optional features.
//!
//! [`BridgeBuilder`] wires the bus, the subscriber set, and the backend
//! together. Most consumers go through [`NfcBridge::new`](crate::NfcBridge::new);
//! the builder exists for pre-registering subscribers and injecting a custom
//! backend (a [`NativeBackend`](crate::NativeBackend), or a test double).

use std::sync::Arc;

use crate::backends::{BackendRef, ProcessBackend};
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::bridge::NfcBridge;
use super::config::BridgeConfig;

/// Builder for [`NfcBridge`].
pub struct BridgeBuilder {
    cfg: BridgeConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    backend: Option<BackendRef>,
}

impl BridgeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BridgeConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            backend: None,
        }
    }

    /// Sets event subscribers registered before the bridge starts.
    ///
    /// Subscribers receive bridge events (detections, lifecycle, faults)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber, keeping any already configured.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Replaces the default process backend with a custom one.
    pub fn with_backend(mut self, backend: BackendRef) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Builds and returns the bridge instance.
    ///
    /// Without [`with_backend`](Self::with_backend), a [`ProcessBackend`] is
    /// built from the configured executable/args/format.
    pub fn build(self) -> Arc<NfcBridge> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let backend = self.backend.unwrap_or_else(|| {
            Arc::new(ProcessBackend::new(
                self.cfg.executable.clone(),
                self.cfg.args.clone(),
                self.cfg.format.clone(),
                self.cfg.grace,
            ))
        });
        NfcBridge::assemble(self.cfg, bus, backend, subs)
    }
}
