//! # Canonical resolution of the polymorphic constructor forms.
//!
//! The bridge can be constructed four ways: with nothing, with a detect
//! callback, with an executable path, or with a full [`BridgeConfig`]. Instead
//! of overloading on dynamic types, each form is a [`BridgeOptions`] variant,
//! and [`BridgeOptions::resolve`] is a pure function mapping every shape to
//! one canonical `(config, optional detect subscriber)` pair. All four forms
//! yield bridges with identical listen/close contracts.
//!
//! ## Example
//! ```no_run
//! use tagvisor::{BridgeConfig, BridgeOptions, NfcBridge};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let _defaults = NfcBridge::new(BridgeOptions::default());
//! let _by_path = NfcBridge::new("mock-poller");
//! let _by_cb = NfcBridge::new(BridgeOptions::on_detect(|uid| println!("{uid}")));
//! let _by_cfg = NfcBridge::new(BridgeConfig::default());
//! # }
//! ```

use std::sync::Arc;

use crate::subscribers::{DetectFn, Subscribe};

use super::config::BridgeConfig;

/// Construction forms accepted by [`NfcBridge::new`](crate::NfcBridge::new).
#[derive(Default)]
pub enum BridgeOptions {
    /// No options: conventional poller, no pre-registered callback.
    #[default]
    Defaults,
    /// Sugar for registering a detect callback at construction.
    OnDetect(Arc<dyn Subscribe>),
    /// Executable name or path for the process backend.
    Executable(String),
    /// Full configuration.
    Config(BridgeConfig),
}

/// Canonical construction parameters every form resolves to.
pub(crate) struct ResolvedOptions {
    pub(crate) config: BridgeConfig,
    pub(crate) detect: Option<Arc<dyn Subscribe>>,
}

impl BridgeOptions {
    /// The callback form: `on_detect(|uid| ...)`.
    pub fn on_detect<F>(f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        BridgeOptions::OnDetect(DetectFn::arc("detect-callback", f))
    }

    /// Maps this form to the canonical configuration pair.
    pub(crate) fn resolve(self) -> ResolvedOptions {
        match self {
            BridgeOptions::Defaults => ResolvedOptions {
                config: BridgeConfig::default(),
                detect: None,
            },
            BridgeOptions::OnDetect(cb) => ResolvedOptions {
                config: BridgeConfig::default(),
                detect: Some(cb),
            },
            BridgeOptions::Executable(executable) => ResolvedOptions {
                config: BridgeConfig::for_executable(executable),
                detect: None,
            },
            BridgeOptions::Config(config) => ResolvedOptions {
                config,
                detect: None,
            },
        }
    }
}

impl From<&str> for BridgeOptions {
    fn from(executable: &str) -> Self {
        BridgeOptions::Executable(executable.to_string())
    }
}

impl From<String> for BridgeOptions {
    fn from(executable: String) -> Self {
        BridgeOptions::Executable(executable)
    }
}

impl From<BridgeConfig> for BridgeOptions {
    fn from(config: BridgeConfig) -> Self {
        BridgeOptions::Config(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::config::DEFAULT_EXECUTABLE;

    #[test]
    fn defaults_resolve_to_conventional_poller() {
        let resolved = BridgeOptions::Defaults.resolve();
        assert_eq!(resolved.config.executable, DEFAULT_EXECUTABLE);
        assert!(resolved.detect.is_none());
    }

    #[test]
    fn executable_forms_resolve_to_path() {
        let resolved = BridgeOptions::from("mock-poller").resolve();
        assert_eq!(resolved.config.executable, "mock-poller");
        assert!(resolved.detect.is_none());

        let resolved = BridgeOptions::from("other".to_string()).resolve();
        assert_eq!(resolved.config.executable, "other");
    }

    #[test]
    fn callback_form_carries_subscriber() {
        let resolved = BridgeOptions::on_detect(|_uid| {}).resolve();
        assert_eq!(resolved.config.executable, DEFAULT_EXECUTABLE);
        assert!(resolved.detect.is_some());
    }

    #[test]
    fn config_form_is_passed_through() {
        let mut cfg = BridgeConfig::default();
        cfg.executable = "custom".to_string();
        cfg.bus_capacity = 8;
        let resolved = BridgeOptions::from(cfg).resolve();
        assert_eq!(resolved.config.executable, "custom");
        assert_eq!(resolved.config.bus_capacity, 8);
    }
}
