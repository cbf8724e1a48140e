//! # Closure-backed subscribers (`DetectFn`, `EventFn`)
//!
//! Adapters that turn plain closures into [`Subscribe`] implementations, for
//! consumers who want a callback rather than a trait impl:
//!
//! - [`DetectFn`] invokes its closure with the tag identifier of every
//!   `Detect` event (the callback-style construction form of the bridge).
//! - [`EventFn`] invokes its closure with every event of one chosen kind
//!   (used internally for `listen_with`/`close_with` sugar).
//!
//! Each call creates **no** shared mutable state; if the closure needs state,
//! capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use tagvisor::DetectFn;
//!
//! let cb = DetectFn::arc("print-uid", |uid| println!("tag: {uid}"));
//! assert_eq!(tagvisor::Subscribe::name(&*cb), "print-uid");
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Subscriber that invokes a closure for every detected tag.
///
/// The closure receives the tag identifier; all other event kinds are ignored.
pub struct DetectFn<F> {
    name: &'static str,
    f: F,
}

impl<F> DetectFn<F>
where
    F: Fn(&str) + Send + Sync + 'static,
{
    /// Creates a new detect-callback subscriber.
    ///
    /// Prefer [`DetectFn::arc`] when you immediately need an `Arc<dyn Subscribe>`.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the subscriber and returns it as a shared handle.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F> Subscribe for DetectFn<F>
where
    F: Fn(&str) + Send + Sync + 'static,
{
    async fn on_event(&self, event: &Event) {
        if event.kind == EventKind::Detect {
            if let Some(uid) = event.uid.as_deref() {
                (self.f)(uid);
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Subscriber that invokes a closure for every event of one kind.
pub struct EventFn<F> {
    name: &'static str,
    kind: EventKind,
    f: F,
}

impl<F> EventFn<F>
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    /// Creates a new single-kind callback subscriber.
    pub fn new(name: &'static str, kind: EventKind, f: F) -> Self {
        Self { name, kind, f }
    }

    /// Creates the subscriber and returns it as a shared handle.
    pub fn arc(name: &'static str, kind: EventKind, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, kind, f))
    }
}

#[async_trait]
impl<F> Subscribe for EventFn<F>
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    async fn on_event(&self, event: &Event) {
        if event.kind == self.kind {
            (self.f)(event);
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[tokio::test]
    async fn detect_fn_sees_only_detections() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = DetectFn::new("collect", move |uid: &str| {
            sink.lock().unwrap().push(uid.to_string());
        });

        sub.on_event(&Event::now(EventKind::Listening)).await;
        sub.on_event(&Event::detect("AB12")).await;
        sub.on_event(&Event::now(EventKind::Closed)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["AB12".to_string()]);
    }

    #[tokio::test]
    async fn event_fn_filters_by_kind() {
        let hits = Arc::new(Mutex::new(0u32));
        let sink = hits.clone();
        let sub = EventFn::new("on-close", EventKind::Closed, move |_ev| {
            *sink.lock().unwrap() += 1;
        });

        sub.on_event(&Event::detect("AB12")).await;
        sub.on_event(&Event::now(EventKind::Closed)).await;

        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
