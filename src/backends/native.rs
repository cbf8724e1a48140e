//! # Native-binding detection backend.
//!
//! [`NativeBackend`] is a thin pass-through around an in-process binding that
//! already produces structured events. The binding is modeled by the
//! [`NativeHandle`] collaborator trait; at start the bridge bus is bound into
//! the handle (the emit-hook rebinding), so raw native events surface as
//! bridge events with **zero translation**. No parsing happens here.
//!
//! ```text
//! start(): handle.bind(bus) ──► handle.open()
//! run():   handle.listen(ctx) ──► publishes Detect/Removed through the bound bus
//! stop():  handle.close() + cancel
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::events::{Bus, Event, EventKind};

use super::backend::Backend;

/// # Collaborator contract for an in-process NFC binding.
///
/// Mirrors the binding surface the bridge needs: an emit hook, `listen`, and
/// `close`. Implementations publish [`Event`]s directly through the bus handed
/// to [`bind`](NativeHandle::bind) — typically `Detect` when a tag enters the
/// field and `Removed` when it leaves.
#[async_trait]
pub trait NativeHandle: Send + Sync + 'static {
    /// Rebinds the binding's emit hook onto the bridge bus.
    ///
    /// Called once, before [`open`](NativeHandle::open).
    fn bind(&self, sink: Bus);

    /// Opens the device. Fail-fast: errors abort the listen attempt.
    async fn open(&self) -> Result<(), BackendError>;

    /// Polls until the token is cancelled, publishing through the bound sink.
    ///
    /// Should return `Ok(())` on cooperative cancellation; an `Err` is treated
    /// as a backend fault. Device read failures map to [`BackendError::Io`].
    async fn listen(&self, ctx: CancellationToken) -> Result<(), BackendError>;

    /// Releases the device. Called after `listen` returns.
    async fn close(&self);
}

/// Relays events from a [`NativeHandle`] binding.
pub struct NativeBackend {
    name: Cow<'static, str>,
    handle: Arc<dyn NativeHandle>,
    stop_token: CancellationToken,
}

impl NativeBackend {
    /// Creates a backend around the given binding.
    pub fn new(name: impl Into<Cow<'static, str>>, handle: Arc<dyn NativeHandle>) -> Self {
        Self {
            name: name.into(),
            handle,
            stop_token: CancellationToken::new(),
        }
    }
}

#[async_trait]
impl Backend for NativeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, bus: &Bus) -> Result<(), BackendError> {
        self.handle.bind(bus.clone());
        self.handle.open().await
    }

    async fn run(&self, bus: Bus, ctx: CancellationToken) -> Result<(), BackendError> {
        let poll_token = ctx.child_token();
        let poll = self.handle.listen(poll_token.clone());
        tokio::pin!(poll);

        let res = tokio::select! {
            res = &mut poll => res,
            _ = self.stop_token.cancelled() => {
                poll_token.cancel();
                poll.await
            }
        };
        self.handle.close().await;

        match res {
            Ok(()) => Ok(()),
            Err(e) => {
                bus.publish(Event::now(EventKind::BackendFault).with_reason(e.to_string()));
                Err(e)
            }
        }
    }

    async fn stop(&self) {
        self.stop_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    /// Scripted binding: emits a fixed detect/remove sequence, then idles.
    struct ScriptedHandle {
        sink: Mutex<Option<Bus>>,
        closed: AtomicBool,
        fail_open: bool,
    }

    impl ScriptedHandle {
        fn new(fail_open: bool) -> Self {
            Self {
                sink: Mutex::new(None),
                closed: AtomicBool::new(false),
                fail_open,
            }
        }
    }

    #[async_trait]
    impl NativeHandle for ScriptedHandle {
        fn bind(&self, sink: Bus) {
            *self.sink.lock().unwrap() = Some(sink);
        }

        async fn open(&self) -> Result<(), BackendError> {
            if self.fail_open {
                return Err(BackendError::NativeInit {
                    error: "no device".to_string(),
                });
            }
            Ok(())
        }

        async fn listen(&self, ctx: CancellationToken) -> Result<(), BackendError> {
            let sink = self.sink.lock().unwrap().clone();
            if let Some(bus) = sink {
                bus.publish(Event::detect("AB12"));
                bus.publish(Event::now(EventKind::Removed).with_uid("AB12"));
            }
            ctx.cancelled().await;
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn relays_native_events_without_translation() {
        let handle = Arc::new(ScriptedHandle::new(false));
        let backend = Arc::new(NativeBackend::new("mock-native", handle.clone()));
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let ctx = CancellationToken::new();

        backend.start(&bus).await.unwrap();
        let runner = {
            let backend = Arc::clone(&backend);
            let bus = bus.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { backend.run(bus, ctx).await })
        };

        let detect = rx.recv().await.unwrap();
        assert_eq!(detect.kind, EventKind::Detect);
        assert_eq!(detect.uid.as_deref(), Some("AB12"));
        let removed = rx.recv().await.unwrap();
        assert_eq!(removed.kind, EventKind::Removed);

        backend.stop().await;
        let res = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
        assert!(res.is_ok());
        assert!(handle.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn open_failure_is_init_failure() {
        let handle = Arc::new(ScriptedHandle::new(true));
        let backend = NativeBackend::new("mock-native", handle);
        let bus = Bus::new(4);
        match backend.start(&bus).await {
            Err(e) => assert!(e.is_init_failure()),
            Ok(()) => panic!("open must fail"),
        }
    }
}
