//! # NfcBridge: lifecycle, fan-out delivery, and graceful teardown.
//!
//! The [`NfcBridge`] owns the event bus, a [`SubscriberSet`], and exactly one
//! backend. It relays backend detections to subscribers and guarantees the
//! ordered lifecycle the consumer observes.
//!
//! ## Key responsibilities
//! - start the backend fail-fast and drive it on a spawned task
//! - subscribe to the [`Bus`] and **fan-out** events via [`SubscriberSet`]
//! - tear the backend down within a configurable grace window on `close()`
//! - deregister every subscriber once `Closed` has been delivered
//!
//! ## High-level architecture
//! ```text
//! listen():
//!   - backend.start(&bus)            (fail-fast: spawn poller / open device)
//!   - fan-out listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - publish(Listening)
//!   - driver task: backend.run(bus, token.child_token())
//!
//! Event flow:
//!   Backend ── publish(Event) ──► Bus ──► fan-out listener ──► SubscriberSet
//!                                   │                       ┌────────┼────────┐
//!                                   │                       ▼        ▼        ▼
//!                                   │                   [queue S1][queue S2][queue SN]
//!                                   └──► raw receivers (NfcBridge::events)
//!
//! close():
//!   backend.stop() + token.cancel()
//!             └─► driver joins within cfg.grace (else aborted → GraceExceeded)
//!             └─► publish(Closed)
//!             └─► fan-out listener forwards Closed, drains queues, exits
//!             └─► every subscriber deregistered; bridge inert
//! ```
//!
//! ## Rules
//! - `Detect` events reach subscribers in record production order.
//! - The `Closed` event, not the `close()` return, is the completion signal.
//! - A second `close()` is a no-op; `close()` before `listen()` is valid and
//!   fires `Closed` at most once.
//!
//! ## Example
//! ```no_run
//! use tagvisor::NfcBridge;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = NfcBridge::new("nfc-poll");
//!     bridge.on_detect(|uid| println!("tag: {uid}"));
//!     bridge.guard_shutdown();
//!     bridge.listen().await?;
//!
//!     let mut events = bridge.events();
//!     while let Ok(ev) = events.recv().await {
//!         if ev.kind == tagvisor::EventKind::Closed {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::backends::{Backend, BackendRef};
use crate::error::BridgeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{DetectFn, EventFn, Subscribe, SubscriberSet};

use super::builder::BridgeBuilder;
use super::config::BridgeConfig;
use super::options::BridgeOptions;
use super::shutdown;
use super::state::{BridgeState, StateCell};

/// Handles owned while the bridge is listening.
struct Running {
    token: CancellationToken,
    driver: JoinHandle<()>,
    fanout: JoinHandle<()>,
}

/// Relays detection events from one backend to registered subscribers.
pub struct NfcBridge {
    cfg: BridgeConfig,
    bus: Bus,
    backend: BackendRef,
    subs: Arc<SubscriberSet>,

    /// Set once close is requested; prevents re-entrant restarts.
    closing: AtomicBool,
    /// Set once the shutdown guard is registered; never double-registers.
    hooked: AtomicBool,
    state: Arc<StateCell>,
    running: Mutex<Option<Running>>,
}

impl NfcBridge {
    /// Creates a bridge from any construction form.
    ///
    /// Accepts nothing ([`BridgeOptions::default`]), a detect callback
    /// ([`BridgeOptions::on_detect`]), an executable path (`&str`/`String`),
    /// or a full [`BridgeConfig`]. Every form yields an identical
    /// listen/close contract.
    pub fn new(options: impl Into<BridgeOptions>) -> Arc<Self> {
        let resolved = options.into().resolve();
        let mut builder = Self::builder(resolved.config);
        if let Some(detect) = resolved.detect {
            builder = builder.with_subscriber(detect);
        }
        builder.build()
    }

    /// Returns a builder for pre-registering subscribers or injecting a
    /// custom backend.
    pub fn builder(cfg: BridgeConfig) -> BridgeBuilder {
        BridgeBuilder::new(cfg)
    }

    pub(crate) fn assemble(
        cfg: BridgeConfig,
        bus: Bus,
        backend: BackendRef,
        subs: Arc<SubscriberSet>,
    ) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            bus,
            backend,
            subs,
            closing: AtomicBool::new(false),
            hooked: AtomicBool::new(false),
            state: Arc::new(StateCell::new()),
            running: Mutex::new(None),
        })
    }

    /// Starts the backend and begins relaying events.
    ///
    /// Fail-fast: backend initialization errors (executable not found,
    /// binding load failure) are returned as [`BridgeError::BackendInit`] and
    /// the bridge stays idle. On success [`EventKind::Listening`] is published
    /// once startup is initiated, before hardware confirms readiness.
    ///
    /// ### Errors
    /// - [`BridgeError::Closed`] after `close()`
    /// - [`BridgeError::AlreadyListening`] while a backend is live
    /// - [`BridgeError::BackendInit`] when the backend fails to start
    pub async fn listen(&self) -> Result<(), BridgeError> {
        let mut running = self.running.lock().await;
        if self.closing.load(Ordering::SeqCst) {
            return Err(BridgeError::Closed);
        }
        if running.is_some() {
            return Err(BridgeError::AlreadyListening);
        }

        self.state.set(BridgeState::Starting);
        if let Err(source) = self.backend.start(&self.bus).await {
            self.state.set(BridgeState::Idle);
            return Err(BridgeError::BackendInit { source });
        }

        let token = CancellationToken::new();
        let fanout = self.spawn_fanout();
        self.state.set(BridgeState::Listening);
        self.bus.publish(Event::now(EventKind::Listening));
        let driver = self.spawn_driver(token.child_token());

        *running = Some(Running {
            token,
            driver,
            fanout,
        });
        Ok(())
    }

    /// [`listen`](Self::listen) with a callback registered against
    /// [`EventKind::Listening`] first.
    pub async fn listen_with<F>(&self, f: F) -> Result<(), BridgeError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(EventFn::arc("listen-callback", EventKind::Listening, f));
        self.listen().await
    }

    /// Shuts the backend down and deregisters every subscriber.
    ///
    /// Idempotent: a second call (and a call before `listen()`) is a no-op
    /// returning `Ok`. The sequence on an open bridge:
    ///
    /// 1. backend `stop()` + runtime token cancelled,
    /// 2. driver joined within `cfg.grace` (aborted past it),
    /// 3. [`EventKind::Closed`] published and delivered to all subscribers,
    /// 4. all subscribers deregistered; the bridge is inert.
    ///
    /// ### Errors
    /// - [`BridgeError::GraceExceeded`] when the driver had to be aborted;
    ///   `Closed` is still delivered and the bridge still ends up inert.
    pub async fn close(&self) -> Result<(), BridgeError> {
        if self.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let Some(run) = self.running.lock().await.take() else {
            // never listened: nothing to tear down, still fire Closed once
            self.state.set(BridgeState::Closed);
            let ev = Event::now(EventKind::Closed);
            self.bus.publish_ref(&ev);
            self.subs.emit(&ev);
            self.subs.shutdown().await;
            return Ok(());
        };

        self.state.set(BridgeState::Stopping);
        self.backend.stop().await;
        run.token.cancel();

        let mut driver = run.driver;
        let graceful = time::timeout(self.cfg.grace, &mut driver).await.is_ok();
        if !graceful {
            driver.abort();
            let _ = driver.await;
        }

        // The driver is gone: every Detect it published is already in the bus
        // ahead of Closed, and nothing can publish after it.
        self.bus.publish(Event::now(EventKind::Closed));
        let _ = run.fanout.await;
        self.state.set(BridgeState::Closed);

        if graceful {
            Ok(())
        } else {
            Err(BridgeError::GraceExceeded {
                grace: self.cfg.grace,
            })
        }
    }

    /// [`close`](Self::close) with a callback registered against
    /// [`EventKind::Closed`] first.
    pub async fn close_with<F>(&self, f: F) -> Result<(), BridgeError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        if !self.closing.load(Ordering::SeqCst) {
            self.subscribe(EventFn::arc("close-callback", EventKind::Closed, f));
        }
        self.close().await
    }

    /// Registers a callback invoked with the identifier of every detected tag.
    pub fn on_detect<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe(DetectFn::arc("on-detect", f));
    }

    /// Registers a subscriber.
    ///
    /// Subscribers observe only events published after registration; on a
    /// closed bridge the registration is dropped.
    pub fn subscribe(&self, sub: Arc<dyn Subscribe>) {
        if self.closing.load(Ordering::SeqCst) {
            return;
        }
        self.subs.add(sub);
    }

    /// Returns a raw receiver over the event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Returns the current lifecycle phase.
    pub fn state(&self) -> BridgeState {
        self.state.get()
    }

    /// Registers the host-process shutdown hook.
    ///
    /// Explicitly called by the application harness (not implicit in
    /// `listen()`): when the process receives SIGINT/SIGTERM/SIGQUIT/Ctrl-C,
    /// the hook publishes [`EventKind::ShutdownRequested`] and drives
    /// `close()`, so the poller process is never orphaned. Registered at most
    /// once per bridge; repeated calls are no-ops.
    pub fn guard_shutdown(self: &Arc<Self>) {
        if self.hooked.swap(true, Ordering::SeqCst) {
            return;
        }
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            if shutdown::wait_for_shutdown_signal().await.is_ok() {
                bridge.bus.publish(Event::now(EventKind::ShutdownRequested));
                let _ = bridge.close().await;
            }
        });
    }

    /// Forwards bus events to the subscriber set in bus order.
    ///
    /// Exits after forwarding `Closed`, draining and deregistering every
    /// subscriber on the way out.
    fn spawn_fanout(&self) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let closed = ev.kind == EventKind::Closed;
                        subs.emit(&ev);
                        if closed {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            subs.shutdown().await;
        })
    }

    /// Drives the backend; marks the bridge faulted if it dies uninvited.
    fn spawn_driver(&self, ctx: CancellationToken) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let bus = self.bus.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if backend.run(bus, ctx).await.is_err() {
                state.fault();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::backends::Backend;
    use crate::error::BackendError;

    #[derive(Clone, Copy)]
    enum MockMode {
        /// Publish the scripted uids, then idle until cancelled.
        Idle,
        /// Publish the scripted uids, then die like a crashed poller.
        Crash(i32),
        /// Publish uids in a tight loop until cancelled.
        Stream,
    }

    struct MockBackend {
        uids: Vec<&'static str>,
        mode: MockMode,
        fail_start: bool,
    }

    impl MockBackend {
        fn arc(uids: Vec<&'static str>, mode: MockMode) -> Arc<Self> {
            Arc::new(Self {
                uids,
                mode,
                fail_start: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                uids: Vec::new(),
                mode: MockMode::Idle,
                fail_start: true,
            })
        }
    }

    #[async_trait]
    impl Backend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        async fn start(&self, _bus: &Bus) -> Result<(), BackendError> {
            if self.fail_start {
                return Err(BackendError::ExecutableNotFound {
                    executable: "mock".to_string(),
                });
            }
            Ok(())
        }

        async fn run(&self, bus: Bus, ctx: CancellationToken) -> Result<(), BackendError> {
            for uid in &self.uids {
                bus.publish(Event::detect(*uid));
            }
            match self.mode {
                MockMode::Idle => {
                    ctx.cancelled().await;
                    Ok(())
                }
                MockMode::Crash(code) => {
                    let err = BackendError::UnexpectedExit {
                        exit_code: Some(code),
                    };
                    bus.publish(
                        Event::now(EventKind::UnexpectedExit)
                            .with_exit_code(Some(code))
                            .with_reason(err.to_string()),
                    );
                    Err(err)
                }
                MockMode::Stream => {
                    while !ctx.is_cancelled() {
                        bus.publish(Event::detect("STREAM"));
                        time::sleep(Duration::from_millis(1)).await;
                    }
                    Ok(())
                }
            }
        }

        async fn stop(&self) {}
    }

    /// Records every delivered event kind (and uid) in order.
    struct Collector {
        seen: StdMutex<Vec<(EventKind, Option<String>)>>,
    }

    impl Collector {
        fn arc() -> Arc<Self> {
            Arc::new(Self {
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn kinds(&self) -> Vec<EventKind> {
            self.seen.lock().unwrap().iter().map(|(k, _)| *k).collect()
        }

        fn uids(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(_, uid)| uid.clone())
                .collect()
        }

        fn len(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Subscribe for Collector {
        async fn on_event(&self, ev: &Event) {
            self.seen
                .lock()
                .unwrap()
                .push((ev.kind, ev.uid.as_deref().map(str::to_string)));
        }
        fn name(&self) -> &'static str {
            "collector"
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = time::Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(time::Instant::now() < deadline, "condition not met in time");
            time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn bridge_with(backend: Arc<MockBackend>, collector: Arc<Collector>) -> Arc<NfcBridge> {
        NfcBridge::builder(BridgeConfig::default())
            .with_backend(backend)
            .with_subscriber(collector)
            .build()
    }

    #[tokio::test]
    async fn detects_flow_in_order_between_listening_and_closed() {
        let collector = Collector::arc();
        let bridge = bridge_with(
            MockBackend::arc(vec!["AB12", "CD34"], MockMode::Idle),
            collector.clone(),
        );

        bridge.listen().await.unwrap();
        assert_eq!(bridge.state(), BridgeState::Listening);
        wait_until(|| collector.len() >= 3).await;

        bridge.close().await.unwrap();
        assert_eq!(bridge.state(), BridgeState::Closed);

        assert_eq!(
            collector.kinds(),
            vec![
                EventKind::Listening,
                EventKind::Detect,
                EventKind::Detect,
                EventKind::Closed,
            ]
        );
        assert_eq!(collector.uids(), vec!["AB12", "CD34"]);
    }

    #[tokio::test]
    async fn no_detect_is_delivered_after_closed() {
        let collector = Collector::arc();
        let bridge = bridge_with(MockBackend::arc(Vec::new(), MockMode::Stream), collector.clone());

        bridge.listen().await.unwrap();
        wait_until(|| collector.len() >= 5).await;
        bridge.close().await.unwrap();

        let settled = collector.len();
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(collector.len(), settled, "events arrived after Closed");
        assert_eq!(collector.kinds().last(), Some(&EventKind::Closed));
    }

    #[tokio::test]
    async fn close_before_listen_fires_closed_at_most_once() {
        let collector = Collector::arc();
        let bridge = bridge_with(MockBackend::arc(Vec::new(), MockMode::Idle), collector.clone());

        bridge.close().await.unwrap();
        bridge.close().await.unwrap();

        wait_until(|| collector.len() >= 1).await;
        assert_eq!(collector.kinds(), vec![EventKind::Closed]);
        assert_eq!(bridge.state(), BridgeState::Closed);
    }

    #[tokio::test]
    async fn double_close_after_listen_is_a_noop() {
        let collector = Collector::arc();
        let bridge = bridge_with(MockBackend::arc(Vec::new(), MockMode::Idle), collector.clone());

        bridge.listen().await.unwrap();
        bridge.close().await.unwrap();
        bridge.close().await.unwrap();

        let closes = collector
            .kinds()
            .iter()
            .filter(|k| **k == EventKind::Closed)
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn double_listen_is_rejected() {
        let bridge = bridge_with(MockBackend::arc(Vec::new(), MockMode::Idle), Collector::arc());

        bridge.listen().await.unwrap();
        let second = bridge.listen().await;
        assert!(matches!(second, Err(BridgeError::AlreadyListening)));
        bridge.close().await.unwrap();
    }

    #[tokio::test]
    async fn listen_after_close_is_rejected() {
        let bridge = bridge_with(MockBackend::arc(Vec::new(), MockMode::Idle), Collector::arc());

        bridge.close().await.unwrap();
        assert!(matches!(bridge.listen().await, Err(BridgeError::Closed)));
    }

    #[tokio::test]
    async fn backend_init_failure_surfaces_at_listen_time() {
        let bridge = bridge_with(MockBackend::failing(), Collector::arc());

        match bridge.listen().await {
            Err(BridgeError::BackendInit { source }) => assert!(source.is_init_failure()),
            other => panic!("expected BackendInit, got {other:?}"),
        }
        assert_eq!(bridge.state(), BridgeState::Idle);
    }

    #[tokio::test]
    async fn crash_faults_the_bridge_and_close_still_works() {
        let collector = Collector::arc();
        let bridge = bridge_with(
            MockBackend::arc(vec!["AB12"], MockMode::Crash(3)),
            collector.clone(),
        );

        bridge.listen().await.unwrap();
        wait_until(|| bridge.state() == BridgeState::Faulted).await;
        wait_until(|| collector.kinds().contains(&EventKind::UnexpectedExit)).await;

        bridge.close().await.unwrap();
        assert_eq!(bridge.state(), BridgeState::Closed);
        assert_eq!(collector.kinds().last(), Some(&EventKind::Closed));
    }

    #[tokio::test]
    async fn requested_close_does_not_report_unexpected_exit() {
        let collector = Collector::arc();
        let bridge = bridge_with(MockBackend::arc(vec!["AB12"], MockMode::Idle), collector.clone());

        bridge.listen().await.unwrap();
        wait_until(|| collector.len() >= 2).await;
        bridge.close().await.unwrap();

        assert!(!collector.kinds().contains(&EventKind::UnexpectedExit));
    }

    #[tokio::test]
    async fn callbacks_fire_for_their_events() {
        let listened = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));
        let detected: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));

        let bridge = NfcBridge::builder(BridgeConfig::default())
            .with_backend(MockBackend::arc(vec!["AB12"], MockMode::Idle))
            .build();

        let sink = detected.clone();
        bridge.on_detect(move |uid| sink.lock().unwrap().push(uid.to_string()));

        let flag = listened.clone();
        bridge
            .listen_with(move |_ev| flag.store(true, Ordering::SeqCst))
            .await
            .unwrap();

        wait_until(|| !detected.lock().unwrap().is_empty()).await;
        assert!(listened.load(Ordering::SeqCst));

        let flag = closed.clone();
        bridge
            .close_with(move |_ev| flag.store(true, Ordering::SeqCst))
            .await
            .unwrap();
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(*detected.lock().unwrap(), vec!["AB12".to_string()]);
    }

    #[tokio::test]
    async fn every_construction_form_shares_the_close_contract() {
        let forms: Vec<Arc<NfcBridge>> = vec![
            NfcBridge::new(BridgeOptions::default()),
            NfcBridge::new(BridgeOptions::on_detect(|_uid| {})),
            NfcBridge::new("mock-poller"),
            NfcBridge::new(BridgeConfig::default()),
        ];
        for bridge in forms {
            assert_eq!(bridge.state(), BridgeState::Idle);
            bridge.close().await.unwrap();
            bridge.close().await.unwrap();
            assert_eq!(bridge.state(), BridgeState::Closed);
        }
    }

    #[tokio::test]
    async fn guard_shutdown_registers_at_most_once() {
        let bridge = bridge_with(MockBackend::arc(Vec::new(), MockMode::Idle), Collector::arc());
        bridge.guard_shutdown();
        bridge.guard_shutdown();
        bridge.close().await.unwrap();
    }

    #[tokio::test]
    async fn raw_receivers_observe_the_stream() {
        let bridge = bridge_with(MockBackend::arc(vec!["AB12"], MockMode::Idle), Collector::arc());
        let mut rx = bridge.events();

        bridge.listen().await.unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Listening);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, EventKind::Detect);
        assert_eq!(second.uid.as_deref(), Some("AB12"));

        bridge.close().await.unwrap();
    }
}
