//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`](crate::events::Event) to multiple
//! subscribers **without awaiting** their processing. Subscribers can be added
//! at any point before the bridge closes; the set is the bridge's listener
//! registry.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Panics inside subscribers are caught and reported (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for that
//!   subscriber, with an overflow event published on the bus).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event};

use super::Subscribe;

/// Per-subscriber channel with metadata
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
///
/// Dropped or panicking deliveries are reported twice: a warning on stderr and
/// a `SubscriberOverflow`/`SubscriberPanicked` event on the bus. Subscriber
/// events themselves are exempt from bus reporting, which keeps a full queue
/// from flooding the bus with its own overflow reports.
pub struct SubscriberSet {
    bus: Bus,
    closed: AtomicBool,
    channels: Mutex<Vec<SubscriberChannel>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let set = Self {
            bus,
            closed: AtomicBool::new(false),
            channels: Mutex::new(Vec::with_capacity(subs.len())),
            workers: Mutex::new(Vec::with_capacity(subs.len())),
        };
        for sub in subs {
            set.add(sub);
        }
        set
    }

    /// Registers a subscriber and spawns its worker.
    ///
    /// The subscriber observes only events emitted after registration.
    /// Registrations after `shutdown()` are dropped.
    pub fn add(&self, sub: Arc<dyn Subscribe>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let cap = sub.queue_capacity().max(1);
        let name = sub.name();
        let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
        let bus = self.bus.clone();

        let handle = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = sub.on_event(ev.as_ref());
                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    eprintln!("[tagvisor] subscriber '{}' panicked: {:?}", sub.name(), panic_err);
                    bus.publish(Event::subscriber_panicked(
                        sub.name(),
                        format!("{panic_err:?}"),
                    ));
                }
            }
        });

        lock(&self.channels).push(SubscriberChannel { name, sender: tx });
        lock(&self.workers).push(handle);
    }

    /// Fan-out one event to all subscribers (non-blocking).
    ///
    /// If a subscriber's queue is **full** or **closed**, the event is dropped for
    /// it, a warning is logged, and an overflow event is published on the bus
    /// (unless the dropped event is itself a subscriber event).
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for channel in lock(&self.channels).iter() {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.report_drop(channel.name, "full", event);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.report_drop(channel.name, "closed", event);
                }
            }
        }
    }

    /// Graceful shutdown: close all queues and await worker completion.
    ///
    /// Workers drain events already queued before exiting, so every event
    /// emitted prior to `shutdown()` is still delivered. After shutdown the
    /// set is empty; the bridge never emits through it again.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let channels = std::mem::take(&mut *lock(&self.channels));
        drop(channels);
        let workers = std::mem::take(&mut *lock(&self.workers));
        for h in workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.channels).is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.channels).len()
    }

    fn report_drop(&self, name: &'static str, why: &'static str, dropped: &Event) {
        eprintln!("[tagvisor] subscriber '{name}' dropped event: queue {why}");
        if !dropped.is_subscriber_event() {
            self.bus.publish(Event::subscriber_overflow(name, why));
        }
    }
}

/// Poison recovery: workers never panic while holding these locks, and a
/// poisoned registry is still structurally sound for reads and takes.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::events::EventKind;

    struct Counter(AtomicU32);

    #[async_trait::async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    struct Bomb;

    #[async_trait::async_trait]
    impl Subscribe for Bomb {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "bomb"
        }
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers() {
        let bus = Bus::new(16);
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let set = SubscriberSet::new(vec![counter.clone() as Arc<dyn Subscribe>], bus);

        set.emit(&Event::detect("AB12"));
        set.emit(&Event::detect("CD34"));
        set.shutdown().await;

        assert_eq!(counter.0.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn panicking_subscriber_is_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let counter = Arc::new(Counter(AtomicU32::new(0)));
        let set = SubscriberSet::new(
            vec![Arc::new(Bomb) as Arc<dyn Subscribe>, counter.clone()],
            bus,
        );

        set.emit(&Event::detect("AB12"));
        set.shutdown().await;

        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
        let reported = rx.recv().await.ok();
        assert!(matches!(
            reported.map(|e| e.kind),
            Some(EventKind::SubscriberPanicked)
        ));
    }

    #[tokio::test]
    async fn add_after_construction_receives_events() {
        let bus = Bus::new(16);
        let set = SubscriberSet::new(Vec::new(), bus);
        assert!(set.is_empty());

        let counter = Arc::new(Counter(AtomicU32::new(0)));
        set.add(counter.clone());
        assert_eq!(set.len(), 1);

        set.emit(&Event::now(EventKind::Listening));
        // queued events are drained during shutdown
        tokio::time::sleep(Duration::from_millis(10)).await;
        set.shutdown().await;

        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }
}
