//! # Custom Subscriber Example
//!
//! Shows how to implement a custom event subscriber to track detection metrics.
//!
//! The example counts:
//! - Detections
//! - Lifecycle events (listening/closed)
//! - Faults (unexpected poller exits)
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tagvisor::{BridgeConfig, Event, EventKind, NfcBridge, RecordFormat, Subscribe};

struct MetricsSubscriber {
    detections: AtomicU64,
    lifecycle: AtomicU64,
    faults: AtomicU64,
}

impl MetricsSubscriber {
    fn new() -> Self {
        Self {
            detections: AtomicU64::new(0),
            lifecycle: AtomicU64::new(0),
            faults: AtomicU64::new(0),
        }
    }

    fn print_stats(&self) {
        println!();
        println!("Metrics:");
        println!(" ├─► Detections: {}", self.detections.load(Ordering::Relaxed));
        println!(" ├─► Lifecycle:  {}", self.lifecycle.load(Ordering::Relaxed));
        println!(" └─► Faults:     {}", self.faults.load(Ordering::Relaxed));
    }
}

#[async_trait::async_trait]
impl Subscribe for MetricsSubscriber {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::Detect => {
                self.detections.fetch_add(1, Ordering::Relaxed);
                println!("[detect] uid={:?}", ev.uid);
            }
            EventKind::Listening | EventKind::Closed => {
                self.lifecycle.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::UnexpectedExit | EventKind::BackendFault => {
                self.faults.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "metrics"
    }

    fn queue_capacity(&self) -> usize {
        256
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let metrics = std::sync::Arc::new(MetricsSubscriber::new());

    // A short-lived mock poller: three tags, then a clean stream end
    let mut cfg = BridgeConfig::default();
    cfg.executable = "sh".to_string();
    cfg.args = vec![
        "-c".to_string(),
        "printf 'TAG:A1\\nTAG:B2\\nTAG:C3\\n'; sleep 60".to_string(),
    ];
    cfg.format = RecordFormat::with_prefix("TAG:");

    let bridge = NfcBridge::builder(cfg)
        .with_subscriber(metrics.clone())
        .build();

    bridge.listen().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    bridge.close().await?;

    metrics.print_stats();
    Ok(())
}
