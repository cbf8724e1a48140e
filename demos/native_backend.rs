//! # Example: native_backend
//!
//! Plugs a simulated in-process binding into the bridge through the
//! [`NativeHandle`] collaborator trait. A real deployment would implement the
//! same trait over an FFI binding to the reader library; the bridge relays
//! whatever the binding publishes, with zero translation.
//!
//! ## Run
//! ```bash
//! cargo run --example native_backend
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use tagvisor::{
    BackendError, BridgeConfig, Bus, Event, EventKind, NativeBackend, NativeHandle, NfcBridge,
};

/// Simulated binding: one tag enters the field, lingers, then leaves.
struct SimulatedReader {
    sink: Mutex<Option<Bus>>,
}

#[async_trait::async_trait]
impl NativeHandle for SimulatedReader {
    fn bind(&self, sink: Bus) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    async fn open(&self) -> Result<(), BackendError> {
        println!("device opened");
        Ok(())
    }

    async fn listen(&self, ctx: CancellationToken) -> Result<(), BackendError> {
        let Some(bus) = self.sink.lock().unwrap().clone() else {
            return Err(BackendError::NativeInit {
                error: "emit hook was never bound".to_string(),
            });
        };
        while !ctx.is_cancelled() {
            bus.publish(Event::detect("04:A2:3B:91"));
            tokio::time::sleep(Duration::from_millis(400)).await;
            bus.publish(Event::now(EventKind::Removed).with_uid("04:A2:3B:91"));
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
        Ok(())
    }

    async fn close(&self) {
        println!("device released");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let reader = Arc::new(SimulatedReader {
        sink: Mutex::new(None),
    });
    let backend = Arc::new(NativeBackend::new("simulated-reader", reader));

    let bridge = NfcBridge::builder(BridgeConfig::default())
        .with_backend(backend)
        .build();
    bridge.on_detect(|uid| println!("tag in field: {uid}"));

    let mut events = bridge.events();
    bridge.listen().await?;

    tokio::spawn({
        let bridge = bridge.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            let _ = bridge.close().await;
        }
    });

    while let Ok(ev) = events.recv().await {
        match ev.kind {
            EventKind::Removed => println!("tag left field: {:?}", ev.uid),
            EventKind::Closed => {
                println!("closed");
                break;
            }
            _ => {}
        }
    }
    Ok(())
}
