//! # Example: mock_poller
//!
//! Runs the bridge against a shell one-liner standing in for `nfc-poll`,
//! so the full pipeline can be watched without NFC hardware.
//!
//! Demonstrates how to:
//! - Configure the process backend with a custom executable and record prefix.
//! - Register a detect callback.
//! - Guard the poller against host-process exit with [`NfcBridge::guard_shutdown`].
//!
//! ## Flow
//! ```text
//! BridgeConfig ──► NfcBridge::new()
//!     ├─► listen()
//!     │     ├─► spawn(sh -c "...TAG:<n>...")
//!     │     ├─► publish(Listening)
//!     │     └─► stdout ──► OutputParser ──► Detect per TAG: line
//!     ├─► on_detect prints each uid
//!     └─► close() after a few seconds
//!           └─► publish(Closed), poller killed
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example mock_poller
//! ```

use std::time::Duration;

use tagvisor::{BridgeConfig, EventKind, NfcBridge, RecordFormat};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. A shell loop stands in for the polling executable
    let mut cfg = BridgeConfig::default();
    cfg.executable = "sh".to_string();
    cfg.args = vec![
        "-c".to_string(),
        "i=0; while true; do i=$((i+1)); echo \"TAG:DEMO-$i\"; sleep 1; done".to_string(),
    ];
    cfg.format = RecordFormat::with_prefix("TAG:");

    // 2. Construct, register a callback, guard against orphaned pollers
    let bridge = NfcBridge::new(cfg);
    bridge.on_detect(|uid| println!("detected: {uid}"));
    bridge.guard_shutdown();

    let mut events = bridge.events();
    bridge.listen().await?;
    println!("listening (Ctrl-C closes early)...");

    // 3. Let a few detections through, then close
    tokio::time::sleep(Duration::from_secs(5)).await;
    bridge.close().await?;

    // 4. The Closed event confirms teardown
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::Closed {
            println!("closed");
        }
    }
    Ok(())
}
