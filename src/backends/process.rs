//! # Process-backed detection backend.
//!
//! [`ProcessBackend`] supervises one external polling executable:
//!
//! ```text
//! start(): spawn(executable) ── stdout piped, stdin/stderr null, kill-on-drop
//! run():   loop {
//!            ├─► read stdout chunk ──► OutputParser::push ──► publish Detect per record
//!            └─► ctx cancelled / stop() ──► should_close = true, send kill
//!          }
//!          EOF ──► reap child (bounded by grace, then SIGKILL)
//!              ├─ should_close set   ──► silent cleanup, Ok
//!              └─ should_close unset ──► publish UnexpectedExit, Err
//! ```
//!
//! ## Rules
//! - Records are published in production order (single reader, no reordering).
//! - The should-close flag is sampled **at exit time**; it is the only thing
//!   distinguishing a requested shutdown from a crash.
//! - The kill signal is asynchronous to the actual exit; `run` drains stdout to
//!   EOF after sending it, so records already written are still delivered.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::events::{Bus, Event, EventKind};

use super::backend::Backend;
use super::parser::{OutputParser, RecordFormat};

const READ_CHUNK: usize = 4096;

/// Supervises the polling executable and parses its output into detections.
pub struct ProcessBackend {
    executable: String,
    args: Vec<String>,
    format: RecordFormat,
    grace: std::time::Duration,

    /// Set before the kill signal goes out; sampled when the process exits.
    should_close: AtomicBool,
    /// Cancelled by `stop()`; lets the driver react without owning the bridge token.
    stop_token: CancellationToken,
    /// Child handle between `start()` and `run()`.
    child: Mutex<Option<Child>>,
}

impl ProcessBackend {
    /// Creates a backend for the given executable.
    ///
    /// ### Parameters
    /// - `executable`: name or path of the poller binary
    /// - `args`: arguments passed to it (pollers usually take none)
    /// - `format`: record grammar for its stdout
    /// - `grace`: how long to wait for the process to die after the kill signal
    pub fn new(
        executable: impl Into<String>,
        args: Vec<String>,
        format: RecordFormat,
        grace: std::time::Duration,
    ) -> Self {
        Self {
            executable: executable.into(),
            args,
            format,
            grace,
            should_close: AtomicBool::new(false),
            stop_token: CancellationToken::new(),
            child: Mutex::new(None),
        }
    }

    /// True once termination has been requested.
    pub fn should_close(&self) -> bool {
        self.should_close.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ProcessBackend {
    fn name(&self) -> &str {
        &self.executable
    }

    async fn start(&self, _bus: &Bus) -> Result<(), BackendError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BackendError::ExecutableNotFound {
                executable: self.executable.clone(),
            },
            _ => BackendError::Spawn {
                error: e.to_string(),
            },
        })?;

        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn run(&self, bus: Bus, ctx: CancellationToken) -> Result<(), BackendError> {
        let Some(mut child) = self.child.lock().await.take() else {
            // stop() won the race and already reaped the child
            return Ok(());
        };
        let Some(mut stdout) = child.stdout.take() else {
            return Err(BackendError::Spawn {
                error: "child stdout is not piped".to_string(),
            });
        };

        let mut parser = OutputParser::new(self.format.clone());
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut kill_sent = false;

        loop {
            tokio::select! {
                _ = ctx.cancelled(), if !kill_sent => {
                    self.should_close.store(true, Ordering::SeqCst);
                    kill_sent = true;
                    let _ = child.start_kill();
                }
                _ = self.stop_token.cancelled(), if !kill_sent => {
                    kill_sent = true;
                    let _ = child.start_kill();
                }
                read = stdout.read(&mut chunk) => match read {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        for uid in parser.push(&chunk[..n]) {
                            bus.publish(Event::now(EventKind::Detect).with_uid(uid));
                        }
                    }
                }
            }
        }
        drop(stdout);

        // Bounded reap: a poller that ignores the kill signal gets SIGKILL.
        let status = match time::timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(_)) => None,
            Err(_elapsed) => {
                let _ = child.kill().await;
                child.wait().await.ok()
            }
        };

        if self.should_close() || ctx.is_cancelled() {
            return Ok(());
        }

        let exit_code = status.and_then(|s| s.code());
        let err = BackendError::UnexpectedExit { exit_code };
        bus.publish(
            Event::now(EventKind::UnexpectedExit)
                .with_exit_code(exit_code)
                .with_reason(err.to_string()),
        );
        Err(err)
    }

    async fn stop(&self) {
        self.should_close.store(true, Ordering::SeqCst);
        self.stop_token.cancel();

        // If run() never took the child (stopped right after start), reap here.
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn sh(script: &str) -> ProcessBackend {
        ProcessBackend::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            RecordFormat::lines(),
            Duration::from_secs(2),
        )
    }

    async fn next_kind(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Option<Event> {
        time::timeout(Duration::from_secs(5), rx.recv()).await.ok()?.ok()
    }

    #[tokio::test]
    async fn detects_are_parsed_in_order() {
        let backend = Arc::new(sh("printf 'AB12\\nCD34\\n'; sleep 30"));
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let ctx = CancellationToken::new();

        backend.start(&bus).await.unwrap();
        let runner = {
            let backend = Arc::clone(&backend);
            let bus = bus.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { backend.run(bus, ctx).await })
        };

        let first = next_kind(&mut rx).await.unwrap();
        let second = next_kind(&mut rx).await.unwrap();
        assert_eq!(first.uid.as_deref(), Some("AB12"));
        assert_eq!(second.uid.as_deref(), Some("CD34"));

        backend.stop().await;
        let res = runner.await.unwrap();
        assert!(res.is_ok(), "requested stop must be graceful: {res:?}");
    }

    #[tokio::test]
    async fn unexpected_exit_is_observable() {
        let backend = Arc::new(sh("printf 'AB12\\n'; exit 3"));
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let ctx = CancellationToken::new();

        backend.start(&bus).await.unwrap();
        let res = backend.run(bus, ctx).await;

        match res {
            Err(BackendError::UnexpectedExit { exit_code }) => assert_eq!(exit_code, Some(3)),
            other => panic!("expected UnexpectedExit, got {other:?}"),
        }

        let detect = next_kind(&mut rx).await.unwrap();
        assert_eq!(detect.kind, EventKind::Detect);
        let exit = next_kind(&mut rx).await.unwrap();
        assert_eq!(exit.kind, EventKind::UnexpectedExit);
        assert_eq!(exit.exit_code, Some(3));
    }

    #[tokio::test]
    async fn requested_close_exits_silently() {
        let backend = Arc::new(sh("sleep 30"));
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let ctx = CancellationToken::new();

        backend.start(&bus).await.unwrap();
        let runner = {
            let backend = Arc::clone(&backend);
            let bus = bus.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { backend.run(bus, ctx).await })
        };

        ctx.cancel();
        assert!(runner.await.unwrap().is_ok());
        drop(bus);
        // no UnexpectedExit on the requested path
        while let Ok(ev) = rx.try_recv() {
            assert_ne!(ev.kind, EventKind::UnexpectedExit);
        }
    }

    #[tokio::test]
    async fn missing_executable_fails_start() {
        let backend = ProcessBackend::new(
            "tagvisor-no-such-poller",
            Vec::new(),
            RecordFormat::lines(),
            Duration::from_secs(1),
        );
        let bus = Bus::new(4);
        match backend.start(&bus).await {
            Err(BackendError::ExecutableNotFound { executable }) => {
                assert_eq!(executable, "tagvisor-no-such-poller");
            }
            other => panic!("expected ExecutableNotFound, got {other:?}"),
        }
    }
}
