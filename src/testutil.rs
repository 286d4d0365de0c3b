//! Shared test doubles: a scriptable transport with a dial counter, an
//! mpsc-backed duplex channel, and a canned latency probe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::bridge::error::BridgeError;
use crate::bridge::protocol::{DuplexSink, DuplexSource};
use crate::credential::{AuthMode, HostCredential};
use crate::ssh::{CommandOutput, PtyGeometry, SessionCommand, SshError, TerminalHandle, Transport};
use crate::stats::latency::{LatencyProbe, LatencyTarget};

/// Install the env-filtered test subscriber. Idempotent; later calls in the
/// same process are no-ops, so every test that wants log output can call it.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A credential for a host that is never actually dialed
pub(crate) fn cred() -> HostCredential {
    HostCredential {
        address: "10.1.2.3".into(),
        port: 22,
        username: "ops".into(),
        auth_mode: AuthMode::Password,
        secret: "secret".into(),
    }
}

type CommandScript = Box<dyn Fn(&str) -> Result<CommandOutput, SshError> + Send + Sync>;

/// Scriptable [`Transport`]: counts every dial, answers commands from a
/// closure, and hands out at most one pre-built terminal.
pub(crate) struct FakeTransport {
    pub dials: AtomicUsize,
    online: bool,
    script: CommandScript,
    terminal: Mutex<Option<TerminalHandle>>,
    terminal_command: Mutex<Option<String>>,
}

impl FakeTransport {
    pub fn online<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<CommandOutput, SshError> + Send + Sync + 'static,
    {
        Self {
            dials: AtomicUsize::new(0),
            online: true,
            script: Box::new(script),
            terminal: Mutex::new(None),
            terminal_command: Mutex::new(None),
        }
    }

    pub fn offline() -> Self {
        Self {
            dials: AtomicUsize::new(0),
            online: false,
            script: Box::new(|_| Err(SshError::Dial("host unreachable".into()))),
            terminal: Mutex::new(None),
            terminal_command: Mutex::new(None),
        }
    }

    /// Queue the terminal handed out by the next `open_terminal`
    pub fn script_terminal(&self, handle: TerminalHandle) {
        *self.terminal.lock().unwrap() = Some(handle);
    }

    /// The command the last opened terminal was started with
    pub fn last_terminal_command(&self) -> Option<String> {
        self.terminal_command.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn run_command(
        &self,
        _credential: &HostCredential,
        command: &str,
    ) -> Result<CommandOutput, SshError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if !self.online {
            return Err(SshError::Dial("host unreachable".into()));
        }
        (self.script)(command)
    }

    async fn check_connectivity(&self, _credential: &HostCredential) -> Result<(), SshError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if self.online {
            Ok(())
        } else {
            Err(SshError::Dial("host unreachable".into()))
        }
    }

    async fn open_terminal(
        &self,
        _credential: &HostCredential,
        _geometry: PtyGeometry,
        command: &str,
    ) -> Result<TerminalHandle, SshError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        *self.terminal_command.lock().unwrap() = Some(command.to_string());
        self.terminal
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SshError::Channel("no terminal scripted".into()))
    }
}

/// A terminal whose remote side echoes stdin back and records resizes
pub(crate) fn echo_terminal(
    resizes: std::sync::Arc<Mutex<Vec<(u16, u16)>>>,
) -> TerminalHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<SessionCommand>(64);
    let (output_tx, output_rx) = mpsc::channel::<Bytes>(64);

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                SessionCommand::Data(data) => {
                    if output_tx.send(Bytes::from(data)).await.is_err() {
                        break;
                    }
                }
                SessionCommand::Resize(cols, rows) => {
                    resizes.lock().unwrap().push((cols, rows));
                }
                SessionCommand::Close => break,
            }
        }
    });

    TerminalHandle {
        id: "fake-terminal".into(),
        cmd_tx,
        output_rx,
    }
}

/// What a fake duplex channel observed
#[derive(Debug)]
pub(crate) enum SinkEvent {
    Output(Bytes),
    Diagnostic(String),
    Closed,
}

pub(crate) struct ChanSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

pub(crate) struct ChanSource {
    rx: mpsc::UnboundedReceiver<String>,
}

/// Build a fake duplex channel: the sink half reports events on a receiver,
/// the source half is fed from a sender. Dropping the sender closes the
/// channel from the peer's side.
pub(crate) fn duplex_pair() -> (
    ChanSink,
    mpsc::UnboundedReceiver<SinkEvent>,
    ChanSource,
    mpsc::UnboundedSender<String>,
) {
    let (sink_tx, sink_rx) = mpsc::unbounded_channel();
    let (source_tx, source_rx) = mpsc::unbounded_channel();
    (
        ChanSink { tx: sink_tx },
        sink_rx,
        ChanSource { rx: source_rx },
        source_tx,
    )
}

#[async_trait]
impl DuplexSink for ChanSink {
    async fn send_output(&mut self, data: Bytes) -> Result<(), BridgeError> {
        self.tx
            .send(SinkEvent::Output(data))
            .map_err(|_| BridgeError::Channel("sink closed".into()))
    }

    async fn send_diagnostic(&mut self, line: &str) -> Result<(), BridgeError> {
        self.tx
            .send(SinkEvent::Diagnostic(line.to_string()))
            .map_err(|_| BridgeError::Channel("sink closed".into()))
    }

    async fn close(&mut self) {
        let _ = self.tx.send(SinkEvent::Closed);
    }
}

#[async_trait]
impl DuplexSource for ChanSource {
    async fn next_message(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Latency probe answering from a canned table
pub(crate) struct FakeLatencyProbe {
    by_name: HashMap<String, u64>,
    fallback: u64,
}

impl FakeLatencyProbe {
    pub fn fixed(ms: u64) -> Self {
        Self {
            by_name: HashMap::new(),
            fallback: ms,
        }
    }

    pub fn by_name(entries: &[(&str, u64)]) -> Self {
        Self {
            by_name: entries
                .iter()
                .map(|(name, ms)| (name.to_string(), *ms))
                .collect(),
            fallback: 0,
        }
    }
}

#[async_trait]
impl LatencyProbe for FakeLatencyProbe {
    async fn measure(&self, target: &LatencyTarget) -> u64 {
        self.by_name
            .get(&target.name)
            .copied()
            .unwrap_or(self.fallback)
    }
}
