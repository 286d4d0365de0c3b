//! Interactive terminal bridge
//!
//! Turns a browser-side duplex message channel into a remote PTY. The
//! session walks Authorizing -> Connecting -> ShellDetecting -> Piping ->
//! Closed, with Failed reachable from every state. Authorization happens
//! before any network dial; dial and auth failures are surfaced to the
//! channel as a single diagnostic line before it closes.

pub mod access;
pub mod error;
pub mod protocol;
pub mod websocket;

pub use access::{authorize_shell, AccessLevel, Role};
pub use error::BridgeError;
pub use protocol::{parse_control_message, ControlMessage, DuplexSink, DuplexSource};
pub use websocket::split_duplex;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::credential::HostCredential;
use crate::ssh::{PtyGeometry, SessionCommand, Transport};

/// Shells probed in preference order
const SHELL_CANDIDATES: [&str; 2] = ["bash", "sh"];

/// Everything needed to open one terminal. Identity and per-host grant were
/// validated upstream and arrive here as facts.
#[derive(Debug, Clone)]
pub struct TerminalRequest {
    pub credential: HostCredential,
    /// Target container; None means a shell on the host itself
    pub container_id: Option<String>,
    pub role: Role,
    pub access: AccessLevel,
}

/// Bridges one duplex channel to one remote PTY
pub struct TerminalBridge {
    transport: Arc<dyn Transport>,
}

impl TerminalBridge {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run one terminal session to completion.
    ///
    /// Returns when the duplex channel closes, the remote process exits, or
    /// an unrecoverable error occurs; the underlying transport is released
    /// before returning. Failures before the piping phase are also reported
    /// to the channel as one diagnostic line.
    pub async fn run<K, R>(
        &self,
        request: TerminalRequest,
        mut sink: K,
        source: R,
    ) -> Result<(), BridgeError>
    where
        K: DuplexSink + 'static,
        R: DuplexSource + 'static,
    {
        // Authorizing: fails closed before any connection is made
        if let Err(e) = authorize_shell(request.role, request.access, request.container_id.as_deref())
        {
            warn!("Terminal request rejected: {}", e);
            let _ = sink.send_diagnostic(&e.to_string()).await;
            sink.close().await;
            return Err(e);
        }

        // Connecting + ShellDetecting: the first trial command dials, so a
        // dial or auth failure surfaces here
        let shell = match self.detect_shell(&request).await {
            Ok(shell) => shell,
            Err(e) => {
                warn!("Terminal setup failed for {}: {}", request.credential.address, e);
                let _ = sink.send_diagnostic(&e.to_string()).await;
                sink.close().await;
                return Err(e);
            }
        };

        debug!("Selected shell '{}' on {}", shell, request.credential.address);

        // Piping
        let shell_command = match &request.container_id {
            Some(id) => format!("docker exec -it {} {}", id, shell),
            None => shell.to_string(),
        };

        let handle = match self
            .transport
            .open_terminal(&request.credential, PtyGeometry::default(), &shell_command)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                let e = BridgeError::from(e);
                warn!("PTY start failed for {}: {}", request.credential.address, e);
                let _ = sink.send_diagnostic(&e.to_string()).await;
                sink.close().await;
                return Err(e);
            }
        };

        let (session_id, cmd_tx, output_rx) = handle.into_parts();
        info!("Terminal session {} piping", session_id);

        pipe_until_closed(sink, source, cmd_tx, output_rx).await;

        info!("Terminal session {} closed", session_id);
        Ok(())
    }

    /// Probe for a usable shell with trial commands, bash first. Each trial
    /// runs over its own connection; connection-level failures abort
    /// immediately instead of being mistaken for a missing shell.
    async fn detect_shell(&self, request: &TerminalRequest) -> Result<&'static str, BridgeError> {
        for shell in SHELL_CANDIDATES {
            let trial = match &request.container_id {
                Some(id) => format!("docker exec {} {} -c 'exit'", id, shell),
                None => format!("{} -c 'exit'", shell),
            };

            match self.transport.run_command(&request.credential, &trial).await {
                Ok(_) => return Ok(shell),
                Err(e) if e.is_connection_failure() => return Err(e.into()),
                Err(e) => debug!("Shell '{}' not usable: {}", shell, e),
            }
        }

        Err(BridgeError::NoShell(match &request.container_id {
            Some(id) => format!("neither bash nor sh found in container {}", id),
            None => format!("neither bash nor sh found on {}", request.credential.address),
        }))
    }
}

/// The two pumps of a live session: remote output -> channel, and
/// channel -> remote input. Independent in direction; whichever finishes
/// first cancels the other, and both are joined before the session command
/// channel is released.
async fn pipe_until_closed<K, R>(
    mut sink: K,
    mut source: R,
    cmd_tx: tokio::sync::mpsc::Sender<SessionCommand>,
    mut output_rx: tokio::sync::mpsc::Receiver<bytes::Bytes>,
) where
    K: DuplexSink + 'static,
    R: DuplexSource + 'static,
{
    let closer = cmd_tx.clone();

    let mut outbound = tokio::spawn(async move {
        while let Some(chunk) = output_rx.recv().await {
            if sink.send_output(chunk).await.is_err() {
                debug!("Duplex sink rejected output, stopping outbound pump");
                break;
            }
        }
        sink.close().await;
    });

    let mut inbound = tokio::spawn(async move {
        while let Some(raw) = source.next_message().await {
            match parse_control_message(&raw) {
                Ok(ControlMessage::Input { data }) => {
                    if cmd_tx.send(SessionCommand::Data(data.into_bytes())).await.is_err() {
                        break;
                    }
                }
                Ok(ControlMessage::Resize { cols, rows }) => {
                    if cmd_tx.send(SessionCommand::Resize(cols, rows)).await.is_err() {
                        break;
                    }
                }
                Ok(ControlMessage::Unknown) => {
                    warn!("Ignoring control message with unknown type");
                }
                Err(e) => {
                    // Protocol errors are logged, never fatal to the session
                    warn!("Malformed control message ignored: {}", e);
                }
            }
        }
    });

    // Shared completion: first pump to finish cancels the other
    tokio::select! {
        _ = &mut outbound => {
            inbound.abort();
            let _ = inbound.await;
        }
        _ = &mut inbound => {
            outbound.abort();
            let _ = outbound.await;
        }
    }

    // Both pumps are down; tear the remote session down too
    let _ = closer.send(SessionCommand::Close).await;
}
