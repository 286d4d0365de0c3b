//! Channel plumbing for single-use SSH sessions
//!
//! Two channel kinds exist: a command channel (run one command line, collect
//! separated streams, wait for exit) and a PTY channel (interactive process
//! behind a pseudo-terminal). Each is used exactly once per connection.

use bytes::Bytes;
use russh::client::{Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::client::ClientHandler;
use super::error::SshError;
use super::CommandOutput;

/// Initial PTY size for interactive terminals
#[derive(Debug, Clone, Copy)]
pub struct PtyGeometry {
    pub cols: u16,
    pub rows: u16,
}

impl Default for PtyGeometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Commands accepted by a running terminal task
#[derive(Debug)]
pub enum SessionCommand {
    /// Raw bytes appended to the remote stdin
    Data(Vec<u8>),
    /// PTY window-change request (cols, rows)
    Resize(u16, u16),
    /// Tear the session down
    Close,
}

/// Handle to a live PTY-backed remote process.
///
/// The underlying `russh` handle is owned by a spawned task; callers interact
/// only through these channels. Dropping the handle closes the session.
pub struct TerminalHandle {
    /// Correlation id for logs
    pub id: String,
    /// Command channel into the terminal task
    pub cmd_tx: mpsc::Sender<SessionCommand>,
    /// Remote output (stdout and stderr interleaved, as a PTY delivers them)
    pub output_rx: mpsc::Receiver<Bytes>,
}

impl Drop for TerminalHandle {
    fn drop(&mut self) {
        // Best-effort: if the task already exited this is a no-op
        let _ = self.cmd_tx.try_send(SessionCommand::Close);
    }
}

impl TerminalHandle {
    /// Consumes the handle and returns its parts without triggering the
    /// close-on-drop behavior.
    #[must_use = "into_parts transfers ownership - ignoring the result will leak the session"]
    pub fn into_parts(
        self,
    ) -> (
        String,
        mpsc::Sender<SessionCommand>,
        mpsc::Receiver<Bytes>,
    ) {
        let handle = std::mem::ManuallyDrop::new(self);
        // Safety: ManuallyDrop prevents Drop from running, so each field is
        // read out exactly once
        unsafe {
            let id = std::ptr::read(&handle.id);
            let cmd_tx = std::ptr::read(&handle.cmd_tx);
            let output_rx = std::ptr::read(&handle.output_rx);
            (id, cmd_tx, output_rx)
        }
    }
}

/// Run one command line and collect its output. The channel is not reusable;
/// callers wanting a second command open a second connection.
pub(crate) async fn exec_once(
    handle: &Handle<ClientHandler>,
    command: &str,
) -> Result<CommandOutput, SshError> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| SshError::Channel(e.to_string()))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| SshError::Channel(format!("Exec request failed: {}", e)))?;

    let mut output = CommandOutput::default();
    let mut exit_status: Option<u32> = None;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => {
                output.stdout.extend_from_slice(&data);
            }
            Some(ChannelMsg::ExtendedData { data, ext }) => {
                if ext == 1 {
                    output.stderr.extend_from_slice(&data);
                }
            }
            Some(ChannelMsg::ExitStatus { exit_status: code }) => {
                exit_status = Some(code);
            }
            Some(ChannelMsg::Eof) => {}
            Some(ChannelMsg::Close) | None => break,
            Some(_) => {}
        }
    }

    classify_exit(exit_status, output)
}

/// Classify a finished command channel. A channel that closed without ever
/// reporting an exit status means the transport dropped mid-command; the
/// buffered partial output must not masquerade as a completed run.
fn classify_exit(
    exit_status: Option<u32>,
    output: CommandOutput,
) -> Result<CommandOutput, SshError> {
    match exit_status {
        Some(0) => Ok(output),
        Some(status) => Err(SshError::Command {
            status,
            output: output.combined_text(),
        }),
        None => Err(SshError::Disconnected),
    }
}

/// Close a connection politely. Errors are ignored — the peer may already
/// be gone, and the operation it served is finished either way.
pub(crate) async fn hang_up(handle: Handle<ClientHandler>) {
    let _ = handle
        .disconnect(Disconnect::ByApplication, "operation complete", "en")
        .await;
}

/// Request a PTY, start `command` on it, and spawn the channel owner task.
///
/// The returned [`TerminalHandle`] lives as long as the remote process; the
/// connection is released when the task exits.
pub(crate) async fn start_terminal(
    handle: Handle<ClientHandler>,
    geometry: PtyGeometry,
    command: &str,
) -> Result<TerminalHandle, SshError> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| SshError::Channel(e.to_string()))?;

    channel
        .request_pty(
            false,
            "xterm-256color",
            geometry.cols as u32,
            geometry.rows as u32,
            0,
            0,
            &[],
        )
        .await
        .map_err(|e| SshError::Channel(format!("PTY request failed: {}", e)))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| SshError::Channel(format!("Shell start failed: {}", e)))?;

    info!("Interactive terminal started for session {}", session_id);

    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(1024);
    let (output_tx, output_rx) = mpsc::channel::<Bytes>(1024);

    tokio::spawn(terminal_task(
        handle,
        channel,
        cmd_rx,
        output_tx,
        session_id.clone(),
    ));

    Ok(TerminalHandle {
        id: session_id,
        cmd_tx,
        output_rx,
    })
}

/// Sole owner of the PTY channel: multiplexes caller commands and remote
/// output until either side closes.
async fn terminal_task(
    handle: Handle<ClientHandler>,
    mut channel: Channel<Msg>,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    output_tx: mpsc::Sender<Bytes>,
    session_id: String,
) {
    debug!("Terminal task started for session {}", session_id);

    loop {
        tokio::select! {
            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    SessionCommand::Data(data) => {
                        if let Err(e) = channel.data(&data[..]).await {
                            error!("Failed to write to PTY channel: {}", e);
                            break;
                        }
                    }
                    SessionCommand::Resize(cols, rows) => {
                        debug!("Resizing PTY to {}x{} for session {}", cols, rows, session_id);
                        if let Err(e) = channel.window_change(cols as u32, rows as u32, 0, 0).await {
                            // A failed resize does not invalidate the terminal
                            error!("Failed to resize PTY: {}", e);
                        }
                    }
                    SessionCommand::Close => {
                        info!("Close requested for session {}", session_id);
                        let _ = channel.eof().await;
                        break;
                    }
                }
            }

            Some(msg) = channel.wait() => {
                match msg {
                    ChannelMsg::Data { data } => {
                        if output_tx.send(Bytes::copy_from_slice(&data)).await.is_err() {
                            debug!("Output receiver dropped for session {}", session_id);
                            break;
                        }
                    }
                    ChannelMsg::ExtendedData { data, ext } => {
                        // With a PTY, stderr rarely arrives separately, but
                        // forward it if it does
                        if ext == 1
                            && output_tx.send(Bytes::copy_from_slice(&data)).await.is_err()
                        {
                            break;
                        }
                    }
                    ChannelMsg::Eof => {
                        info!("PTY channel EOF for session {}", session_id);
                        break;
                    }
                    ChannelMsg::Close => {
                        info!("PTY channel closed for session {}", session_id);
                        break;
                    }
                    ChannelMsg::ExitStatus { exit_status } => {
                        info!("Remote process exited with {} for session {}", exit_status, session_id);
                    }
                    _ => {}
                }
            }

            else => break,
        }
    }

    hang_up(handle).await;
    info!("Terminal task terminated for session {}", session_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn zero_exit_returns_the_output() {
        let result = classify_exit(Some(0), captured("24.0.7\n", ""));
        assert_eq!(result.unwrap().stdout_text(), "24.0.7\n");
    }

    #[test]
    fn nonzero_exit_carries_both_streams() {
        let err = classify_exit(Some(127), captured("", "sh: docker: not found\n")).unwrap_err();
        match err {
            SshError::Command { status, output } => {
                assert_eq!(status, 127);
                assert!(output.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn channel_loss_before_exit_status_is_a_disconnect() {
        // A dropped connection buffers partial output but never delivers an
        // exit status; that must not be reported as a successful run
        let err = classify_exit(None, captured("partial file cont", "")).unwrap_err();
        assert!(matches!(err, SshError::Disconnected));
    }
}
