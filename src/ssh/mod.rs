//! Remote session layer
//!
//! One authenticated SSH connection per logical operation: a command run, a
//! connectivity check, or an interactive terminal. Nothing here pools or
//! caches connections — two simultaneous commands against the same host open
//! two independent transports. Retry policy belongs to callers.

pub mod client;
pub mod error;
pub mod session;

pub use client::SshTransport;
pub use error::SshError;
pub use session::{PtyGeometry, SessionCommand, TerminalHandle};

use async_trait::async_trait;

use crate::credential::HostCredential;

/// Captured output of one remote command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// stdout as text (lossy — remote tools are not guaranteed UTF-8)
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// stderr as text
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// stdout with stderr appended, the order downstream parsers rely on
    pub fn combined_text(&self) -> String {
        let mut text = self.stdout_text();
        text.push_str(&self.stderr_text());
        text
    }
}

/// Factory seam for everything that talks to a remote host.
///
/// The production implementation is [`SshTransport`]; tests inject fakes to
/// count dials and script command results without touching the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run one command line over a fresh connection and collect its output.
    ///
    /// Returns `Err(SshError::Command { .. })` on non-zero exit, with both
    /// streams concatenated into the error text.
    async fn run_command(
        &self,
        credential: &HostCredential,
        command: &str,
    ) -> Result<CommandOutput, SshError>;

    /// Dial and authenticate, then close immediately. Used to decide
    /// online/offline independently of any other probe.
    async fn check_connectivity(&self, credential: &HostCredential) -> Result<(), SshError>;

    /// Open a PTY-backed interactive process over a fresh connection.
    async fn open_terminal(
        &self,
        credential: &HostCredential,
        geometry: PtyGeometry,
        command: &str,
    ) -> Result<TerminalHandle, SshError>;
}
