//! Agentless bridge to remote Docker hosts.
//!
//! Everything here runs over plain SSH: no agent or daemon is installed on
//! the managed host. Each logical operation dials its own connection, does
//! its work on a single-use channel, and disconnects. The crate exposes four
//! surfaces:
//!
//! - [`ssh`]: dial/auth plumbing, one-shot command execution, PTY sessions
//! - [`stats`]: host snapshot collection with independent latency probing
//! - [`files`]: directory listing and file reads, on the host or inside a
//!   container
//! - [`bridge`]: an interactive terminal piped over a duplex channel such as
//!   a WebSocket

pub mod bridge;
pub mod credential;
pub mod files;
pub mod ssh;
pub mod stats;

#[cfg(test)]
mod testutil;

pub use bridge::{BridgeError, TerminalBridge, TerminalRequest};
pub use credential::{AuthMode, HostCredential};
pub use files::{DirectoryListing, FileBrowser, FileContent, FileError};
pub use ssh::{CommandOutput, SshError, SshTransport, Transport};
pub use stats::{HostSnapshot, HostStatsCollector, HostStatus};
