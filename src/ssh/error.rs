//! SSH layer error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SshError {
    /// Network-level failure: resolution, refused connection, or dial timeout
    #[error("Dial failed: {0}")]
    Dial(String),

    /// The server rejected the credential
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The supplied secret could not be parsed as a private key
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// Channel open / PTY / exec request failure after authentication
    #[error("Channel error: {0}")]
    Channel(String),

    /// The remote command exited non-zero. `output` carries stdout with
    /// stderr appended, so diagnostic text is never lost.
    #[error("Command failed (exit {status}): {output}")]
    Command { status: u32, output: String },

    /// The transport went away mid-operation
    #[error("Disconnected")]
    Disconnected,
}

impl SshError {
    /// Combined diagnostic text of a failed command, empty for other kinds.
    pub fn command_output(&self) -> &str {
        match self {
            SshError::Command { output, .. } => output,
            _ => "",
        }
    }

    /// True for failures that mean the transport itself is unusable (cannot
    /// dial, cannot authenticate, or dropped mid-operation), as opposed to a
    /// single command failing.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            SshError::Dial(_)
                | SshError::Auth(_)
                | SshError::InvalidKey(_)
                | SshError::Disconnected
        )
    }
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::Channel(err.to_string())
    }
}

// Surface errors as plain strings across the service boundary
impl serde::Serialize for SshError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
