//! Terminal bridge error types

use thiserror::Error;

use crate::ssh::SshError;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The in-core authorization rule rejected the request. Raised before
    /// any network connection is attempted.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Neither bash nor sh answered the trial commands
    #[error("No usable shell on target: {0}")]
    NoShell(String),

    /// The duplex channel failed mid-session
    #[error("Duplex channel error: {0}")]
    Channel(String),

    #[error(transparent)]
    Ssh(#[from] SshError),
}

impl serde::Serialize for BridgeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
