//! Remote file access
//!
//! Directory listings and file reads for a host or a container on it. There
//! is no agent on the remote side: everything is a one-line command whose
//! text output gets parsed, with `docker exec` as the container wrapper.

pub mod listing;

pub use listing::{parse_listing, FileEntry};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::credential::HostCredential;
use crate::ssh::{SshError, Transport};

/// Preferred listing command; the ISO time style parses unambiguously
const LIST_CMD_ISO: &str = "ls -la --time-style=long-iso";

/// Fallback when the remote `ls` rejects the GNU flag (BusyBox, POSIX)
const LIST_CMD_PLAIN: &str = "ls -la";

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Not a regular file: {0}")]
    IsDirectory(String),

    #[error("Binary content cannot be rendered as text: {0}")]
    Binary(String),

    #[error(transparent)]
    Ssh(#[from] SshError),
}

/// A directory listing in the remote command's own order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub path: String,
    pub files: Vec<FileEntry>,
}

/// Text content of one remote file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub path: String,
    pub content: String,
}

/// File operations against one host (or one container on it)
pub struct FileBrowser {
    transport: Arc<dyn Transport>,
}

impl FileBrowser {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// List a directory, preferring the ISO time style and silently
    /// re-issuing the plain form when the remote tool rejects the flag.
    pub async fn list_directory(
        &self,
        credential: &HostCredential,
        container_id: Option<&str>,
        path: &str,
    ) -> Result<DirectoryListing, FileError> {
        let quoted = shell_quote(path);
        let preferred = wrap_container(container_id, &format!("{} {}", LIST_CMD_ISO, quoted));

        let output = match self.transport.run_command(credential, &preferred).await {
            Ok(output) => output,
            Err(e) if flag_rejected(e.command_output()) => {
                debug!("Remote ls rejected --time-style, retrying plain form");
                let plain = wrap_container(container_id, &format!("{} {}", LIST_CMD_PLAIN, quoted));
                self.transport.run_command(credential, &plain).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(DirectoryListing {
            path: path.to_string(),
            files: parse_listing(&output.stdout_text()),
        })
    }

    /// Read one file as text. Directories and binary content surface as
    /// typed errors rather than garbled output.
    pub async fn read_file(
        &self,
        credential: &HostCredential,
        container_id: Option<&str>,
        path: &str,
    ) -> Result<FileContent, FileError> {
        let command = wrap_container(container_id, &format!("cat {}", shell_quote(path)));

        let output = match self.transport.run_command(credential, &command).await {
            Ok(output) => output,
            Err(e) if e.command_output().contains("Is a directory") => {
                return Err(FileError::IsDirectory(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let content = String::from_utf8(output.stdout)
            .map_err(|_| FileError::Binary(path.to_string()))?;

        Ok(FileContent {
            path: path.to_string(),
            content,
        })
    }
}

/// Wrap a command for execution inside a container, or pass it through
/// untouched for the host itself.
fn wrap_container(container_id: Option<&str>, command: &str) -> String {
    match container_id {
        Some(id) => format!("docker exec {} {}", id, command),
        None => command.to_string(),
    }
}

/// Single-quote a path for the remote shell
fn shell_quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

/// Did the failure text indicate an unsupported `ls` flag?
fn flag_rejected(combined: &str) -> bool {
    combined.contains("unrecognized option")
        || combined.contains("invalid option")
        || combined.contains("time-style")
}
