//! SSH dialing and authentication using russh

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::PublicKey;
use tracing::{debug, info};

use super::error::SshError;
use super::session::{self, PtyGeometry, TerminalHandle};
use super::{CommandOutput, Transport};
use crate::credential::{AuthMode, HostCredential};

/// Bound on dialing so one unreachable host cannot stall a caller
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// One-session-per-operation SSH transport.
///
/// An explicit factory with no package-level cache: every call dials,
/// authenticates, does its one job, and hangs up.
#[derive(Debug, Clone, Default)]
pub struct SshTransport;

impl SshTransport {
    pub fn new() -> Self {
        Self
    }

    /// Dial and authenticate one connection.
    ///
    /// Never retries; a session that fails to dial or authenticate yields a
    /// typed error, not a half-open handle.
    pub(crate) async fn open(
        &self,
        credential: &HostCredential,
    ) -> Result<client::Handle<ClientHandler>, SshError> {
        let addr = credential.addr();

        debug!("Dialing SSH host {}", addr);

        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| SshError::Dial(format!("Failed to resolve {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| SshError::Dial(format!("No address found for {}", addr)))?;

        let config = client::Config {
            inactivity_timeout: None,
            ..Default::default()
        };

        let mut handle = tokio::time::timeout(
            DIAL_TIMEOUT,
            client::connect(Arc::new(config), socket_addr, ClientHandler),
        )
        .await
        .map_err(|_| {
            SshError::Dial(format!(
                "Connection to {} timed out after {}s",
                addr,
                DIAL_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| SshError::Dial(e.to_string()))?;

        let authenticated = match credential.auth_mode {
            AuthMode::Password => handle
                .authenticate_password(&credential.username, &credential.secret)
                .await
                .map_err(|e| SshError::Auth(e.to_string()))?,
            AuthMode::PrivateKey => {
                // The secret is key material delivered by the storage layer,
                // never a filesystem path
                let key = russh::keys::decode_secret_key(&credential.secret, None)
                    .map_err(|e| SshError::InvalidKey(e.to_string()))?;
                let key = PrivateKeyWithHashAlg::new(Arc::new(key), None);

                handle
                    .authenticate_publickey(&credential.username, key)
                    .await
                    .map_err(|e| SshError::Auth(e.to_string()))?
            }
        };

        if !authenticated.success() {
            return Err(SshError::Auth(
                "Authentication rejected by server".to_string(),
            ));
        }

        info!("SSH session established with {}", addr);

        Ok(handle)
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn run_command(
        &self,
        credential: &HostCredential,
        command: &str,
    ) -> Result<CommandOutput, SshError> {
        let handle = self.open(credential).await?;
        let result = session::exec_once(&handle, command).await;
        session::hang_up(handle).await;
        result
    }

    async fn check_connectivity(&self, credential: &HostCredential) -> Result<(), SshError> {
        let handle = self.open(credential).await?;
        session::hang_up(handle).await;
        Ok(())
    }

    async fn open_terminal(
        &self,
        credential: &HostCredential,
        geometry: PtyGeometry,
        command: &str,
    ) -> Result<TerminalHandle, SshError> {
        let handle = self.open(credential).await?;
        session::start_terminal(handle, geometry, command).await
    }
}

/// russh callback handler.
///
/// Host key verification is intentionally not enforced: targets are
/// operator-supplied infrastructure reached over trusted networks, not
/// public endpoints. This is a documented trust boundary of the system,
/// not an oversight.
pub struct ClientHandler;

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}
