//! Host credentials
//!
//! Credentials are owned by the storage layer outside this crate; the core
//! borrows them for the duration of a single remote session and never
//! persists or logs the secret material.

use serde::{Deserialize, Serialize};

/// How to authenticate against the remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// The secret is the account password
    Password,
    /// The secret is a PEM-encoded private key
    PrivateKey,
}

/// Connection parameters for one remote Docker host
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCredential {
    /// Remote host address (hostname or IP)
    pub address: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Authentication method selector
    pub auth_mode: AuthMode,

    /// Password or PEM private key content, depending on `auth_mode`
    pub secret: String,
}

impl HostCredential {
    /// "host:port" dial target
    pub fn addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// Manual Debug so the secret can never leak into logs
impl std::fmt::Debug for HostCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCredential")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("auth_mode", &self.auth_mode)
            .field("secret", &"***")
            .finish()
    }
}

fn default_port() -> u16 {
    22
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let cred = HostCredential {
            address: "10.0.0.5".into(),
            port: 22,
            username: "root".into(),
            auth_mode: AuthMode::Password,
            secret: "hunter2".into(),
        };
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("10.0.0.5"));
    }

    #[test]
    fn default_port_applies_on_deserialize() {
        let cred: HostCredential = serde_json::from_str(
            r#"{"address":"h","username":"u","authMode":"password","secret":"s"}"#,
        )
        .unwrap();
        assert_eq!(cred.port, 22);
    }
}
