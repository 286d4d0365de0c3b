//! In-core shell authorization
//!
//! The boundary layer validates identity and per-host grants before calling
//! in; this module adds the one rule the core enforces itself: a shell on
//! the host proper is administrator-only, while container shells are open
//! to manage/full grants. Checked before any dial, failing closed.

use serde::{Deserialize, Serialize};

use super::error::BridgeError;

/// Global role of the calling identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

/// Per-host grant, independent of the global role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Read,
    Manage,
    Full,
}

/// Decide whether this identity may open a shell on the given target.
///
/// Host-level shells (no container id) require the admin role regardless of
/// how generous the per-host grant is. Container shells require at least
/// `manage`.
pub fn authorize_shell(
    role: Role,
    access: AccessLevel,
    container_id: Option<&str>,
) -> Result<(), BridgeError> {
    match container_id {
        None => {
            if role != Role::Admin {
                return Err(BridgeError::PermissionDenied(
                    "Host shell access requires the administrator role".to_string(),
                ));
            }
        }
        Some(_) => {
            if role != Role::Admin && access < AccessLevel::Manage {
                return Err(BridgeError::PermissionDenied(
                    "Container shell access requires manage or full access".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_shell_is_admin_only() {
        assert!(authorize_shell(Role::Admin, AccessLevel::Read, None).is_ok());
        // Even a full grant does not open the host itself to non-admins
        assert!(authorize_shell(Role::User, AccessLevel::Full, None).is_err());
        assert!(authorize_shell(Role::User, AccessLevel::Manage, None).is_err());
    }

    #[test]
    fn container_shell_needs_manage_or_better() {
        assert!(authorize_shell(Role::User, AccessLevel::Manage, Some("abc")).is_ok());
        assert!(authorize_shell(Role::User, AccessLevel::Full, Some("abc")).is_ok());
        assert!(authorize_shell(Role::User, AccessLevel::Read, Some("abc")).is_err());
    }

    #[test]
    fn admins_pass_everywhere() {
        assert!(authorize_shell(Role::Admin, AccessLevel::Read, Some("abc")).is_ok());
        assert!(authorize_shell(Role::Admin, AccessLevel::Read, None).is_ok());
    }
}
