//! The authentication gateway.

use std::sync::Mutex;

use log::debug;
use pam::Client;

use crate::config::GatewayConfig;
use crate::error::AuthError;
use crate::identity::{GroupInfo, IdComparison, Identity};
use crate::nss;

/// Marker some callers prefix group names with to distinguish them from
/// usernames.
const GROUP_MARKER: char = '@';

/// Gateway into the operating system's PAM and NSS identity stacks.
///
/// One instance per configured PAM service profile. [`authenticate`]
/// is internally serialized; the read-only lookups are freely concurrent.
///
/// [`authenticate`]: PamGateway::authenticate
#[derive(Debug)]
pub struct PamGateway {
    service_name: String,
    id_comparison: IdComparison,
    // PAM conversations are not reentrant; one login at a time.
    auth_lock: Mutex<()>,
}

impl PamGateway {
    /// Build a gateway for the configured service profile. A blank profile
    /// name falls back to the default (`"sshd"`).
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_id_comparison(config, IdComparison::detect())
    }

    /// Build a gateway with an explicit comparison policy. The policy is
    /// normally detected once at startup and passed down; it never changes
    /// for the gateway's lifetime.
    pub fn with_id_comparison(config: GatewayConfig, id_comparison: IdComparison) -> Self {
        Self {
            service_name: config.effective_service_name().to_string(),
            id_comparison,
            auth_lock: Mutex::new(()),
        }
    }

    /// The PAM service profile this gateway consults. Never empty.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Identity comparison policy for usernames and group names.
    pub fn id_comparison(&self) -> IdComparison {
        self.id_comparison
    }

    /// Verify a username/password pair against the OS authentication stack.
    ///
    /// Every underlying failure -- wrong password, unknown user, locked
    /// account, PAM module error -- comes back as
    /// [`AuthError::InvalidCredentials`], so a failed login never reveals
    /// whether the username exists. The password is handed to the PAM
    /// conversation and dropped; it appears in no error and no log line.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let _guard = self.auth_lock.lock().unwrap_or_else(|e| e.into_inner());

        debug!(
            "authenticating '{username}' against PAM service '{}'",
            self.service_name
        );
        pam_login(&self.service_name, username, password)
            .map_err(|message| AuthError::InvalidCredentials { message })?;

        // PAM accepted the login, so the user exists; group enumeration can
        // still lose a race against a concurrent userdel.
        let groups = nss::user_groups(username).unwrap_or_default();
        Ok(Identity::new(username, groups))
    }

    /// Look up a user without proving identity: existence plus group
    /// memberships. Not a substitute for [`authenticate`].
    ///
    /// [`authenticate`]: PamGateway::authenticate
    pub fn lookup(&self, username: &str) -> Result<Identity, AuthError> {
        if !nss::user_exists(username) {
            return Err(AuthError::UnknownUser(username.to_string()));
        }
        let groups = nss::user_groups(username).unwrap_or_default();
        Ok(Identity::new(username, groups))
    }

    /// Look up a group. A single leading `@` marker is stripped first, so
    /// `"@wheel"` and `"wheel"` behave identically.
    pub fn lookup_group(&self, group_name: &str) -> Result<GroupInfo, AuthError> {
        let name = group_name.strip_prefix(GROUP_MARKER).unwrap_or(group_name);
        if nss::group_exists(name) {
            Ok(GroupInfo {
                name: name.to_string(),
            })
        } else {
            Err(AuthError::UnknownGroup(name.to_string()))
        }
    }
}

/// Run the PAM password conversation. Returns the PAM diagnostic text on
/// any failure, including failure to open the conversation itself.
fn pam_login(service: &str, username: &str, password: &str) -> Result<(), String> {
    let mut client = Client::with_password(service).map_err(|e| e.to_string())?;
    client.conversation_mut().set_credentials(username, password);
    client.authenticate().map_err(|e| e.to_string())
}

/// Install the gateway on platforms with a native PAM stack.
///
/// Returns `None` where no PAM-equivalent exists; the embedding application
/// decides at startup what to do without one.
pub fn install(config: GatewayConfig) -> Option<PamGateway> {
    if cfg!(not(unix)) {
        return None;
    }
    Some(PamGateway::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_config_uses_default_service() {
        let gateway = PamGateway::new(GatewayConfig {
            service_name: "  ".to_string(),
        });
        assert_eq!(gateway.service_name(), "sshd");
    }

    #[test]
    fn explicit_service_survives_construction() {
        let gateway = PamGateway::new(GatewayConfig {
            service_name: "sudo".to_string(),
        });
        assert_eq!(gateway.service_name(), "sudo");
    }

    #[test]
    fn install_yields_gateway_on_unix() {
        let gateway = install(GatewayConfig::default());
        assert!(gateway.is_some());
    }

    #[test]
    fn comparison_policy_is_fixed_at_construction() {
        let gateway = PamGateway::with_id_comparison(
            GatewayConfig::default(),
            IdComparison::CaseInsensitive,
        );
        assert_eq!(gateway.id_comparison(), IdComparison::CaseInsensitive);
    }

    #[test]
    fn group_marker_is_stripped_before_lookup() {
        let gateway = PamGateway::new(GatewayConfig::default());
        let plain = gateway.lookup_group("bogus-bogus-bogus");
        let marked = gateway.lookup_group("@bogus-bogus-bogus");
        match (plain, marked) {
            (Err(AuthError::UnknownGroup(a)), Err(AuthError::UnknownGroup(b))) => {
                assert_eq!(a, b);
                assert_eq!(a, "bogus-bogus-bogus");
            }
            other => panic!("expected identical UnknownGroup errors, got {other:?}"),
        }
    }

    #[test]
    fn bare_marker_is_an_unknown_group() {
        let gateway = PamGateway::new(GatewayConfig::default());
        match gateway.lookup_group("@") {
            Err(AuthError::UnknownGroup(name)) => assert_eq!(name, ""),
            other => panic!("expected UnknownGroup, got {other:?}"),
        }
    }
}
