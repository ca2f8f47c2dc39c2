//! Gateway and daemon configuration.

use serde::{Deserialize, Serialize};

/// PAM service profile consulted when none is configured.
pub const DEFAULT_SERVICE: &str = "sshd";

/// Default unix socket the daemon listens on.
pub const DEFAULT_SOCKET: &str = "/run/pamgate/pamgate.sock";

/// Configuration for the authentication gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// PAM service profile to authenticate against (e.g. "sshd", "sudo").
    /// Blank values fall back to the default.
    pub service_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE.to_string(),
        }
    }
}

impl GatewayConfig {
    /// The service profile that will actually be consulted: the configured
    /// name, or the default when the configured name is blank.
    pub fn effective_service_name(&self) -> &str {
        let trimmed = self.service_name.trim();
        if trimmed.is_empty() {
            DEFAULT_SERVICE
        } else {
            trimmed
        }
    }
}

/// Configuration for the pamgated daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Unix socket path the daemon listens on.
    pub socket: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket: DEFAULT_SOCKET.to_string(),
        }
    }
}

/// Top-level schema of `pamgate.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PamgateConfig {
    pub gateway: GatewayConfig,
    pub daemon: DaemonConfig,
}
