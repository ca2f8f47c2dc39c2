//! Gateway error taxonomy.

use thiserror::Error;

/// Failures surfaced by the authentication gateway.
///
/// Login failures are collapsed into [`AuthError::InvalidCredentials`]
/// regardless of cause, so a failed login never reveals whether the
/// username exists. Read-only lookups keep [`AuthError::UnknownUser`]
/// distinct.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The OS authentication stack rejected the login attempt. The message
    /// carries the PAM diagnostic text, never the submitted password.
    #[error("invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// No such user in the OS identity directory.
    #[error("no such user: {0}")]
    UnknownUser(String),

    /// No such group, or group lookup is unavailable on this platform.
    #[error("no such group: {0}")]
    UnknownGroup(String),

    /// The shadow self-test could not read the metadata it needs.
    #[error("diagnostic unavailable: {0}")]
    DiagnosticUnavailable(String),
}

impl AuthError {
    /// Stable taxonomy name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials { .. } => "invalid-credentials",
            Self::UnknownUser(_) => "unknown-user",
            Self::UnknownGroup(_) => "unknown-group",
            Self::DiagnosticUnavailable(_) => "diagnostic-unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_subject() {
        let err = AuthError::UnknownUser("nobody-here".to_string());
        assert_eq!(err.to_string(), "no such user: nobody-here");
    }

    #[test]
    fn kind_names_are_stable() {
        let err = AuthError::InvalidCredentials {
            message: "PAM said no".to_string(),
        };
        assert_eq!(err.kind(), "invalid-credentials");
        assert_eq!(
            AuthError::UnknownGroup("x".to_string()).kind(),
            "unknown-group"
        );
        assert_eq!(
            AuthError::DiagnosticUnavailable("io".to_string()).kind(),
            "diagnostic-unavailable"
        );
    }
}
