//! Identities produced by the gateway.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Marker group granted to every identity the gateway produces.
///
/// Callers use this as the "is a known OS identity" authority when making
/// authorization decisions; it is not a real OS group.
pub const AUTHENTICATED_GROUP: &str = "authenticated";

/// A resolved OS identity: a username plus its group memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub groups: BTreeSet<String>,
}

impl Identity {
    /// Build an identity from a username and its real OS groups. The
    /// `authenticated` marker is always added.
    pub fn new(username: impl Into<String>, os_groups: impl IntoIterator<Item = String>) -> Self {
        let mut groups: BTreeSet<String> = os_groups.into_iter().collect();
        groups.insert(AUTHENTICATED_GROUP.to_string());
        Self {
            username: username.into(),
            groups,
        }
    }
}

/// A group that exists in the OS identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub name: String,
}

/// Identity comparison policy.
///
/// NSS/PAM databases are case sensitive everywhere except macOS, whose
/// native directory is historically case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdComparison {
    CaseSensitive,
    CaseInsensitive,
}

impl IdComparison {
    /// The policy for the platform this binary was built for. Evaluated
    /// once at gateway construction and held fixed afterwards.
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::CaseInsensitive
        } else {
            Self::CaseSensitive
        }
    }

    /// Whether two identity names refer to the same id under this policy.
    pub fn same_id(self, a: &str, b: &str) -> bool {
        match self {
            Self::CaseSensitive => a == b,
            Self::CaseInsensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_group_is_always_present() {
        let identity = Identity::new("alice", Vec::new());
        assert!(identity.groups.contains(AUTHENTICATED_GROUP));

        let identity = Identity::new("bob", vec!["wheel".to_string(), "users".to_string()]);
        assert!(identity.groups.contains(AUTHENTICATED_GROUP));
        assert!(identity.groups.contains("wheel"));
        assert!(identity.groups.contains("users"));
    }

    #[test]
    fn duplicate_groups_collapse() {
        let identity = Identity::new(
            "carol",
            vec!["users".to_string(), "users".to_string()],
        );
        // marker + one real group
        assert_eq!(identity.groups.len(), 2);
    }

    #[test]
    fn case_sensitive_comparison() {
        let policy = IdComparison::CaseSensitive;
        assert!(policy.same_id("alice", "alice"));
        assert!(!policy.same_id("alice", "Alice"));
    }

    #[test]
    fn case_insensitive_comparison() {
        let policy = IdComparison::CaseInsensitive;
        assert!(policy.same_id("alice", "Alice"));
        assert!(policy.same_id("WHEEL", "wheel"));
        assert!(!policy.same_id("alice", "bob"));
    }

    #[test]
    fn detect_matches_build_platform() {
        let expected = if cfg!(target_os = "macos") {
            IdComparison::CaseInsensitive
        } else {
            IdComparison::CaseSensitive
        };
        assert_eq!(IdComparison::detect(), expected);
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&IdComparison::CaseInsensitive).unwrap();
        assert_eq!(json, "\"case-insensitive\"");
    }
}
