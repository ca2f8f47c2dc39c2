//! Read-only queries against the OS identity directory (`/etc/passwd`,
//! `/etc/group`, or whatever NSS is configured to consult).

use std::collections::BTreeSet;

use uzers::{get_group_by_gid, get_group_by_name, get_user_by_name, get_user_by_uid};

/// Check whether a user exists.
pub fn user_exists(username: &str) -> bool {
    get_user_by_name(username).is_some()
}

/// Group names a user belongs to (primary plus supplementary).
/// Returns `None` when the user does not exist.
pub fn user_groups(username: &str) -> Option<BTreeSet<String>> {
    let user = get_user_by_name(username)?;
    let groups = uzers::get_user_groups(username, user.primary_group_id()).unwrap_or_default();
    Some(
        groups
            .iter()
            .map(|g| g.name().to_string_lossy().into_owned())
            .collect(),
    )
}

/// Check whether a group exists.
pub fn group_exists(name: &str) -> bool {
    get_group_by_name(name).is_some()
}

/// Resolve a UID to a username, falling back to the numeric form.
pub fn user_name_or_uid(uid: u32) -> String {
    get_user_by_uid(uid)
        .map(|u| u.name().to_string_lossy().into_owned())
        .unwrap_or_else(|| uid.to_string())
}

/// Resolve a GID to a group name, falling back to the numeric form.
pub fn group_name_or_gid(gid: u32) -> String {
    get_group_by_gid(gid)
        .map(|g| g.name().to_string_lossy().into_owned())
        .unwrap_or_else(|| gid.to_string())
}

/// Name of the account this process runs as.
pub fn current_username() -> String {
    uzers::get_current_username()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "the current user".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOGUS: &str = "bogus-bogus-bogus";

    #[test]
    fn bogus_user_does_not_exist() {
        assert!(!user_exists(BOGUS));
        assert!(user_groups(BOGUS).is_none());
    }

    #[test]
    fn bogus_group_does_not_exist() {
        assert!(!group_exists(BOGUS));
    }

    #[test]
    fn root_exists_with_groups() {
        assert!(user_exists("root"));
        let groups = user_groups("root").expect("root is in the user database");
        assert!(!groups.is_empty());
    }

    #[test]
    fn uid_zero_resolves_to_root() {
        assert_eq!(user_name_or_uid(0), "root");
    }

    #[test]
    fn unknown_ids_fall_back_to_numeric() {
        // UIDs this high are never allocated
        assert_eq!(user_name_or_uid(4_000_000_000), "4000000000");
        assert_eq!(group_name_or_gid(4_000_000_000), "4000000000");
    }

    #[test]
    fn current_username_is_nonempty() {
        assert!(!current_username().is_empty());
    }
}
