//! End-to-end checks against the real OS identity stack.
//!
//! These run against whatever NSS and PAM configuration the host has, so
//! they only assert on names guaranteed to be absent, on accounts every
//! Unix host carries, or on behavior that holds regardless of host state.

use std::path::Path;

use pamgate::config::GatewayConfig;
use pamgate::error::AuthError;
use pamgate::gateway::{PamGateway, install};
use pamgate::{AUTHENTICATED_GROUP, diagnose};

const BOGUS_USER: &str = "bogus-bogus-bogus";

fn test_gateway() -> PamGateway {
    install(GatewayConfig::default()).expect("gateway installs on unix hosts")
}

#[test]
fn install_with_empty_service_yields_default() {
    let gateway = install(GatewayConfig {
        service_name: String::new(),
    })
    .unwrap();
    assert_eq!(gateway.service_name(), "sshd");
}

#[test]
fn install_with_sudo_service_keeps_it() {
    let gateway = install(GatewayConfig {
        service_name: "sudo".to_string(),
    })
    .unwrap();
    assert_eq!(gateway.service_name(), "sudo");
}

#[test]
fn lookup_of_unknown_user_is_unknown_user() {
    match test_gateway().lookup(BOGUS_USER) {
        Err(AuthError::UnknownUser(name)) => assert_eq!(name, BOGUS_USER),
        other => panic!("expected UnknownUser, got {other:?}"),
    }
}

#[test]
fn lookup_of_existing_user_carries_marker_group() {
    // root exists on every host these tests build on
    let identity = test_gateway().lookup("root").expect("root exists");
    assert_eq!(identity.username, "root");
    assert!(identity.groups.contains(AUTHENTICATED_GROUP));
    // the marker comes on top of at least one real OS group
    assert!(identity.groups.len() >= 2);
}

#[test]
fn authenticate_failure_is_invalid_credentials_never_unknown_user() {
    // A login attempt for a nonexistent account must be indistinguishable
    // from a wrong password.
    match test_gateway().authenticate(BOGUS_USER, "super-secret-pw") {
        Err(AuthError::InvalidCredentials { message }) => {
            assert!(
                !message.contains("super-secret-pw"),
                "password leaked into diagnostic: {message}"
            );
        }
        Ok(_) => panic!("bogus user must not authenticate"),
        Err(other) => panic!("expected InvalidCredentials, got {other:?}"),
    }
}

#[test]
fn group_lookup_ignores_marker_prefix() {
    let gateway = test_gateway();
    let plain = gateway.lookup_group("wheel");
    let marked = gateway.lookup_group("@wheel");
    match (plain, marked) {
        (Ok(a), Ok(b)) => assert_eq!(a.name, b.name),
        (Err(AuthError::UnknownGroup(a)), Err(AuthError::UnknownGroup(b))) => assert_eq!(a, b),
        other => panic!("marker changed the lookup outcome: {other:?}"),
    }
}

#[test]
fn root_group_exists() {
    let info = test_gateway().lookup_group("root").expect("root group");
    assert_eq!(info.name, "root");
}

#[test]
fn diagnose_without_privilege_is_always_ok() {
    let result = diagnose::diagnose(false);
    assert!(result.ok);
    assert!(result.message.is_empty());
}

#[test]
fn diagnose_path_handles_absent_file() {
    let result = diagnose::diagnose_path(true, Path::new("/no/such/shadow/file"));
    assert!(result.ok);
}
